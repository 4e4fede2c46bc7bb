//! Envelope: header assembly and final message rendering.

use crate::address::{Address, format_address_list, validate};
use crate::config::MailConfig;
use crate::encoding::Encoder;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::Message;
use chrono::{DateTime, FixedOffset, Local};
use std::fmt::Write as _;

/// A message plus the headers and recipients needed to send it.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    encoder: Encoder,
    headers: Headers,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    message: Option<Message>,
}

impl Envelope {
    /// Creates an empty envelope rendering with the given configuration.
    #[must_use]
    pub fn new(config: MailConfig) -> Self {
        Self {
            encoder: Encoder::from_config(config),
            headers: Headers::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            message: None,
        }
    }

    /// Returns the encoder used for headers and bodies.
    #[must_use]
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Sets the subject, encoded as RFC 2047 words.
    pub fn set_subject(&mut self, subject: &str) {
        let encoded = self.encoder.encode_header_word(subject);
        self.headers.set("subject", encoded);
    }

    /// Sets the sender.
    ///
    /// The header holds the bare address when `name` is empty, otherwise
    /// the encoded display name followed by the address.
    pub fn set_from(&mut self, name: &str, address: &str) {
        let value = if name.is_empty() {
            address.to_string()
        } else {
            format!("{} <{address}>", self.encoder.encode_header_word(name))
        };
        self.headers.set("from", value);
    }

    /// Sets the `To` recipients, replacing any previous list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or any address is invalid.
    pub fn set_to<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.to = parse_list(addresses)?;
        self.headers.set("to", format_address_list(&self.to));
        Ok(())
    }

    /// Sets the `Cc` recipients, replacing any previous list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or any address is invalid.
    pub fn set_cc<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cc = parse_list(addresses)?;
        self.headers.set("cc", format_address_list(&self.cc));
        Ok(())
    }

    /// Sets the `Bcc` recipients, replacing any previous list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or any address is invalid.
    pub fn set_bcc<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bcc = parse_list(addresses)?;
        self.headers.set("bcc", format_address_list(&self.bcc));
        Ok(())
    }

    /// Sets the message body, replacing any previous one.
    pub fn set_message(&mut self, message: impl Into<Message>) {
        self.message = Some(message.into());
    }

    /// Returns the message body, if set.
    #[must_use]
    pub const fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Returns a header value by name (`subject`, `from`, `to`, `cc`, `bcc`).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns every SMTP recipient: `To`, then `Cc`, then `Bcc`.
    #[must_use]
    pub fn recipients(&self) -> Vec<&Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc).collect()
    }

    /// Renders the complete message stamped with the current local time.
    ///
    /// A `max_message_size` of zero disables the size check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRecipient`] if no `To` list was set and
    /// [`Error::MessageTooLarge`] if the rendered message exceeds the limit.
    pub fn finalize(&self, max_message_size: usize) -> Result<Vec<u8>> {
        self.finalize_at(Local::now().fixed_offset(), max_message_size)
    }

    /// Renders the complete message with an explicit `Date`.
    ///
    /// # Errors
    ///
    /// Same as [`Envelope::finalize`].
    pub fn finalize_at(
        &self,
        date: DateTime<FixedOffset>,
        max_message_size: usize,
    ) -> Result<Vec<u8>> {
        if !self.headers.contains("to") {
            return Err(Error::MissingRecipient);
        }

        let mut out = format!("Date: {}\r\n", date.to_rfc2822());
        let _ = write!(
            out,
            "Subject: {}\r\n",
            self.headers.get("subject").unwrap_or_default()
        );
        let _ = write!(
            out,
            "From: {}\r\n",
            self.headers.get("from").unwrap_or_default()
        );
        self.headers.write_line(&mut out, "To");
        self.headers.write_line(&mut out, "Cc");
        self.headers.write_line(&mut out, "Bcc");
        out.push_str("MIME-Version: 1.0\r\n");

        match &self.message {
            Some(message) => {
                out.push_str(&message.render(&self.encoder));
                out.push_str("\r\n");
            }
            None => out.push_str("\r\n"),
        }

        let size = out.len();
        if max_message_size != 0 && size > max_message_size {
            return Err(Error::MessageTooLarge {
                limit: max_message_size,
                size,
            });
        }

        Ok(out.into_bytes())
    }
}

fn parse_list<I, S>(addresses: I) -> Result<Vec<Address>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = addresses
        .into_iter()
        .map(|addr| validate(addr.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    if parsed.is_empty() {
        return Err(Error::EmptyAddressList);
    }
    Ok(parsed)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::config::{Charset, TransferEncoding};
    use crate::encoding::decode_rfc2047;
    use crate::message::{MultipartAlternative, TextPart};

    fn fixed_date() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap()
    }

    fn envelope() -> Envelope {
        let mut env = Envelope::default();
        env.set_subject("Greetings");
        env.set_from("Wail Sender", "sender@example.com");
        env.set_to(["alice@example.com"]).unwrap();
        env.set_message(TextPart::plain("Hello"));
        env
    }

    #[test]
    fn test_finalize_requires_to() {
        let mut env = Envelope::default();
        env.set_subject("No recipients");
        env.set_message(TextPart::plain("x"));
        assert!(matches!(env.finalize(0), Err(Error::MissingRecipient)));
    }

    #[test]
    fn test_finalize_header_order() {
        let mut env = envelope();
        env.set_cc(["bob@example.com"]).unwrap();
        env.set_bcc(["carol@example.com"]).unwrap();

        let raw = String::from_utf8(env.finalize_at(fixed_date(), 0).unwrap()).unwrap();
        let names: Vec<&str> = raw
            .split("\r\n")
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':').map(|(name, _)| name))
            .collect();

        assert_eq!(
            names,
            vec![
                "Date",
                "Subject",
                "From",
                "To",
                "Cc",
                "Bcc",
                "MIME-Version",
                "Content-Type",
                "Content-Transfer-Encoding"
            ]
        );
        assert!(raw.starts_with("Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n"));
        assert!(raw.contains("To: <alice@example.com>\r\n"));
        assert!(raw.ends_with("SGVsbG8=\r\n"));
    }

    #[test]
    fn test_finalize_skips_unset_cc() {
        let raw = String::from_utf8(envelope().finalize(0).unwrap()).unwrap();
        assert!(raw.contains("To: <alice@example.com>\r\n"));
        assert!(!raw.contains("Cc:"));
        assert!(!raw.contains("Bcc:"));
    }

    #[test]
    fn test_finalize_size_limit() {
        let env = envelope();
        let size = env.finalize_at(fixed_date(), 0).unwrap().len();

        assert!(env.finalize_at(fixed_date(), size).is_ok());
        assert!(matches!(
            env.finalize_at(fixed_date(), 10),
            Err(Error::MessageTooLarge { limit: 10, size: s }) if s == size
        ));
    }

    #[test]
    fn test_set_to_overwrites() {
        let mut env = envelope();
        env.set_to(["dave@example.com", "erin@example.com"]).unwrap();
        assert_eq!(
            env.header("to"),
            Some("<dave@example.com>,<erin@example.com>")
        );
        let recipients: Vec<&str> = env.recipients().iter().map(|a| a.as_str()).collect();
        assert_eq!(recipients, vec!["dave@example.com", "erin@example.com"]);
    }

    #[test]
    fn test_recipient_union_order() {
        let mut env = Envelope::default();
        env.set_bcc(["c@example.com"]).unwrap();
        env.set_to(["a@example.com"]).unwrap();
        env.set_cc(["b@example.com"]).unwrap();
        let recipients: Vec<&str> = env.recipients().iter().map(|a| a.as_str()).collect();
        assert_eq!(
            recipients,
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
    }

    #[test]
    fn test_set_to_rejects_bad_lists() {
        let mut env = envelope();
        let empty: [&str; 0] = [];
        assert!(matches!(env.set_to(empty), Err(Error::EmptyAddressList)));
        assert!(env.set_to(["ok@example.com", "i am hero"]).is_err());
        assert_eq!(env.header("to"), Some("<alice@example.com>"));
    }

    #[test]
    fn test_set_from_forms() {
        let mut env = Envelope::default();
        env.set_from("", "sender@example.com");
        assert_eq!(env.header("from"), Some("sender@example.com"));

        env.set_from("Wail", "sender@example.com");
        assert_eq!(
            env.header("from"),
            Some("=?UTF-8?B?V2FpbA==?= <sender@example.com>")
        );
    }

    #[test]
    fn test_subject_is_encoded() {
        let mut env = Envelope::new(MailConfig::new(
            Charset::Utf8,
            TransferEncoding::QuotedPrintable,
        ));
        env.set_subject("\u{442}\u{435}\u{43c}\u{430}");
        let subject = env.header("subject").unwrap();
        assert!(subject.starts_with("=?UTF-8?Q?"));
        assert_eq!(decode_rfc2047(subject).unwrap(), "\u{442}\u{435}\u{43c}\u{430}");

        env.set_subject("");
        assert_eq!(env.header("subject"), Some(""));
    }

    #[test]
    fn test_finalize_alternative_body() {
        let mut alternative = MultipartAlternative::new();
        alternative.add_html("<p>hi</p>", 1);
        alternative.add_plain("hi", 0);

        let mut env = envelope();
        env.set_message(alternative);

        let raw = String::from_utf8(env.finalize(0).unwrap()).unwrap();
        assert!(raw.contains("MIME-Version: 1.0\r\nContent-Type: multipart/alternative; boundary="));
        assert!(raw.ends_with("--\r\n"));
    }

    #[test]
    fn test_finalize_parses_back() {
        let mut env = envelope();
        env.set_to([
            "example1@example.com",
            "example2@example.com",
            "example3@example.com",
            "example4@example.com",
        ])
        .unwrap();

        let raw = String::from_utf8(env.finalize(0).unwrap()).unwrap();
        let headers = Headers::parse(&raw);
        assert_eq!(headers.get("mime-version"), Some("1.0"));
        assert_eq!(
            headers.get("to"),
            Some(
                "<example1@example.com>,<example2@example.com>,<example3@example.com>,<example4@example.com>"
            )
        );
        assert_eq!(
            decode_rfc2047(headers.get("subject").unwrap()).unwrap(),
            "Greetings"
        );
    }
}
