//! MIME encoding utilities.
//!
//! Base64 and Quoted-Printable body encoding (RFC 2045), RFC 2047 encoded
//! words for header values, and header line folding (RFC 5322 §2.2.3).

use crate::config::{Charset, MailConfig, TransferEncoding};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for folded headers and encoded bodies (RFC 5322 §2.2.3).
pub const LINE_LENGTH_LIMIT: usize = 76;

/// Maximum length of a single encoded word (RFC 2047 §2).
const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Encodes message bodies and header words for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Encoder {
    charset: Charset,
    encoding: TransferEncoding,
}

impl Encoder {
    /// Creates an encoder for the given charset label and transfer encoding.
    #[must_use]
    pub const fn new(charset: Charset, encoding: TransferEncoding) -> Self {
        Self { charset, encoding }
    }

    /// Creates an encoder from a mail configuration.
    #[must_use]
    pub const fn from_config(config: MailConfig) -> Self {
        Self::new(config.charset, config.encoding)
    }

    /// Returns the charset label.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub const fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Encodes a header value as RFC 2047 encoded words.
    ///
    /// Empty input is returned unchanged. Each encoded word stays within 75
    /// characters and never splits a character; the joined result is folded
    /// when it exceeds [`LINE_LENGTH_LIMIT`].
    #[must_use]
    pub fn encode_header_word(&self, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }

        let prefix = format!("=?{}?{}?", self.charset, self.encoding.word_form());
        let budget = MAX_ENCODED_WORD_LENGTH - prefix.len() - 2;

        let words = match self.encoding {
            TransferEncoding::Base64 => b_words(value, budget),
            TransferEncoding::QuotedPrintable => q_words(value, budget),
        };

        let out = words
            .iter()
            .map(|word| format!("{prefix}{word}?="))
            .collect::<Vec<_>>()
            .join(" ");

        if out.len() > LINE_LENGTH_LIMIT {
            fold_line(&out)
        } else {
            out
        }
    }

    /// Encodes a body with the configured transfer encoding.
    ///
    /// Both encodings are total over arbitrary bytes, so the output is always
    /// transfer-safe ASCII.
    #[must_use]
    pub fn encode_body(&self, body: &[u8]) -> String {
        match self.encoding {
            TransferEncoding::Base64 => wrap_lines(&encode_base64(body)),
            TransferEncoding::QuotedPrintable => encode_quoted_printable(body),
        }
    }
}

/// Splits `value` into base64 payloads whose encoded length fits `budget`.
fn b_words(value: &str, budget: usize) -> Vec<String> {
    let max_bytes = budget / 4 * 3;
    let mut words = Vec::new();
    let mut start = 0;
    let mut len = 0;

    for (idx, ch) in value.char_indices() {
        if len + ch.len_utf8() > max_bytes && len > 0 {
            words.push(encode_base64(&value.as_bytes()[start..idx]));
            start = idx;
            len = 0;
        }
        len += ch.len_utf8();
    }
    words.push(encode_base64(&value.as_bytes()[start..]));
    words
}

/// Splits `value` into Q-encoded payloads no longer than `budget`.
fn q_words(value: &str, budget: usize) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut buf = [0u8; 4];

    for ch in value.chars() {
        let mut encoded = String::new();
        for byte in ch.encode_utf8(&mut buf).bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                    encoded.push(byte as char);
                }
                _ => {
                    let _ = write!(encoded, "={byte:02X}");
                }
            }
        }

        if current.len() + encoded.len() > budget && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push_str(&encoded);
    }
    words.push(current);
    words
}

/// Folds a header value into lines of at most [`LINE_LENGTH_LIMIT`] characters.
///
/// The value is split on whitespace and the tokens are packed greedily, lines
/// joined by `CRLF SP`. Tokens too long for a continuation line are
/// hard-split first. Folding an already folded value returns it unchanged.
#[must_use]
pub fn fold_line(value: &str) -> String {
    let tokens: Vec<&str> = value
        .split_whitespace()
        .flat_map(|token| hard_split(token, LINE_LENGTH_LIMIT - 1))
        .collect();

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for token in tokens {
        // Continuation lines carry one leading space.
        let budget = if lines.is_empty() {
            LINE_LENGTH_LIMIT
        } else {
            LINE_LENGTH_LIMIT - 1
        };

        if current.is_empty() {
            current.push_str(token);
        } else if current.len() + 1 + token.len() <= budget {
            current.push(' ');
            current.push_str(token);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(token);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\r\n ")
}

/// Splits a token into chunks of at most `limit` bytes on character boundaries.
fn hard_split(token: &str, limit: usize) -> Vec<&str> {
    if token.len() <= limit {
        return vec![token];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    for (idx, ch) in token.char_indices() {
        if idx + ch.len_utf8() - start > limit && idx > start {
            chunks.push(&token[start..idx]);
            start = idx;
        }
    }
    chunks.push(&token[start..]);
    chunks
}

/// Hard-wraps ASCII text every [`LINE_LENGTH_LIMIT`] characters with CRLF.
fn wrap_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / LINE_LENGTH_LIMIT * 2);
    let mut rest = text;

    while rest.len() > LINE_LENGTH_LIMIT {
        let (line, tail) = rest.split_at(LINE_LENGTH_LIMIT);
        out.push_str(line);
        out.push_str("\r\n");
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, ignoring line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes data using Quoted-Printable encoding (RFC 2045 §6.7).
///
/// Line breaks in the input (`LF` or `CRLF`) are kept as CRLF hard breaks;
/// longer lines get `=` soft breaks so no output line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len());
    let mut lines = data.split(|&b| b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let has_break = lines.peek().is_some();
        let line = if has_break {
            line.strip_suffix(b"\r").unwrap_or(line)
        } else {
            line
        };
        let mut line_length = 0;

        for (i, &byte) in line.iter().enumerate() {
            let is_last = i + 1 == line.len();
            let mut token = String::with_capacity(3);

            match byte {
                b'!'..=b'<' | b'>'..=b'~' => token.push(byte as char),
                // Whitespace is only literal when something follows on the line.
                b' ' | b'\t' if !is_last => token.push(byte as char),
                _ => {
                    let _ = write!(token, "={byte:02X}");
                }
            }

            let max = if is_last {
                LINE_LENGTH_LIMIT
            } else {
                LINE_LENGTH_LIMIT - 1
            };
            if line_length + token.len() > max {
                result.push_str("=\r\n");
                line_length = 0;
            }

            result.push_str(&token);
            line_length += token.len();
        }

        if has_break {
            result.push_str("\r\n");
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        match bytes.get(i + 1..i + 3) {
            Some(b"\r\n") => i += 3,
            Some([b'\n', ..]) => i += 2,
            Some(hex) => {
                let hex = std::str::from_utf8(hex)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
                i += 3;
            }
            None if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            None => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        }
    }

    Ok(result)
}

/// Decodes a header value made of RFC 2047 encoded words.
///
/// Folding whitespace between adjacent encoded words is dropped; plain
/// tokens are kept as-is.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed or the decoded bytes are
/// not valid UTF-8.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut decoded = Vec::new();
    let mut previous_was_word = None;

    for token in text.split_whitespace() {
        let is_word = token.len() > 4 && token.starts_with("=?") && token.ends_with("?=");
        match previous_was_word {
            Some(true) if is_word => {}
            Some(_) => decoded.push(b' '),
            None => {}
        }

        if is_word {
            decoded.extend(decode_encoded_word(&token[2..token.len() - 2])?);
        } else {
            decoded.extend_from_slice(token.as_bytes());
        }
        previous_was_word = Some(is_word);
    }

    String::from_utf8(decoded).map_err(Into::into)
}

fn decode_encoded_word(inner: &str) -> Result<Vec<u8>> {
    let parts: Vec<&str> = inner.split('?').collect();
    let [_charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    match encoding.to_ascii_uppercase().as_str() {
        "B" => decode_base64(encoded_text),
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " ")),
        other => Err(Error::InvalidEncoding(format!("Unknown encoding: {other}"))),
    }
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
    use proptest::prelude::*;

    const B: Encoder = Encoder::new(Charset::Utf8, TransferEncoding::Base64);
    const Q: Encoder = Encoder::new(Charset::Utf8, TransferEncoding::QuotedPrintable);

    fn unfold(s: &str) -> String {
        s.replace("\r\n ", " ")
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_empty_header_word_is_unchanged() {
        for charset in [Charset::Utf8, Charset::Iso8859_1, Charset::UsAscii] {
            for encoding in [TransferEncoding::Base64, TransferEncoding::QuotedPrintable] {
                assert_eq!(Encoder::new(charset, encoding).encode_header_word(""), "");
            }
        }
    }

    #[test]
    fn test_header_word_b_form() {
        assert_eq!(B.encode_header_word("Hello world"), "=?UTF-8?B?SGVsbG8gd29ybGQ=?=");
    }

    #[test]
    fn test_header_word_q_form() {
        assert_eq!(Q.encode_header_word("тема"), "=?UTF-8?Q?=D1=82=D0=B5=D0=BC=D0=B0?=");
        assert_eq!(Q.encode_header_word("a b?"), "=?UTF-8?Q?a_b=3F?=");
    }

    #[test]
    fn test_header_word_charset_label() {
        let enc = Encoder::new(Charset::Iso8859_1, TransferEncoding::Base64);
        assert!(enc.encode_header_word("x").starts_with("=?ISO-8859-1?B?"));
    }

    #[test]
    fn test_long_header_word_is_folded() {
        let subject = "Some very long text without meaning ".repeat(4);
        let encoded = B.encode_header_word(&subject);

        assert!(encoded.contains("\r\n "));
        for line in encoded.split("\r\n") {
            assert!(line.len() <= LINE_LENGTH_LIMIT, "line too long: {line}");
        }
        assert!(!encoded.ends_with("\r\n"));
        assert_eq!(decode_rfc2047(&unfold(&encoded)).unwrap(), subject);
    }

    #[test]
    fn test_encoded_words_do_not_split_characters() {
        let subject = "ё".repeat(60);
        for enc in [B, Q] {
            let encoded = enc.encode_header_word(&subject);
            for word in unfold(&encoded).split(' ') {
                assert!(word.len() <= MAX_ENCODED_WORD_LENGTH);
                assert!(decode_rfc2047(word).is_ok());
            }
        }
    }

    #[test]
    fn test_fold_short_value_unchanged() {
        assert_eq!(fold_line("=?UTF-8?B?SGVsbG8gd29ybGQ=?="), "=?UTF-8?B?SGVsbG8gd29ybGQ=?=");
    }

    #[test]
    fn test_fold_three_words() {
        let word = "=?UTF-8?B?U29tZSB2ZXJ5IGxvbmcgdGV4dCB3aXRob3V0IG1lYW5pbmc=?=";
        let folded = fold_line(&format!("{word} {word} {word}"));
        assert_eq!(folded, format!("{word}\r\n {word}\r\n {word}"));
    }

    #[test]
    fn test_fold_hard_splits_long_token() {
        let s = "VmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IGxvbmcgc3RyaW5n";
        let folded = fold_line(s);
        assert_eq!(
            folded,
            "VmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IHZlcnkgdmVyeSB2ZXJ5IGx\r\n vbmcgc3RyaW5n"
        );
    }

    #[test]
    fn test_body_base64_wraps_at_76() {
        let body = vec![b'a'; 200];
        let encoded = B.encode_body(&body);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert!(lines[..lines.len() - 1].iter().all(|l| l.len() == LINE_LENGTH_LIMIT));
        assert!(!encoded.ends_with("\r\n"));
        assert_eq!(decode_base64(&encoded).unwrap(), body);
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable("Héllo".as_bytes()), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks_and_trailing_space() {
        assert_eq!(encode_quoted_printable(b"one \ntwo\r\n"), "one=20\r\ntwo\r\n");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let body = vec![b'x'; 200];
        let encoded = encode_quoted_printable(&body);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= LINE_LENGTH_LIMIT);
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), body);
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert!(decode_quoted_printable("bad=Z").is_err());
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    proptest! {
        #[test]
        fn header_word_round_trips(value in "\\PC{1,200}") {
            for enc in [B, Q] {
                let encoded = enc.encode_header_word(&value);
                for line in encoded.split("\r\n") {
                    prop_assert!(line.len() <= LINE_LENGTH_LIMIT);
                }
                prop_assert_eq!(decode_rfc2047(&unfold(&encoded)).unwrap(), value.clone());
            }
        }

        #[test]
        fn fold_is_idempotent(value in "[ -~]{0,300}") {
            let once = fold_line(&value);
            prop_assert_eq!(fold_line(&once), once);
        }

        #[test]
        fn body_round_trips(body in proptest::collection::vec(any::<u8>(), 0..600)) {
            prop_assert_eq!(decode_base64(&B.encode_body(&body)).unwrap(), body);
        }

        #[test]
        fn quoted_printable_round_trips_crlf_text(lines in proptest::collection::vec("[^\\r\\n]{0,120}", 1..6)) {
            let text = lines.join("\r\n");
            let encoded = Q.encode_body(text.as_bytes());
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= LINE_LENGTH_LIMIT);
            }
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.into_bytes());
        }
    }
}
