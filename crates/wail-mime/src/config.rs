//! Rendering configuration: charset label and transfer encoding.

use std::fmt;

/// Charset label used in encoded words and `Content-Type` parameters.
///
/// The label is informational only; text is never transcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Charset {
    /// UTF-8.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "UTF-8"))]
    Utf8,
    /// ISO-8859-1 (Latin-1).
    #[cfg_attr(feature = "serde", serde(rename = "ISO-8859-1"))]
    Iso8859_1,
    /// US-ASCII.
    #[cfg_attr(feature = "serde", serde(rename = "US-ASCII"))]
    UsAscii,
}

impl Charset {
    /// Returns the IANA charset name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::UsAscii => "US-ASCII",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content transfer encoding applied to every body part of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TransferEncoding {
    /// Base64 encoding, `B` encoded words.
    #[default]
    Base64,
    /// Quoted-Printable encoding, `Q` encoded words.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Returns the RFC 2047 encoded-word form letter.
    #[must_use]
    pub const fn word_form(self) -> char {
        match self {
            Self::Base64 => 'B',
            Self::QuotedPrintable => 'Q',
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Message rendering options.
///
/// Unset fields resolve to UTF-8 and Base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MailConfig {
    /// Charset label.
    pub charset: Charset,
    /// Transfer encoding for bodies and encoded words.
    pub encoding: TransferEncoding,
}

impl MailConfig {
    /// Creates a configuration with the given charset and encoding.
    #[must_use]
    pub const fn new(charset: Charset, encoding: TransferEncoding) -> Self {
        Self { charset, encoding }
    }

    /// Sets the charset.
    #[must_use]
    pub const fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Sets the transfer encoding.
    #[must_use]
    pub const fn encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_utf8_base64() {
        let cfg = MailConfig::default();
        assert_eq!(cfg.charset, Charset::Utf8);
        assert_eq!(cfg.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn display_labels() {
        assert_eq!(Charset::Utf8.to_string(), "UTF-8");
        assert_eq!(Charset::Iso8859_1.to_string(), "ISO-8859-1");
        assert_eq!(Charset::UsAscii.to_string(), "US-ASCII");
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
        assert_eq!(
            TransferEncoding::QuotedPrintable.to_string(),
            "quoted-printable"
        );
    }

    #[test]
    fn builder_setters() {
        let cfg = MailConfig::default()
            .charset(Charset::UsAscii)
            .encoding(TransferEncoding::QuotedPrintable);
        assert_eq!(
            cfg,
            MailConfig::new(Charset::UsAscii, TransferEncoding::QuotedPrintable)
        );
        assert_eq!(cfg.encoding.word_form(), 'Q');
    }
}
