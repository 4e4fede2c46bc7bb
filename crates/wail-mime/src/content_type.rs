//! MIME content type handling.

use std::borrow::Cow;
use std::fmt;

/// The kinds of content a composed message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `text/plain`.
    PlainText,
    /// `text/html`.
    HtmlText,
    /// `multipart/mixed`.
    MultipartMixed,
    /// `multipart/alternative`.
    MultipartAlternative,
    /// `application/octet-stream`.
    OctetStream,
}

impl ContentKind {
    /// Returns the `type/subtype` string.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::HtmlText => "text/html",
            Self::MultipartMixed => "multipart/mixed",
            Self::MultipartAlternative => "multipart/alternative",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Checks if this kind needs a boundary delimiter.
    #[must_use]
    pub const fn is_multipart(self) -> bool {
        matches!(self, Self::MultipartMixed | Self::MultipartAlternative)
    }

    /// Checks if this is a text kind.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::PlainText | Self::HtmlText)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// `Content-Type` header value: a kind plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Content kind.
    pub kind: ContentKind,
    /// Parameters in emission order (e.g. charset, boundary).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a content type without parameters.
    #[must_use]
    pub const fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            parameters: Vec::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Returns a parameter value by (case-insensitive) name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (key, value) in &self.parameters {
            write!(f, "; {key}={}", parameter_value(value))?;
        }
        Ok(())
    }
}

/// Quotes a parameter value if it contains whitespace, controls or tspecials.
///
/// Control characters (including CR and LF) become spaces so a value can
/// never break out of its header line.
pub(crate) fn parameter_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value.contains(|c: char| {
            c.is_whitespace() || c.is_control() || "()<>@,;:\\\"/[]?=".contains(c)
        });
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mime_types() {
        assert_eq!(ContentKind::PlainText.mime_type(), "text/plain");
        assert_eq!(ContentKind::HtmlText.mime_type(), "text/html");
        assert_eq!(ContentKind::MultipartMixed.mime_type(), "multipart/mixed");
        assert_eq!(
            ContentKind::MultipartAlternative.mime_type(),
            "multipart/alternative"
        );
        assert_eq!(
            ContentKind::OctetStream.mime_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_kind_boundary_requirement() {
        assert!(ContentKind::MultipartMixed.is_multipart());
        assert!(ContentKind::MultipartAlternative.is_multipart());
        assert!(!ContentKind::PlainText.is_multipart());
        assert!(!ContentKind::OctetStream.is_multipart());
        assert!(ContentKind::HtmlText.is_text());
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::new(ContentKind::PlainText).with_parameter("charset", "UTF-8");
        assert_eq!(ct.to_string(), "text/plain; charset=UTF-8");
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_content_type_boundary() {
        let ct = ContentType::new(ContentKind::MultipartMixed).with_parameter("boundary", "abc123");
        assert_eq!(ct.boundary(), Some("abc123"));
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=abc123");
    }

    #[test]
    fn test_parameter_quoting() {
        assert_eq!(parameter_value("report.pdf"), "report.pdf");
        assert_eq!(parameter_value("my report.pdf"), "\"my report.pdf\"");
        assert_eq!(parameter_value("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_parameter_controls_become_spaces() {
        assert_eq!(
            parameter_value("a.txt\r\nX-Injected: yes"),
            "\"a.txt  X-Injected: yes\""
        );
        assert_eq!(parameter_value("tab\there"), "\"tab here\"");
        assert_eq!(parameter_value("bell\u{7}"), "\"bell \"");
    }
}
