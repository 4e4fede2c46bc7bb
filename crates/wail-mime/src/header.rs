//! Header storage for an envelope.

use std::collections::HashMap;
use std::fmt::Write as _;

/// Case-insensitive, single-valued header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: HashMap<String, String>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, replacing any existing value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Gets a header value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Checks if a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Checks if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Writes `Name: value\r\n` for a header if it is set.
    pub(crate) fn write_line(&self, out: &mut String, display_name: &str) {
        if let Some(value) = self.get(display_name) {
            let _ = write!(out, "{display_name}: {value}\r\n");
        }
    }

    /// Parses the header block of a raw message, unfolding continuation lines.
    ///
    /// Parsing stops at the first empty line. A line without a colon continues
    /// the previous value directly.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                // Address lists break lines with a bare CRLF.
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(line.trim());
                }
                continue;
            };
            if let Some((name, value)) = current.take() {
                headers.set(name, value);
            }
            current = Some((name.trim().to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.set(name, value);
        }

        headers
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

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_set_get() {
        let mut headers = Headers::new();
        headers.set("Subject", "Hello");
        assert_eq!(headers.get("Subject"), Some("Hello"));
        assert_eq!(headers.get("subject"), Some("Hello"));
        assert!(headers.contains("SUBJECT"));
    }

    #[test]
    fn test_headers_set_replaces() {
        let mut headers = Headers::new();
        headers.set("To", "<alice@example.com>");
        headers.set("to", "<charlie@example.com>");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("To"), Some("<charlie@example.com>"));
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.set("Cc", "<bob@example.com>");
        assert_eq!(headers.remove("cc").as_deref(), Some("<bob@example.com>"));
        assert!(!headers.contains("Cc"));
    }

    #[test]
    fn test_write_line() {
        let mut headers = Headers::new();
        headers.set("subject", "Hi");
        let mut out = String::new();
        headers.write_line(&mut out, "Subject");
        headers.write_line(&mut out, "Cc");
        assert_eq!(out, "Subject: Hi\r\n");
    }

    #[test]
    fn test_headers_parse_unfolds() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: <a@example.com>,\r\n",
            " <b@example.com>\r\n",
            "Cc: <c@example.com>,\r\n",
            "<d@example.com>\r\n",
            "Subject: Test Message\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("<a@example.com>, <b@example.com>"));
        assert_eq!(headers.get("Cc"), Some("<c@example.com>,<d@example.com>"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert!(!headers.contains("Body"));
    }
}
