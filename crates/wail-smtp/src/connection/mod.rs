//! SMTP connection management.

mod client;
mod stream;

pub use client::Client;
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised with a numeric value.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Returns the advertised authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .filter_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Replaces the extensions with those listed in an EHLO reply.
    pub(crate) fn set_extensions<'a>(&mut self, lines: impl IntoIterator<Item = &'a String>) {
        self.extensions = lines.into_iter().map(|line| Extension::parse(line)).collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        let lines: Vec<String> = lines.iter().map(ToString::to_string).collect();
        let mut info = ServerInfo::default();
        info.set_extensions(&lines);
        info
    }

    #[test]
    fn capabilities() {
        let info = info(&["SIZE 1024", "STARTTLS", "AUTH LOGIN PLAIN", "8BITMIME"]);
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1024));
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Login, AuthMechanism::Plain]
        );
    }

    #[test]
    fn non_numeric_size_is_ignored() {
        let info = info(&["SIZE"]);
        assert_eq!(info.max_message_size(), None);
        assert!(info.auth_mechanisms().is_empty());
        assert!(!info.supports_starttls());
    }
}
