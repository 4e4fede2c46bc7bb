//! Error types for MIME composition.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address failed RFC 5322 syntax validation.
    #[error("Invalid email address {address:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        address: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Address is longer than the 254 characters a path may carry.
    #[error("Email address is {0} characters long, the limit is 254")]
    AddressTooLong(usize),

    /// An empty address list was supplied to a recipient setter.
    #[error("Empty email address list")]
    EmptyAddressList,

    /// The `To` header was never set.
    #[error("Missing required header: To")]
    MissingRecipient,

    /// Rendered message exceeds the server-advertised size limit.
    #[error("Message is {size} bytes, the server accepts at most {limit} bytes")]
    MessageTooLarge {
        /// Configured limit in bytes.
        limit: usize,
        /// Rendered size in bytes.
        size: usize,
    },

    /// Text part kind is neither `plain` nor `html`.
    #[error("Invalid text content type: {0}")]
    InvalidTextKind(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Attachment could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_address(address: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            reason,
        }
    }

    /// Returns true if the error comes from address or header validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. }
                | Self::AddressTooLong(_)
                | Self::EmptyAddressList
                | Self::MissingRecipient
                | Self::InvalidTextKind(_)
        )
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
    use crate::{Envelope, TextKind, encoding::decode_base64, validate};

    #[test]
    fn test_validation_errors() {
        assert!(validate("i am hero").unwrap_err().is_validation());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate(&long).unwrap_err().is_validation());
        assert!("markdown".parse::<TextKind>().unwrap_err().is_validation());
        assert!(Envelope::default().finalize(0).unwrap_err().is_validation());

        let mut envelope = Envelope::default();
        let empty: [&str; 0] = [];
        assert!(envelope.set_cc(empty).unwrap_err().is_validation());
    }

    #[test]
    fn test_non_validation_errors() {
        assert!(!Error::MessageTooLarge { limit: 1, size: 2 }.is_validation());
        assert!(!decode_base64("not base64!").unwrap_err().is_validation());
        assert!(!Error::from(std::io::Error::other("disk")).is_validation());
    }
}
