//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error classes, for callers that only need to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid configuration.
    Config,
    /// Malformed addresses, headers or message content.
    Validation,
    /// Message exceeds the server-advertised size.
    SizeLimit,
    /// Dial, timeout and transport failures.
    Connection,
    /// Authentication could not be performed or was refused.
    Auth,
    /// The server rejected a command or replied unexpectedly.
    Protocol,
}

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Message composition error.
    #[error(transparent)]
    Mime(#[from] wail_mime::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The session was created without configuration.
    #[error("SMTP configuration is missing")]
    ConfigMissing,

    /// The configuration cannot be used to dial.
    #[error("Invalid SMTP configuration: {0}")]
    InvalidConfig(String),

    /// Authentication is required but a credential is empty.
    #[error("Sender {0} is required for authentication")]
    CredentialsMissing(&'static str),

    /// Connection establishment did not finish in time.
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The server closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// No session has been established.
    #[error("Not connected")]
    NotConnected,

    /// The envelope carries no message.
    #[error("Envelope has no message")]
    NilMessage,

    /// The envelope has no recipients.
    #[error("Envelope has no recipients")]
    NoRecipients,

    /// The single reconnect attempt after a failed liveness probe failed.
    #[error("Reconnect failed: {0}")]
    ReconnectFailed(#[source] Box<Error>),

    /// A mechanism refused to send credentials over plaintext.
    #[error("Refusing {0} authentication over an unencrypted connection")]
    InsecureChannel(&'static str),

    /// The server sent a challenge the mechanism cannot answer.
    #[error("Unexpected authentication challenge: {0}")]
    UnexpectedChallenge(String),

    /// None of the advertised mechanisms is supported.
    #[error("No supported authentication mechanism (server offers: {0})")]
    UnsupportedAuthMethod(String),

    /// The mechanism is recognized but not implemented.
    #[error("Authentication mechanism {0} is not implemented")]
    UnimplementedAuthMethod(&'static str),

    /// The server rejected the credentials.
    #[error("Authentication failed {code}: {message}")]
    AuthFailed {
        /// Reply code (e.g., 535).
        code: u16,
        /// Error message from server.
        message: String,
    },
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns the reply code if the error came from a server reply.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::SmtpError { code, .. } | Self::AuthFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code >= 500 && code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code >= 400 && code < 500)
    }

    /// Classifies the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing | Self::InvalidConfig(_) => ErrorCategory::Config,
            Self::Mime(wail_mime::Error::MessageTooLarge { .. }) => ErrorCategory::SizeLimit,
            Self::Mime(_) | Self::NilMessage | Self::NoRecipients => ErrorCategory::Validation,
            Self::Io(_)
            | Self::Tls(_)
            | Self::ConnectTimeout(_)
            | Self::ConnectionClosed
            | Self::NotConnected
            | Self::ReconnectFailed(_) => ErrorCategory::Connection,
            Self::CredentialsMissing(_)
            | Self::InsecureChannel(_)
            | Self::UnexpectedChallenge(_)
            | Self::UnsupportedAuthMethod(_)
            | Self::UnimplementedAuthMethod(_)
            | Self::AuthFailed { .. } => ErrorCategory::Auth,
            Self::SmtpError { .. } | Self::Protocol(_) => ErrorCategory::Protocol,
        }
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
    fn reply_classification() {
        let rejected = Error::smtp_error(550, "No such user");
        assert!(rejected.is_permanent());
        assert!(!rejected.is_transient());

        let busy = Error::smtp_error(451, "Try again later");
        assert!(busy.is_transient());
        assert!(!busy.is_permanent());

        assert!(!Error::NotConnected.is_permanent());
        assert_eq!(Error::NotConnected.reply_code(), None);
    }

    #[test]
    fn categories() {
        assert_eq!(Error::ConfigMissing.category(), ErrorCategory::Config);
        assert_eq!(Error::NoRecipients.category(), ErrorCategory::Validation);
        assert_eq!(
            Error::from(wail_mime::Error::MissingRecipient).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::from(wail_mime::Error::MessageTooLarge { limit: 1, size: 2 }).category(),
            ErrorCategory::SizeLimit
        );
        assert_eq!(
            Error::ConnectTimeout(Duration::from_secs(1)).category(),
            ErrorCategory::Connection
        );
        assert_eq!(
            Error::ReconnectFailed(Box::new(Error::ConnectionClosed)).category(),
            ErrorCategory::Connection
        );
        assert_eq!(
            Error::CredentialsMissing("password").category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            Error::InsecureChannel("LOGIN").category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            Error::smtp_error(550, "rejected").category(),
            ErrorCategory::Protocol
        );
    }

    #[test]
    fn reconnect_failure_keeps_source() {
        use std::error::Error as _;

        let err = Error::ReconnectFailed(Box::new(Error::ConnectionClosed));
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("Connection closed by server")
        );
    }
}
