//! SMTP command serialization.

use crate::types::AuthMechanism;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Base64 initial response (SASL-IR)
        initial_response: Option<String>,
    },
    /// A bare line answering an AUTH challenge (base64 or `*` to cancel).
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Reverse path
        from: String,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Forward path
        to: String,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Returns the command verb, for logging.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => format!("AUTH {mechanism} {response}"),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {mechanism}"),
            Self::AuthResponse(line) => line.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::StartTls | Self::Data | Self::Rset | Self::Noop | Self::Quit => {
                self.verb().to_string()
            }
        }
        .into_bytes();

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings() {
        let ehlo = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(ehlo.serialize(), b"EHLO client.example.com\r\n");

        let helo = Command::Helo {
            hostname: "localhost".to_string(),
        };
        assert_eq!(helo.serialize(), b"HELO localhost\r\n");
    }

    #[test]
    fn test_auth_commands() {
        let plain = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(plain.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");

        let login = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(login.serialize(), b"AUTH LOGIN\r\n");

        assert_eq!(
            Command::AuthResponse("*".to_string()).serialize(),
            b"*\r\n"
        );
    }

    #[test]
    fn test_transaction_commands() {
        let mail = Command::MailFrom {
            from: "sender@example.com".to_string(),
        };
        assert_eq!(mail.serialize(), b"MAIL FROM:<sender@example.com>\r\n");

        let rcpt = Command::RcptTo {
            to: "recipient@example.com".to_string(),
        };
        assert_eq!(rcpt.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn test_bare_verbs() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }
}
