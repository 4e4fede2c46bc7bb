//! SASL mechanisms used during `AUTH`.
//!
//! Each mechanism produces an optional initial response ([`Authenticator::start`])
//! and answers server challenges ([`Authenticator::next`]). Payloads are raw
//! bytes; base64 framing is done by the client.

use crate::config::SenderConfig;
use crate::error::{Error, Result};
use crate::types::AuthMechanism;
use hmac::{Hmac, Mac};
use md5::Md5;
use std::fmt::Write as _;

type HmacMd5 = Hmac<Md5>;

/// Mechanisms in selection priority order.
const PRIORITY: [Authenticator; 4] = [
    Authenticator::Login,
    Authenticator::CramMd5,
    Authenticator::XOAuth2,
    Authenticator::Plain,
];

/// What a mechanism knows about the channel it runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// The transport is encrypted.
    pub encrypted: bool,
    /// The server is the local machine.
    pub local: bool,
}

/// A SASL mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authenticator {
    /// LOGIN: username and password in answer to prompts.
    Login,
    /// CRAM-MD5: keyed digest of the server challenge.
    CramMd5,
    /// PLAIN: credentials in the initial response.
    Plain,
    /// `XOAUTH2`: recognized but not implemented.
    XOAuth2,
}

impl Authenticator {
    /// Picks the preferred mechanism from those the server advertises.
    ///
    /// Priority is LOGIN, CRAM-MD5, `XOAUTH2`, then PLAIN.
    #[must_use]
    pub fn select(offered: &[AuthMechanism]) -> Option<Self> {
        PRIORITY
            .into_iter()
            .find(|auth| offered.contains(&auth.mechanism()))
    }

    /// Returns the SASL mechanism name.
    #[must_use]
    pub const fn mechanism(self) -> AuthMechanism {
        match self {
            Self::Login => AuthMechanism::Login,
            Self::CramMd5 => AuthMechanism::CramMd5,
            Self::Plain => AuthMechanism::Plain,
            Self::XOAuth2 => AuthMechanism::XOAuth2,
        }
    }

    /// Checks the channel and returns the initial response, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsecureChannel`] when credentials would be sent in
    /// the clear and [`Error::UnimplementedAuthMethod`] for `XOAUTH2`.
    pub fn start(self, sender: &SenderConfig, channel: Channel) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Login => {
                if !channel.encrypted {
                    return Err(Error::InsecureChannel("LOGIN"));
                }
                Ok(None)
            }
            Self::CramMd5 => Ok(None),
            Self::Plain => {
                if !channel.encrypted && !channel.local {
                    return Err(Error::InsecureChannel("PLAIN"));
                }
                Ok(Some(
                    format!("\0{}\0{}", sender.login, sender.password).into_bytes(),
                ))
            }
            Self::XOAuth2 => Err(Error::UnimplementedAuthMethod("XOAUTH2")),
        }
    }

    /// Answers a decoded server challenge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedChallenge`] when the mechanism has no
    /// answer for the challenge.
    pub fn next(self, challenge: &[u8], sender: &SenderConfig) -> Result<Vec<u8>> {
        match self {
            Self::Login => {
                let prompt = String::from_utf8_lossy(challenge);
                if prompt.contains("Username") {
                    Ok(sender.login.clone().into_bytes())
                } else if prompt.contains("Password") {
                    Ok(sender.password.clone().into_bytes())
                } else {
                    Err(Error::UnexpectedChallenge(prompt.into_owned()))
                }
            }
            Self::CramMd5 => {
                let mut mac = HmacMd5::new_from_slice(sender.password.as_bytes())
                    .map_err(|e| Error::Protocol(format!("HMAC error: {e}")))?;
                mac.update(challenge);
                let digest = mac.finalize().into_bytes();

                let mut response = sender.login.clone();
                response.push(' ');
                for byte in digest {
                    let _ = write!(response, "{byte:02x}");
                }
                Ok(response.into_bytes())
            }
            Self::Plain => Err(Error::UnexpectedChallenge(
                String::from_utf8_lossy(challenge).into_owned(),
            )),
            Self::XOAuth2 => Err(Error::UnimplementedAuthMethod("XOAUTH2")),
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

    const TLS: Channel = Channel {
        encrypted: true,
        local: false,
    };
    const PLAINTEXT: Channel = Channel {
        encrypted: false,
        local: false,
    };

    fn sender() -> SenderConfig {
        SenderConfig::new("user@example.com", "secret")
    }

    #[test]
    fn select_priority() {
        use AuthMechanism as M;

        assert_eq!(
            Authenticator::select(&[M::Plain, M::CramMd5, M::Login]),
            Some(Authenticator::Login)
        );
        assert_eq!(
            Authenticator::select(&[M::Plain, M::CramMd5]),
            Some(Authenticator::CramMd5)
        );
        assert_eq!(
            Authenticator::select(&[M::Plain, M::XOAuth2]),
            Some(Authenticator::XOAuth2)
        );
        assert_eq!(
            Authenticator::select(&[M::Plain]),
            Some(Authenticator::Plain)
        );
        assert_eq!(Authenticator::select(&[]), None);
    }

    #[test]
    fn login_requires_encryption() {
        assert!(matches!(
            Authenticator::Login.start(&sender(), PLAINTEXT),
            Err(Error::InsecureChannel("LOGIN"))
        ));
        let local = Channel {
            encrypted: false,
            local: true,
        };
        assert!(Authenticator::Login.start(&sender(), local).is_err());
        assert_eq!(Authenticator::Login.start(&sender(), TLS).unwrap(), None);
    }

    #[test]
    fn login_prompts() {
        let auth = Authenticator::Login;
        assert_eq!(auth.next(b"Username:", &sender()).unwrap(), b"user@example.com");
        assert_eq!(auth.next(b"Password:", &sender()).unwrap(), b"secret");
        assert!(matches!(
            auth.next(b"Realm:", &sender()),
            Err(Error::UnexpectedChallenge(prompt)) if prompt == "Realm:"
        ));
    }

    #[test]
    fn cram_md5_rfc2195_vector() {
        let sender = SenderConfig::new("tim", "tanstaaftanstaaf");
        let response = Authenticator::CramMd5
            .next(b"<1896.697170952@postoffice.reston.mci.net>", &sender)
            .unwrap();
        assert_eq!(response, b"tim b913a602c7eda7a495b4e6e7334d3890");
    }

    #[test]
    fn plain_initial_response() {
        let initial = Authenticator::Plain.start(&sender(), TLS).unwrap();
        assert_eq!(initial.unwrap(), b"\0user@example.com\0secret");

        let local = Channel {
            encrypted: false,
            local: true,
        };
        assert!(Authenticator::Plain.start(&sender(), local).is_ok());
        assert!(matches!(
            Authenticator::Plain.start(&sender(), PLAINTEXT),
            Err(Error::InsecureChannel("PLAIN"))
        ));
        assert!(Authenticator::Plain.next(b"more?", &sender()).is_err());
    }

    #[test]
    fn xoauth2_is_unimplemented() {
        assert!(matches!(
            Authenticator::XOAuth2.start(&sender(), TLS),
            Err(Error::UnimplementedAuthMethod("XOAUTH2"))
        ));
    }
}
