//! EHLO extension keywords.

/// SMTP extensions discovered from the EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS (RFC 3207).
    StartTls,
    /// AUTH with the advertised mechanisms, in server order.
    Auth(Vec<AuthMechanism>),
    /// SIZE; `None` when the value is absent or not numeric.
    Size(Option<usize>),
    /// 8BITMIME.
    EightBitMime,
    /// PIPELINING.
    Pipelining,
    /// SMTPUTF8.
    SmtpUtf8,
    /// Anything else, kept verbatim.
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO capability line.
    ///
    /// The pre-standard `AUTH=LOGIN PLAIN` form is accepted as well.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split(|c: char| c.is_whitespace() || c == '=');
        let Some(keyword) = parts.next().filter(|k| !k.is_empty()) else {
            return Self::Unknown(line.to_string());
        };
        let mut params = parts.filter(|p| !p.is_empty());

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(params.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(params.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616).
    Plain,
    /// LOGIN.
    Login,
    /// CRAM-MD5 (RFC 2195).
    CramMd5,
    /// `XOAUTH2`.
    XOAuth2,
}

impl AuthMechanism {
    /// Parses a mechanism name; only exact (case-insensitive) names match.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
        assert_eq!(Extension::parse("8BITMIME"), Extension::EightBitMime);
        assert_eq!(Extension::parse("PIPELINING"), Extension::Pipelining);
        assert_eq!(Extension::parse("SMTPUTF8"), Extension::SmtpUtf8);
        assert_eq!(
            Extension::parse("X-CUSTOM foo"),
            Extension::Unknown("X-CUSTOM foo".into())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn parse_auth_lists() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN CRAM-MD5"),
            Extension::Auth(vec![
                AuthMechanism::Plain,
                AuthMechanism::Login,
                AuthMechanism::CramMd5
            ])
        );
        assert_eq!(
            Extension::parse("AUTH=LOGIN XOAUTH2"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::XOAuth2])
        );
    }

    #[test]
    fn auth_tokens_match_exactly() {
        assert_eq!(
            Extension::parse("AUTH LOGINX PLAINTEXT GSSAPI"),
            Extension::Auth(vec![])
        );
        assert_eq!(AuthMechanism::parse("cram-md5"), Some(AuthMechanism::CramMd5));
        assert_eq!(AuthMechanism::parse("OAUTHBEARER"), None);
    }

    #[test]
    fn parse_size() {
        assert_eq!(
            Extension::parse("SIZE 52428800"),
            Extension::Size(Some(52_428_800))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(Extension::parse("SIZE big"), Extension::Size(None));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::Login.to_string(), "LOGIN");
        assert_eq!(AuthMechanism::CramMd5.as_str(), "CRAM-MD5");
        assert_eq!(AuthMechanism::XOAuth2.as_str(), "XOAUTH2");
    }
}
