//! SMTP reply types.

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Text of each reply line, without the code and separator.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Converts a non-2xx reply into [`crate::Error::SmtpError`].
    ///
    /// # Errors
    ///
    /// Returns the reply as an error unless it is a success.
    pub fn into_result(self) -> crate::Result<Self> {
        self.expect_code(|code| code.is_success())
    }

    /// Converts the reply into an error unless `accept` holds for its code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SmtpError`] carrying the reply.
    pub fn expect_code(self, accept: impl FnOnce(ReplyCode) -> bool) -> crate::Result<Self> {
        if accept(self.code) {
            Ok(self)
        } else {
            Err(crate::Error::smtp_error(
                self.code.as_u16(),
                self.message_text(),
            ))
        }
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn code_classes() {
        assert!(ReplyCode::OK.is_success());
        assert!(ReplyCode::CLOSING.is_success());
        assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
        assert!(ReplyCode::START_DATA.is_intermediate());
        assert!(ReplyCode::SERVICE_UNAVAILABLE.is_transient());
        assert!(ReplyCode::MAILBOX_UNAVAILABLE.is_permanent());
        assert!(!ReplyCode::OK.is_permanent());
        assert_eq!(ReplyCode::new(535), ReplyCode::AUTH_FAILED);
        assert_eq!(ReplyCode::AUTH_SUCCESS.to_string(), "235");
    }

    #[test]
    fn message_text_joins_lines() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["mail.example.com".to_string(), "SIZE 1000".to_string()],
        );
        assert_eq!(reply.message_text(), "mail.example.com\nSIZE 1000");
        assert_eq!(Reply::new(ReplyCode::OK, vec![]).message_text(), "");
    }

    #[test]
    fn into_result() {
        assert!(Reply::new(ReplyCode::OK, vec![]).into_result().is_ok());

        let err = Reply::new(ReplyCode::MAILBOX_UNAVAILABLE, vec!["No such user".into()])
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 550, ref message } if message == "No such user"));
    }

    #[test]
    fn expect_code() {
        let data = Reply::new(ReplyCode::START_DATA, vec!["Go ahead".into()]);
        assert!(data.clone().into_result().is_err());
        assert!(
            data.expect_code(|code| code == ReplyCode::START_DATA)
                .is_ok()
        );
    }
}
