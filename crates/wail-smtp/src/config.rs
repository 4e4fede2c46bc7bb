//! Session configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Transport security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encryption {
    /// Plaintext only.
    None,
    /// Implicit TLS from the first byte.
    Ssl,
    /// Plaintext upgraded with STARTTLS when the server offers it.
    #[default]
    Tls,
}

impl Encryption {
    /// Returns the conventional port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Ssl => 465,
            Self::Tls => 587,
        }
    }
}

/// SMTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection timeout (zero waits indefinitely).
    pub connect_timeout: Duration,
    /// Whether to authenticate after the greeting.
    pub need_auth: bool,
    /// Transport security mode.
    pub encryption: Encryption,
    /// TLS client settings; webpki roots are used when unset.
    pub tls_config: Option<Arc<rustls::ClientConfig>>,
}

impl ServerConfig {
    /// Creates a server configuration.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            need_auth: false,
            encryption: Encryption::default(),
            tls_config: None,
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables or disables authentication.
    #[must_use]
    pub const fn need_auth(mut self, enabled: bool) -> Self {
        self.need_auth = enabled;
        self
    }

    /// Sets the transport security mode.
    #[must_use]
    pub const fn encryption(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }

    /// Sets custom TLS client settings.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Returns true if the host names the local machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self.host.as_str(),
            "localhost" | "127.0.0.1" | "::1" | "[::1]"
        )
    }
}

/// Sender identity and credentials.
#[derive(Clone, Default)]
pub struct SenderConfig {
    /// Display name used in the `From` header.
    pub name: String,
    /// Login, also used as the envelope sender address.
    pub login: String,
    /// Password.
    pub password: String,
}

impl SenderConfig {
    /// Creates sender credentials.
    #[must_use]
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            login: login.into(),
            password: password.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for SenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderConfig")
            .field("name", &self.name)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Complete session configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Server settings.
    pub server: ServerConfig,
    /// Sender settings.
    pub sender: SenderConfig,
}

impl SmtpConfig {
    /// Creates a session configuration.
    #[must_use]
    pub const fn new(server: ServerConfig, sender: SenderConfig) -> Self {
        Self { server, sender }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports() {
        assert_eq!(Encryption::None.default_port(), 25);
        assert_eq!(Encryption::Ssl.default_port(), 465);
        assert_eq!(Encryption::Tls.default_port(), 587);
    }

    #[test]
    fn server_builder() {
        let server = ServerConfig::new("smtp.example.com", 465)
            .encryption(Encryption::Ssl)
            .need_auth(true)
            .connect_timeout(Duration::ZERO);

        assert_eq!(server.host, "smtp.example.com");
        assert_eq!(server.encryption, Encryption::Ssl);
        assert!(server.need_auth);
        assert!(server.connect_timeout.is_zero());
        assert!(server.tls_config.is_none());
        assert!(!server.is_local());
        assert!(ServerConfig::new("127.0.0.1", 25).is_local());
    }

    #[test]
    fn sender_debug_hides_password() {
        let sender = SenderConfig::new("user@example.com", "hunter2").name("User");
        let debug = format!("{sender:?}");
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
