//! High-level SMTP session with reconnect-on-send.
//!
//! `Session` owns the whole dialog: connect, capability discovery, optional
//! STARTTLS upgrade, authentication and message transmission. Before each
//! send the connection is probed with NOOP and re-dialed once if it is gone.
//!
//! ## Example
//!
//! ```no_run
//! use wail_mime::{Envelope, MailConfig, TextPart};
//! use wail_smtp::{Encryption, SenderConfig, ServerConfig, Session, SmtpConfig};
//!
//! # async fn run() -> wail_smtp::Result<()> {
//! let server = ServerConfig::new("smtp.example.com", Encryption::Tls.default_port())
//!     .need_auth(true);
//! let sender = SenderConfig::new("me@example.com", "app-password").name("Me");
//!
//! let mut session = Session::new(SmtpConfig::new(server, sender));
//! session.dial().await?;
//!
//! let mut envelope = Envelope::new(MailConfig::default());
//! envelope.set_subject("Hello");
//! envelope.set_to(["you@example.com"])?;
//! envelope.set_message(TextPart::plain("Hi there"));
//!
//! session.send(&mut envelope).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{Authenticator, Channel};
use crate::config::{Encryption, SmtpConfig};
use crate::connection::{Client, ServerInfo};
use crate::error::{Error, Result};
use crate::transport::{Connector, TcpConnector};
use wail_mime::{Address, Envelope};

/// Current state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connecting and waiting for the greeting.
    Connecting,
    /// Greeting and EHLO/HELO done.
    Greeted,
    /// STARTTLS upgrade done.
    TlsUpgraded,
    /// Authentication done.
    Authenticated,
    /// Ready to send.
    Ready,
}

/// SMTP session.
pub struct Session<C: Connector = TcpConnector> {
    config: Option<SmtpConfig>,
    connector: C,
    client: Option<Client<C::Transport>>,
    state: SessionState,
    max_message_size: usize,
    /// A dial has succeeded at least once.
    established: bool,
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("connected", &self.client.is_some())
            .field("state", &self.state)
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session for real servers. No connection is made until
    /// [`Session::dial`].
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl Default for Session {
    /// A session without configuration; [`Session::dial`] fails with
    /// [`Error::ConfigMissing`].
    fn default() -> Self {
        Self {
            config: None,
            connector: TcpConnector,
            client: None,
            state: SessionState::Disconnected,
            max_message_size: 0,
            established: false,
        }
    }
}

impl<C: Connector> Session<C> {
    /// Creates a session that opens transports through `connector`.
    #[must_use]
    pub const fn with_connector(config: SmtpConfig, connector: C) -> Self {
        Self {
            config: Some(config),
            connector,
            client: None,
            state: SessionState::Disconnected,
            max_message_size: 0,
            established: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the configuration, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&SmtpConfig> {
        self.config.as_ref()
    }

    /// Returns the server's capabilities while connected.
    #[must_use]
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.client.as_ref().map(Client::server_info)
    }

    /// Returns the maximum message size (0 means unlimited).
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Connects, greets, upgrades to TLS and authenticates as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is missing or invalid, the
    /// connection cannot be established in time, or any negotiation step
    /// fails.
    pub async fn dial(&mut self) -> Result<()> {
        let config = self.config.clone().ok_or(Error::ConfigMissing)?;
        if config.server.host.trim().is_empty() {
            return Err(Error::InvalidConfig("server host is empty".into()));
        }

        self.client = None;
        self.state = SessionState::Connecting;
        match self.negotiate(&config).await {
            Ok(client) => {
                self.client = Some(client);
                self.state = SessionState::Ready;
                self.established = true;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn negotiate(&mut self, config: &SmtpConfig) -> Result<Client<C::Transport>> {
        let server = &config.server;
        tracing::debug!(
            host = %server.host,
            port = server.port,
            encryption = ?server.encryption,
            "Dialing SMTP server"
        );

        let mut client = self.establish(config).await?;
        let hostname = local_hostname();
        greet(&mut client, &hostname).await?;
        self.state = SessionState::Greeted;

        if let Some(size) = client.server_info().max_message_size() {
            self.max_message_size = size;
        }
        tracing::debug!(
            server = %client.server_info().hostname,
            extensions = ?client.server_info().extensions,
            max_message_size = self.max_message_size,
            "Server capabilities"
        );

        if server.encryption == Encryption::Tls && !client.is_encrypted() {
            if client.server_info().supports_starttls() {
                client = self.starttls(client, config, &hostname).await?;
                self.state = SessionState::TlsUpgraded;
                if let Some(size) = client.server_info().max_message_size() {
                    self.max_message_size = size;
                }
            } else {
                tracing::warn!(
                    host = %server.host,
                    "STARTTLS requested but not offered, continuing without TLS"
                );
            }
        }

        if server.need_auth {
            if let Err(e) = authenticate(&mut client, config).await {
                let _ = client.quit().await;
                return Err(e);
            }
            self.state = SessionState::Authenticated;
        }

        Ok(client)
    }

    /// Opens the transport and reads the greeting under the connect timeout.
    async fn establish(&self, config: &SmtpConfig) -> Result<Client<C::Transport>> {
        let server = &config.server;
        let connect = async {
            let transport = self.connector.connect(server).await?;
            Client::from_transport(transport).await
        };

        if server.connect_timeout.is_zero() {
            connect.await
        } else {
            tokio::time::timeout(server.connect_timeout, connect)
                .await
                .map_err(|_| Error::ConnectTimeout(server.connect_timeout))?
        }
    }

    async fn starttls(
        &self,
        mut client: Client<C::Transport>,
        config: &SmtpConfig,
        hostname: &str,
    ) -> Result<Client<C::Transport>> {
        if let Err(e) = client.starttls().await {
            let _ = client.quit().await;
            return Err(e);
        }

        let (transport, server_info) = client.into_parts();
        let transport = self.connector.upgrade(transport, &config.server).await?;
        let mut client = Client::from_parts(transport, server_info);
        tracing::debug!("STARTTLS negotiated");

        if let Err(e) = greet(&mut client, hostname).await {
            let _ = client.quit().await;
            return Err(e);
        }
        Ok(client)
    }

    /// Sends the envelope, re-dialing once if the connection was lost.
    ///
    /// The `From` header is set from the sender configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the session was never dialed, the envelope has no
    /// message or recipients, reconnecting fails, rendering fails, or the
    /// server rejects any step. The first rejected recipient aborts the send.
    pub async fn send(&mut self, envelope: &mut Envelope) -> Result<()> {
        if !self.established {
            return Err(Error::NotConnected);
        }
        if envelope.message().is_none() {
            return Err(Error::NilMessage);
        }

        self.ensure_connected().await?;

        let sender = self
            .config
            .as_ref()
            .map(|config| config.sender.clone())
            .ok_or(Error::ConfigMissing)?;
        let recipients: Vec<Address> = envelope.recipients().into_iter().cloned().collect();
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }

        let max_message_size = self.max_message_size;
        let client = self.client.as_mut().ok_or(Error::NotConnected)?;

        if let Err(e) = client.mail_from(&sender.login).await {
            let _ = client.rset().await;
            return Err(e);
        }
        for recipient in &recipients {
            if let Err(e) = client.rcpt_to(recipient.as_str()).await {
                tracing::warn!(recipient = %recipient, error = %e, "Recipient rejected");
                let _ = client.rset().await;
                return Err(e);
            }
        }

        envelope.set_from(&sender.name, &sender.login);
        let message = match envelope.finalize(max_message_size) {
            Ok(message) => message,
            Err(e) => {
                let _ = client.rset().await;
                return Err(e.into());
            }
        };

        client.data().await?;
        client.send_message(&message).await?;

        tracing::info!(
            recipients = recipients.len(),
            size = message.len(),
            "Message accepted"
        );
        Ok(())
    }

    /// Probes the connection and re-dials exactly once if it is unusable.
    async fn ensure_connected(&mut self) -> Result<()> {
        let alive = match self.client.as_mut() {
            Some(client) => client.noop().await.is_ok(),
            None => false,
        };
        if alive {
            return Ok(());
        }

        tracing::info!("Connection lost, reconnecting");
        self.client = None;
        self.state = SessionState::Disconnected;
        self.dial().await.map_err(|e| {
            tracing::warn!(error = %e, "Reconnect failed");
            Error::ReconnectFailed(Box::new(e))
        })
    }

    /// Sends QUIT and drops the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a live connection, or the
    /// transport error from QUIT.
    pub async fn close(&mut self) -> Result<()> {
        let mut client = self.client.take().ok_or(Error::NotConnected)?;
        self.state = SessionState::Disconnected;
        client.quit().await
    }
}

/// EHLO, falling back to HELO when the server rejects EHLO outright.
async fn greet<T: crate::transport::Transport>(
    client: &mut Client<T>,
    hostname: &str,
) -> Result<()> {
    match client.ehlo(hostname).await {
        Err(e) if e.is_permanent() => {
            tracing::debug!(error = %e, "EHLO rejected, falling back to HELO");
            client.helo(hostname).await
        }
        result => result,
    }
}

async fn authenticate<T: crate::transport::Transport>(
    client: &mut Client<T>,
    config: &SmtpConfig,
) -> Result<()> {
    let sender = &config.sender;
    if sender.login.is_empty() {
        return Err(Error::CredentialsMissing("login"));
    }
    if sender.password.is_empty() {
        return Err(Error::CredentialsMissing("password"));
    }

    let offered = client.server_info().auth_mechanisms();
    let Some(auth) = Authenticator::select(&offered) else {
        let names: Vec<&str> = offered.iter().map(|m| m.as_str()).collect();
        return Err(Error::UnsupportedAuthMethod(names.join(" ")));
    };

    tracing::debug!(mechanism = %auth.mechanism(), "Authenticating");
    let channel = Channel {
        encrypted: client.is_encrypted(),
        local: config.server.is_local(),
    };
    client.authenticate(auth, sender, channel).await
}

/// Local hostname for EHLO, `localhost` when it cannot be determined.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
