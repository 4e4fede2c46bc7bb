//! Byte-level transport seams used by the session.
//!
//! [`Transport`] is a line-oriented duplex channel; [`Connector`] opens
//! transports and upgrades them to TLS. The session is generic over the
//! connector, which lets tests substitute an in-memory server.

use crate::config::{Encryption, ServerConfig};
use crate::connection::SmtpStream;
use crate::error::Result;
use std::future::Future;

/// Line-oriented duplex channel to an SMTP server.
pub trait Transport: Send {
    /// Reads one line, without the trailing CRLF.
    ///
    /// Returns [`crate::Error::ConnectionClosed`] at end of stream.
    fn read_line(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Writes and flushes `data`.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Returns true if the channel is encrypted.
    fn is_encrypted(&self) -> bool;
}

/// Opens transports to the configured server.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Opens a connection; implicit TLS is applied for [`Encryption::Ssl`].
    fn connect(
        &self,
        server: &ServerConfig,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;

    /// Performs the TLS handshake on an established plaintext transport.
    fn upgrade(
        &self,
        transport: Self::Transport,
        server: &ServerConfig,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// Connector for real servers over TCP, with TLS via rustls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Transport for SmtpStream {
    async fn read_line(&mut self) -> Result<String> {
        Self::read_line(self).await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        Self::write_all(self, data).await
    }

    fn is_encrypted(&self) -> bool {
        Self::is_encrypted(self)
    }
}

impl Connector for TcpConnector {
    type Transport = SmtpStream;

    async fn connect(&self, server: &ServerConfig) -> Result<SmtpStream> {
        let tls_config = server.tls_config.clone();
        match server.encryption {
            Encryption::Ssl => {
                crate::connection::connect_tls(&server.host, server.port, tls_config).await
            }
            Encryption::None | Encryption::Tls => {
                crate::connection::connect(&server.host, server.port).await
            }
        }
    }

    async fn upgrade(&self, transport: SmtpStream, server: &ServerConfig) -> Result<SmtpStream> {
        transport
            .upgrade_to_tls(&server.host, server.tls_config.clone())
            .await
    }
}
