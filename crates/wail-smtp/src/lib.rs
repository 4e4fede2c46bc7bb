//! # wail-smtp
//!
//! SMTP delivery for messages composed with `wail-mime`, implementing the
//! client side of RFC 5321.
//!
//! ## Features
//!
//! - **Session**: dial, capability discovery, send, close, with a single
//!   automatic re-dial when the connection is found dead before a send
//! - **TLS**: implicit TLS (port 465) and STARTTLS via rustls
//! - **Authentication**: LOGIN, CRAM-MD5 and PLAIN, chosen from the
//!   server's advertised mechanisms
//! - **Pluggable transport**: the session is generic over a [`Connector`],
//!   so tests can drive it against an in-memory server
//!
//! ## Session States
//!
//! ```text
//! Disconnected ─→ Connecting ─→ Greeted ─→ [TlsUpgraded] ─→ [Authenticated] ─→ Ready
//!      ↑                                                                         │
//!      └──────────────────────────────── close() ────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization
//! - [`connection`]: TCP/TLS streams and the command/reply client
//! - [`parser`]: Reply parser
//! - [`types`]: Replies, reply codes and EHLO extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
pub mod command;
mod config;
pub mod connection;
mod error;
pub mod parser;
mod session;
mod transport;
pub mod types;

pub use auth::{Authenticator, Channel};
pub use config::{Encryption, SenderConfig, ServerConfig, SmtpConfig};
pub use connection::{Client, ServerInfo};
pub use error::{Error, ErrorCategory, Result};
pub use session::{Session, SessionState};
pub use transport::{Connector, TcpConnector, Transport};
pub use types::{AuthMechanism, Extension, Reply, ReplyCode};
