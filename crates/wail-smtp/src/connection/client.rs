//! SMTP command/reply client over a [`Transport`].

use super::ServerInfo;
use crate::auth::{Authenticator, Channel};
use crate::command::Command;
use crate::config::SenderConfig;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::transport::Transport;
use crate::types::{Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// SMTP client: sends commands and reads replies on one transport.
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    server_info: ServerInfo,
}

impl<T: Transport> Client<T> {
    /// Creates a client from a transport and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_transport(mut transport: T) -> Result<Self> {
        let greeting = Self::read_reply(&mut transport).await?.into_result()?;

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            transport,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
        })
    }

    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.transport.is_encrypted()
    }

    /// Splits the client into its transport and server information.
    #[must_use]
    pub fn into_parts(self) -> (T, ServerInfo) {
        (self.transport, self.server_info)
    }

    /// Reassembles a client around a (typically upgraded) transport.
    #[must_use]
    pub const fn from_parts(transport: T, server_info: ServerInfo) -> Self {
        Self {
            transport,
            server_info,
        }
    }

    /// Sends a command and reads its reply, whatever the code.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed reply.
    pub async fn command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::trace!(command = cmd.verb(), "SMTP command");
        self.transport.write_all(&cmd.serialize()).await?;
        Self::read_reply(&mut self.transport).await
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects EHLO.
    pub async fn ehlo(&mut self, client_hostname: &str) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.command(&cmd).await?.into_result()?;

        // First line is the server's greeting, the rest are extensions.
        self.server_info.set_extensions(reply.message.iter().skip(1));
        Ok(())
    }

    /// Sends HELO; the server advertises no extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects HELO.
    pub async fn helo(&mut self, client_hostname: &str) -> Result<()> {
        let cmd = Command::Helo {
            hostname: client_hostname.to_string(),
        };
        self.command(&cmd).await?.into_result()?;
        self.server_info.extensions.clear();
        Ok(())
    }

    /// Sends STARTTLS; the caller then performs the handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer 220.
    pub async fn starttls(&mut self) -> Result<()> {
        self.command(&Command::StartTls)
            .await?
            .expect_code(|code| code == ReplyCode::SERVICE_READY)?;
        Ok(())
    }

    /// Runs a full AUTH exchange.
    ///
    /// A mechanism error cancels the exchange with `*`.
    ///
    /// # Errors
    ///
    /// Returns the mechanism's error, or [`Error::AuthFailed`] if the server
    /// refuses the credentials.
    pub async fn authenticate(
        &mut self,
        auth: Authenticator,
        sender: &SenderConfig,
        channel: Channel,
    ) -> Result<()> {
        let initial = auth.start(sender, channel)?;
        let cmd = Command::Auth {
            mechanism: auth.mechanism(),
            initial_response: initial.map(|response| STANDARD.encode(response)),
        };
        let mut reply = self.command(&cmd).await?;

        loop {
            match reply.code {
                ReplyCode::AUTH_SUCCESS => return Ok(()),
                ReplyCode::AUTH_CONTINUE => {
                    let encoded = reply.message.first().map_or("", |line| line.trim());
                    let answer = STANDARD
                        .decode(encoded)
                        .map_err(|e| Error::UnexpectedChallenge(format!("{encoded}: {e}")))
                        .and_then(|challenge| auth.next(&challenge, sender));

                    match answer {
                        Ok(response) => {
                            let line = Command::AuthResponse(STANDARD.encode(response));
                            reply = self.command(&line).await?;
                        }
                        Err(e) => {
                            let _ = self.command(&Command::AuthResponse("*".into())).await;
                            return Err(e);
                        }
                    }
                }
                code => {
                    return Err(Error::AuthFailed {
                        code: code.as_u16(),
                        message: reply.message_text(),
                    });
                }
            }
        }
    }

    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<()> {
        let cmd = Command::MailFrom {
            from: from.to_string(),
        };
        self.command(&cmd).await?.into_result()?;
        Ok(())
    }

    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<()> {
        let cmd = Command::RcptTo { to: to.to_string() };
        self.command(&cmd).await?.into_result()?;
        Ok(())
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(&mut self) -> Result<()> {
        self.command(&Command::Data)
            .await?
            .expect_code(|code| code == ReplyCode::START_DATA)?;
        Ok(())
    }

    /// Sends the message content and the terminating `.` line.
    ///
    /// Line endings are normalized to CRLF and lines starting with `.` are
    /// dot-stuffed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the server rejects the message.
    pub async fn send_message(&mut self, message: &[u8]) -> Result<Reply> {
        self.transport.write_all(&dot_stuff(message)).await?;
        Self::read_reply(&mut self.transport).await?.into_result()
    }

    /// Resets the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn rset(&mut self) -> Result<()> {
        self.command(&Command::Rset).await?.into_result()?;
        Ok(())
    }

    /// Checks that the server is still responsive.
    ///
    /// # Errors
    ///
    /// Returns an error if the NOOP command fails.
    pub async fn noop(&mut self) -> Result<()> {
        self.command(&Command::Noop).await?.into_result()?;
        Ok(())
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(&mut self) -> Result<()> {
        self.command(&Command::Quit).await?.into_result()?;
        Ok(())
    }

    async fn read_reply(transport: &mut T) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = transport.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }
}

/// Frames a message for DATA: CRLF line endings, leading dots doubled,
/// terminated by `.` on its own line.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);
    let body = message.strip_suffix(b"\r\n").unwrap_or(message);
    let body = body.strip_suffix(b"\n").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
