//! Session tests against an in-memory SMTP server.
//!
//! `FakeConnector` hands out transports that answer each command the way a
//! small ESMTP server would, recording everything the client sends.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use wail_mime::{Envelope, MailConfig, TextPart};
use wail_smtp::{
    Connector, Encryption, Error, ErrorCategory, Result, SenderConfig, ServerConfig, Session,
    SessionState, SmtpConfig, Transport,
};

const GREETING: &str = "220 fake.test ESMTP ready";

/// Server behaviour plus everything observed on the wire.
#[derive(Debug, Default)]
struct Server {
    extensions: Vec<String>,
    starttls: bool,
    refuse_starttls: bool,
    login_prompt: Option<String>,
    reject_ehlo: bool,
    rejected: Vec<String>,
    password: String,
    hang: bool,
    refuse: bool,
    generation: usize,
    connects: usize,
    commands: Vec<String>,
    messages: Vec<String>,
}

impl Server {
    fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(ToString::to_string).collect(),
            password: "secret".into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct FakeConnector(Arc<Mutex<Server>>);

impl FakeConnector {
    fn new(server: Server) -> Self {
        Self(Arc::new(Mutex::new(server)))
    }

    fn server(&self) -> std::sync::MutexGuard<'_, Server> {
        self.0.lock().unwrap()
    }

    fn commands(&self) -> Vec<String> {
        self.server().commands.clone()
    }

    fn sent(&self, prefix: &str) -> bool {
        self.server().commands.iter().any(|c| c.starts_with(prefix))
    }

    /// Drops every open connection on the server side.
    fn drop_connections(&self) {
        self.server().generation += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStep {
    LoginUsername,
    LoginPassword,
    CramMd5,
}

#[derive(Debug)]
struct FakeTransport {
    server: Arc<Mutex<Server>>,
    generation: usize,
    encrypted: bool,
    replies: VecDeque<String>,
    pending: String,
    data: Option<String>,
    auth: Option<AuthStep>,
}

impl FakeTransport {
    fn is_stale(&self) -> bool {
        self.server.lock().unwrap().generation != self.generation
    }

    fn reply(&mut self, line: &str) {
        self.replies.push_back(line.to_string());
    }

    fn handle(&mut self, line: &str) {
        if let Some(data) = self.data.as_mut() {
            if line == "." {
                let message = self.data.take().unwrap_or_default();
                self.server.lock().unwrap().messages.push(message);
                self.reply("250 2.0.0 queued");
            } else {
                data.push_str(line);
                data.push_str("\r\n");
            }
            return;
        }

        self.server.lock().unwrap().commands.push(line.to_string());

        if let Some(step) = self.auth.take() {
            self.auth_step(step, line);
            return;
        }

        let upper = line.to_ascii_uppercase();
        let verb = upper.split_whitespace().next().unwrap_or_default();
        match verb {
            "EHLO" => self.ehlo(),
            "HELO" => self.reply("250 fake.test"),
            "STARTTLS" => {
                if self.server.lock().unwrap().refuse_starttls {
                    self.reply("454 4.7.0 TLS not available");
                } else {
                    self.reply("220 2.0.0 ready to start TLS");
                }
            }
            "AUTH" => self.auth_start(line),
            "MAIL" => self.reply("250 2.1.0 sender ok"),
            "RCPT" => {
                let address = line
                    .split_once('<')
                    .and_then(|(_, rest)| rest.strip_suffix('>'))
                    .unwrap_or_default()
                    .to_string();
                let rejected = self.server.lock().unwrap().rejected.contains(&address);
                if rejected {
                    self.reply("550 5.1.1 no such user");
                } else {
                    self.reply("250 2.1.5 recipient ok");
                }
            }
            "DATA" => {
                self.data = Some(String::new());
                self.reply("354 end data with <CR><LF>.<CR><LF>");
            }
            "RSET" | "NOOP" => self.reply("250 2.0.0 ok"),
            "QUIT" => self.reply("221 2.0.0 bye"),
            _ => self.reply("500 5.5.1 unrecognized command"),
        }
    }

    fn ehlo(&mut self) {
        let (reject, mut lines) = {
            let server = self.server.lock().unwrap();
            let mut lines = server.extensions.clone();
            if server.starttls && !self.encrypted {
                lines.push("STARTTLS".into());
            }
            (server.reject_ehlo, lines)
        };
        if reject {
            self.reply("502 5.5.2 EHLO not supported");
            return;
        }

        lines.insert(0, "fake.test".into());
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            let sep = if i == last { ' ' } else { '-' };
            self.reply(&format!("250{sep}{line}"));
        }
    }

    fn auth_start(&mut self, line: &str) {
        let mut parts = line.split_whitespace().skip(1);
        match parts.next().map(str::to_ascii_uppercase).as_deref() {
            Some("LOGIN") => {
                let prompt = self.server.lock().unwrap().login_prompt.clone();
                let prompt = prompt.unwrap_or_else(|| "Username:".into());
                self.auth = Some(AuthStep::LoginUsername);
                self.reply(&format!("334 {}", STANDARD.encode(prompt)));
            }
            Some("CRAM-MD5") => {
                self.auth = Some(AuthStep::CramMd5);
                let challenge = STANDARD.encode("<1896.697170952@fake.test>");
                self.reply(&format!("334 {challenge}"));
            }
            Some("PLAIN") => {
                let decoded = parts
                    .next()
                    .and_then(|b64| STANDARD.decode(b64).ok())
                    .unwrap_or_default();
                let expected = format!("\0user@example.com\0{}", self.expected_password());
                self.finish_auth(decoded == expected.as_bytes());
            }
            _ => self.reply("504 5.5.4 mechanism not supported"),
        }
    }

    fn auth_step(&mut self, step: AuthStep, line: &str) {
        if line == "*" {
            self.reply("501 5.7.0 authentication cancelled");
            return;
        }
        let decoded = STANDARD.decode(line).unwrap_or_default();
        match step {
            AuthStep::LoginUsername => {
                self.auth = Some(AuthStep::LoginPassword);
                self.reply("334 UGFzc3dvcmQ6");
            }
            AuthStep::LoginPassword => {
                let ok = decoded == self.expected_password().as_bytes();
                self.finish_auth(ok);
            }
            AuthStep::CramMd5 => {
                let ok = String::from_utf8_lossy(&decoded).starts_with("user@example.com ");
                self.finish_auth(ok);
            }
        }
    }

    fn expected_password(&self) -> String {
        self.server.lock().unwrap().password.clone()
    }

    fn finish_auth(&mut self, ok: bool) {
        if ok {
            self.reply("235 2.7.0 authentication successful");
        } else {
            self.reply("535 5.7.8 authentication credentials invalid");
        }
    }
}

impl Transport for FakeTransport {
    async fn read_line(&mut self) -> Result<String> {
        if self.is_stale() {
            return Err(Error::ConnectionClosed);
        }
        self.replies.pop_front().ok_or(Error::ConnectionClosed)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.is_stale() {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        self.pending.push_str(&String::from_utf8_lossy(data));
        while let Some((line, rest)) = self.pending.split_once("\r\n") {
            let line = line.to_string();
            self.pending = rest.to_string();
            self.handle(&line);
        }
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}

impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, server: &ServerConfig) -> Result<FakeTransport> {
        let (hang, refuse) = {
            let state = self.server();
            (state.hang, state.refuse)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if refuse {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        }

        let generation = {
            let mut state = self.server();
            state.connects += 1;
            state.generation
        };
        Ok(FakeTransport {
            server: Arc::clone(&self.0),
            generation,
            encrypted: server.encryption == Encryption::Ssl,
            replies: VecDeque::from([GREETING.to_string()]),
            pending: String::new(),
            data: None,
            auth: None,
        })
    }

    async fn upgrade(
        &self,
        mut transport: FakeTransport,
        _server: &ServerConfig,
    ) -> Result<FakeTransport> {
        transport.encrypted = true;
        Ok(transport)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn smtp_config(encryption: Encryption, need_auth: bool) -> SmtpConfig {
    SmtpConfig::new(
        ServerConfig::new("smtp.fake.test", encryption.default_port())
            .encryption(encryption)
            .need_auth(need_auth),
        SenderConfig::new("user@example.com", "secret").name("Test User"),
    )
}

fn open(server: Server, config: SmtpConfig) -> (Session<FakeConnector>, FakeConnector) {
    init_tracing();
    let connector = FakeConnector::new(server);
    (Session::with_connector(config, connector.clone()), connector)
}

fn envelope() -> Envelope {
    let mut envelope = Envelope::new(MailConfig::default());
    envelope.set_subject("Status report");
    envelope.set_to(["alice@example.com"]).unwrap();
    envelope.set_cc(["bob@example.com"]).unwrap();
    envelope.set_message(TextPart::plain("All systems nominal.\r\n.\r\nEnd."));
    envelope
}

#[tokio::test]
async fn dial_send_close_send_reconnects() {
    let mut server = Server::new(&["SIZE 100000", "AUTH PLAIN LOGIN"]);
    server.starttls = true;
    let (mut session, connector) = open(server, smtp_config(Encryption::Tls, true));

    session.dial().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.max_message_size(), 100_000);
    assert!(connector.sent("STARTTLS"));
    assert!(connector.sent("AUTH LOGIN"));

    let mut envelope = envelope();
    session.send(&mut envelope).await.unwrap();

    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);

    session.send(&mut envelope).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    let server = connector.server();
    assert_eq!(server.connects, 2);
    assert_eq!(server.messages.len(), 2);

    let message = &server.messages[0];
    assert!(message.contains("From: =?UTF-8?B?VGVzdCBVc2Vy?= <user@example.com>\r\n"));
    assert!(message.contains("To: <alice@example.com>\r\n"));
    assert!(message.contains("Cc: <bob@example.com>\r\n"));
    assert!(message.contains("MIME-Version: 1.0\r\n"));
    let rcpts = server.commands.iter().filter(|c| c.starts_with("RCPT TO:"));
    assert_eq!(rcpts.count(), 4);
}

#[tokio::test]
async fn transmits_dot_stuffed_payload() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    let mut envelope = Envelope::new(MailConfig::default().encoding(
        wail_mime::TransferEncoding::QuotedPrintable,
    ));
    envelope.set_to(["alice@example.com"]).unwrap();
    envelope.set_message(TextPart::plain(".leading dot\r\nplain line"));
    session.send(&mut envelope).await.unwrap();

    let server = connector.server();
    // The fake server stores the stuffed lines verbatim.
    assert!(server.messages[0].contains("\r\n..leading dot\r\nplain line\r\n"));
}

#[tokio::test]
async fn operations_before_dial_fail() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));

    let err = tokio_test::assert_err!(session.send(&mut envelope()).await);
    assert!(matches!(err, Error::NotConnected));
    assert!(matches!(session.close().await, Err(Error::NotConnected)));
    assert_eq!(connector.server().connects, 0);
}

#[tokio::test]
async fn dial_requires_configuration() {
    let mut session: Session = Session::default();
    let err = session.dial().await.unwrap_err();
    assert!(matches!(err, Error::ConfigMissing));
    assert_eq!(err.category(), ErrorCategory::Config);

    let mut config = smtp_config(Encryption::None, false);
    config.server.host = String::new();
    let (mut session, connector) = open(Server::new(&[]), config);
    assert!(matches!(session.dial().await, Err(Error::InvalidConfig(_))));
    assert_eq!(connector.server().connects, 0);
}

#[tokio::test]
async fn send_requires_message() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    let mut empty = Envelope::default();
    empty.set_to(["alice@example.com"]).unwrap();
    assert!(matches!(
        session.send(&mut empty).await,
        Err(Error::NilMessage)
    ));
    assert!(!connector.sent("MAIL"));
}

#[tokio::test]
async fn send_requires_recipients() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    let mut envelope = Envelope::default();
    envelope.set_message(TextPart::plain("nobody will read this"));
    let err = session.send(&mut envelope).await.unwrap_err();
    assert!(matches!(err, Error::NoRecipients));
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(!connector.sent("MAIL"));
}

#[tokio::test]
async fn first_rejected_recipient_aborts_send() {
    let mut server = Server::new(&[]);
    server.rejected = vec!["bob@example.com".into()];
    let (mut session, connector) = open(server, smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    let err = session.send(&mut envelope()).await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 550, .. }));
    assert!(err.is_permanent());
    assert!(connector.sent("RSET"));
    assert!(!connector.sent("DATA"));

    // The session is still usable afterwards.
    let mut only_alice = envelope();
    only_alice.set_cc(["carol@example.com"]).unwrap();
    session.send(&mut only_alice).await.unwrap();
    assert_eq!(connector.server().messages.len(), 1);
    assert_eq!(connector.server().connects, 1);
}

#[tokio::test]
async fn login_refused_over_plaintext() {
    let (mut session, connector) =
        open(Server::new(&["AUTH LOGIN"]), smtp_config(Encryption::None, true));

    let err = session.dial().await.unwrap_err();
    assert!(matches!(err, Error::InsecureChannel("LOGIN")));
    assert_eq!(err.category(), ErrorCategory::Auth);
    assert_eq!(connector.commands().last().map(String::as_str), Some("QUIT"));
    assert!(!connector.sent("AUTH"));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn missing_password_is_reported() {
    let mut config = smtp_config(Encryption::Ssl, true);
    config.sender.password.clear();
    let (mut session, _connector) = open(Server::new(&["AUTH LOGIN"]), config);

    assert!(matches!(
        session.dial().await,
        Err(Error::CredentialsMissing("password"))
    ));
}

#[tokio::test]
async fn missing_login_is_reported() {
    let mut config = smtp_config(Encryption::Ssl, true);
    config.sender.login.clear();
    let (mut session, connector) = open(Server::new(&["AUTH LOGIN"]), config);

    let err = session.dial().await.unwrap_err();
    assert!(matches!(err, Error::CredentialsMissing("login")));
    assert_eq!(err.category(), ErrorCategory::Auth);
    assert!(!connector.sent("AUTH"));
    assert_eq!(connector.commands().last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn unknown_login_prompt_cancels_exchange() {
    let mut server = Server::new(&["AUTH LOGIN"]);
    server.login_prompt = Some("Realm:".into());
    let (mut session, connector) = open(server, smtp_config(Encryption::Ssl, true));

    let err = session.dial().await.unwrap_err();
    assert!(matches!(&err, Error::UnexpectedChallenge(prompt) if prompt == "Realm:"));
    assert_eq!(session.state(), SessionState::Disconnected);

    let commands = connector.commands();
    let auth = commands.iter().position(|c| c == "AUTH LOGIN").unwrap();
    assert_eq!(commands[auth..], ["AUTH LOGIN", "*", "QUIT"]);
}

#[tokio::test]
async fn unsupported_mechanisms_quit() {
    let (mut session, connector) = open(
        Server::new(&["AUTH GSSAPI NTLM"]),
        smtp_config(Encryption::Ssl, true),
    );

    assert!(matches!(
        session.dial().await,
        Err(Error::UnsupportedAuthMethod(_))
    ));
    assert!(connector.sent("QUIT"));
}

#[tokio::test]
async fn xoauth2_is_not_implemented() {
    let (mut session, _connector) =
        open(Server::new(&["AUTH XOAUTH2"]), smtp_config(Encryption::Ssl, true));

    assert!(matches!(
        session.dial().await,
        Err(Error::UnimplementedAuthMethod("XOAUTH2"))
    ));
}

#[tokio::test]
async fn cram_md5_over_plaintext() {
    let (mut session, connector) = open(
        Server::new(&["AUTH CRAM-MD5 PLAIN"]),
        smtp_config(Encryption::None, true),
    );

    session.dial().await.unwrap();
    assert!(connector.sent("AUTH CRAM-MD5"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn plain_after_starttls() {
    let mut server = Server::new(&["AUTH PLAIN"]);
    server.starttls = true;
    let (mut session, connector) = open(server, smtp_config(Encryption::Tls, true));

    session.dial().await.unwrap();
    let commands = connector.commands();
    let starttls = commands.iter().position(|c| c == "STARTTLS").unwrap();
    let auth = commands.iter().position(|c| c.starts_with("AUTH PLAIN ")).unwrap();
    assert!(starttls < auth);
    assert_eq!(commands.iter().filter(|c| c.starts_with("EHLO ")).count(), 2);
}

#[tokio::test]
async fn refused_starttls_quits() {
    let mut server = Server::new(&["AUTH PLAIN"]);
    server.starttls = true;
    server.refuse_starttls = true;
    let (mut session, connector) = open(server, smtp_config(Encryption::Tls, true));

    let err = session.dial().await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 454, .. }));
    assert!(err.is_transient());
    assert_eq!(session.state(), SessionState::Disconnected);

    let commands = connector.commands();
    assert!(commands[0].starts_with("EHLO "));
    assert_eq!(commands[1..], ["STARTTLS", "QUIT"]);
}

#[tokio::test]
async fn wrong_password_fails_auth() {
    let mut server = Server::new(&["AUTH LOGIN"]);
    server.password = "other".into();
    let (mut session, connector) = open(server, smtp_config(Encryption::Ssl, true));

    let err = session.dial().await.unwrap_err();
    assert!(matches!(err, Error::AuthFailed { code: 535, .. }));
    assert!(connector.sent("QUIT"));
}

#[tokio::test]
async fn missing_starttls_continues_in_plaintext() {
    let (mut session, connector) =
        open(Server::new(&["8BITMIME"]), smtp_config(Encryption::Tls, false));

    session.dial().await.unwrap();
    assert!(!connector.sent("STARTTLS"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn helo_fallback_when_ehlo_rejected() {
    let mut server = Server::new(&["SIZE 10"]);
    server.reject_ehlo = true;
    let (mut session, connector) = open(server, smtp_config(Encryption::None, false));

    session.dial().await.unwrap();
    assert!(connector.sent("HELO "));
    assert_eq!(session.max_message_size(), 0);
}

#[tokio::test]
async fn oversize_message_is_rejected_locally() {
    let (mut session, connector) =
        open(Server::new(&["SIZE 100"]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    let err = session.send(&mut envelope()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Mime(wail_mime::Error::MessageTooLarge { limit: 100, .. })
    ));
    assert_eq!(err.category(), ErrorCategory::SizeLimit);
    assert!(connector.sent("RSET"));
    assert!(!connector.sent("DATA"));
}

#[tokio::test]
async fn dead_connection_is_redialed_once() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    connector.drop_connections();
    session.send(&mut envelope()).await.unwrap();
    assert_eq!(connector.server().connects, 2);
    assert_eq!(connector.server().messages.len(), 1);
}

#[tokio::test]
async fn failed_redial_is_surfaced() {
    let (mut session, connector) = open(Server::new(&[]), smtp_config(Encryption::None, false));
    session.dial().await.unwrap();

    connector.drop_connections();
    connector.server().refuse = true;

    let err = session.send(&mut envelope()).await.unwrap_err();
    assert!(matches!(&err, Error::ReconnectFailed(inner) if matches!(**inner, Error::Io(_))));
    assert_eq!(err.category(), ErrorCategory::Connection);
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connect_timeout() {
    let mut server = Server::new(&[]);
    server.hang = true;
    let mut config = smtp_config(Encryption::None, false);
    config.server.connect_timeout = Duration::from_secs(5);
    let (mut session, _connector) = open(server, config);

    assert!(matches!(
        session.dial().await,
        Err(Error::ConnectTimeout(timeout)) if timeout == Duration::from_secs(5)
    ));
    assert_eq!(session.state(), SessionState::Disconnected);
}
