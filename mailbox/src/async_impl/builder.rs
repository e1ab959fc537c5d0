use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::fetch::{self, MESSAGE_CHANNEL_CAPACITY, RecentMessages};
use super::transport::{Completion, Transport};
use crate::ImapError;
use crate::commands::CommandBuilder;
use crate::format::is_quotable;
use crate::messages::{MessageMeta, Messages};
use crate::tls::{create_tls_config, parse_server_name, with_default_port};
use crate::types::ConnectionState;

/// How long to wait for any single server response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long `close` waits for the server to acknowledge LOGOUT.
pub const DEFAULT_LOGOUT_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
struct Timeouts {
    response: Duration,
    logout_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response: DEFAULT_TIMEOUT,
            logout_grace: DEFAULT_LOGOUT_GRACE,
        }
    }
}

pub struct Builder {
    addr: String,
    timeouts: Timeouts,
}

pub struct Connector {
    addr: String,
    timeouts: Timeouts,
}

/// A connection that has been greeted by the server but not logged in.
pub struct Client<S = TlsStream<TcpStream>> {
    transport: Transport<S>,
    timeouts: Timeouts,
}

/// An authenticated connection. Commands take `&mut self` or `self`, so at
/// most one is ever in flight.
pub struct Session<S = TlsStream<TcpStream>> {
    transport: Transport<S>,
    timeouts: Timeouts,
}

impl Builder {
    /// `addr` is `host` or `host:port`; the port defaults to 993.
    pub fn new(addr: &str) -> Self {
        Self {
            addr: with_default_port(addr),
            timeouts: Timeouts::default(),
        }
    }

    pub fn timeout(mut self, wait: Duration) -> Self {
        self.timeouts.response = wait;
        self
    }

    pub fn logout_grace(mut self, grace: Duration) -> Self {
        self.timeouts.logout_grace = grace;
        self
    }

    pub fn build(self) -> Connector {
        Connector {
            addr: self.addr,
            timeouts: self.timeouts,
        }
    }

    pub async fn connect(self) -> Result<Client, ImapError> {
        self.build().connect().await
    }
}

impl Connector {
    #[tracing::instrument(skip(self), fields(addr = %self.addr))]
    pub async fn connect(self) -> Result<Client, ImapError> {
        tracing::info!("Connecting to IMAP server");

        let server_name = parse_server_name(&self.addr)?;
        let wait = self.timeouts.response;

        let sock = timeout(wait, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ImapError::Connection(format!("no TCP connection within {wait:?}")))?
            .map_err(|e| ImapError::Connection(e.to_string()))?;

        let connector = TlsConnector::from(create_tls_config());
        let stream = timeout(wait, connector.connect(server_name, sock))
            .await
            .map_err(|_| ImapError::Tls(format!("no TLS handshake within {wait:?}")))?
            .map_err(|e| ImapError::Tls(e.to_string()))?;

        tracing::info!("TLS connection established");

        self.handshake(stream).await
    }

    /// Reads the greeting over an already established stream, using this
    /// connector's timeouts.
    pub async fn handshake<S>(&self, stream: S) -> Result<Client<S>, ImapError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Client::greet(stream, self.timeouts).await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting over a caller supplied stream with default timeouts.
    pub async fn from_stream(stream: S) -> Result<Self, ImapError> {
        Self::greet(stream, Timeouts::default()).await
    }

    async fn greet(stream: S, timeouts: Timeouts) -> Result<Self, ImapError> {
        let mut transport = Transport::new(stream);
        transport.read_greeting(timeouts.response).await?;
        Ok(Self {
            transport,
            timeouts,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    #[tracing::instrument(skip(self, pass))]
    pub async fn login(mut self, user: &str, pass: &str) -> Result<Session<S>, ImapError> {
        let state = self.transport.state();
        if state != ConnectionState::TransportEstablished {
            return Err(ImapError::Auth(format!(
                "cannot log in while connection is {state}"
            )));
        }
        if !is_quotable(user) || !is_quotable(pass) {
            return Err(ImapError::Auth(
                "credentials contain characters that cannot be quoted".to_string(),
            ));
        }

        tracing::info!("Attempting IMAP login");

        let mut command = self
            .transport
            .send(|tag| {
                CommandBuilder::new(tag)
                    .login()
                    .username(user)
                    .password(pass)
            })
            .await?;
        let completion = self
            .transport
            .complete(&mut command, self.timeouts.response)
            .await?;

        if !completion.is_ok() {
            return Err(ImapError::Auth(completion.reason()));
        }
        if self.transport.state() == ConnectionState::Disconnected {
            return Err(ImapError::Auth(
                "server closed the connection during login".to_string(),
            ));
        }

        self.transport.set_state(ConnectionState::Authenticated);
        tracing::info!("IMAP login successful");

        Ok(Session {
            transport: self.transport,
            timeouts: self.timeouts,
        })
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Metadata of the `count` newest messages in `mailbox`, oldest first.
    ///
    /// All or nothing: any failure discards what arrived so far. After a
    /// malformed header the FETCH is still read to its end, so the session
    /// stays usable.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_recent(
        &mut self,
        mailbox: &str,
        count: u32,
    ) -> Result<Vec<MessageMeta>, ImapError> {
        let mut fetch =
            RecentMessages::start(&mut self.transport, mailbox, count, self.timeouts.response)
                .await?;

        let mut messages = Vec::with_capacity(fetch.expected());
        while let Some(message) = fetch.next().await? {
            messages.push(message);
        }

        tracing::info!(fetched = messages.len(), "Fetched message metadata");
        Ok(messages)
    }

    /// Like [`fetch_recent`](Self::fetch_recent), but hands out each message
    /// as soon as its response has been parsed.
    ///
    /// The session moves into a background task for the duration of the
    /// fetch; [`Messages::into_session`] gives it back.
    pub fn stream_recent(self, mailbox: &str, count: u32) -> Messages<S>
    where
        S: Send + 'static,
    {
        let mailbox = mailbox.to_string();
        let (tx, receiver) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let mut session = self;
            fetch::produce(
                &mut session.transport,
                &mailbox,
                count,
                session.timeouts.response,
                tx,
            )
            .await;
            session
        });

        Messages::new(receiver, task)
    }

    /// Logs out and closes the stream. The stream is shut down even when the
    /// server does not answer within the logout grace period.
    #[tracing::instrument(skip(self))]
    pub async fn close(mut self) {
        if self.transport.state() != ConnectionState::Disconnected {
            let grace = self.timeouts.logout_grace;
            match timeout(grace, self.logout()).await {
                Ok(Ok(completion)) if completion.is_ok() => tracing::info!("Logged out"),
                Ok(Ok(completion)) => {
                    tracing::warn!(reason = %completion.reason(), "LOGOUT rejected")
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "LOGOUT failed"),
                Err(_) => tracing::warn!(?grace, "No reply to LOGOUT"),
            }
        }
        self.transport.shutdown().await;
    }

    async fn logout(&mut self) -> Result<Completion, ImapError> {
        let mut command = self
            .transport
            .send(|tag| CommandBuilder::new(tag).logout())
            .await?;
        self.transport
            .complete(&mut command, self.timeouts.logout_grace)
            .await
    }
}
