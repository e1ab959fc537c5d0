use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;

use super::codec::ImapCodec;
use crate::ImapError;
use crate::commands::Command;
use crate::types::{ConnectionState, OwnedResponse, Response, Status, Untagged};

/// One IMAP connection: the framed stream, the tag counter and the server
/// state as reported by the responses seen so far.
pub(crate) struct Transport<S> {
    framed: FramedRead<S, ImapCodec>,
    state: ConnectionState,
    tag_counter: u32,
}

/// A command that has been written and whose tagged completion may still be
/// outstanding.
#[derive(Debug)]
pub(crate) struct PendingCommand {
    tag: String,
    name: &'static str,
    data: Vec<Untagged>,
    completion: Option<Completion>,
}

#[derive(Debug, Clone)]
pub(crate) struct Completion {
    status: Status,
    text: Bytes,
}

impl Completion {
    pub(crate) fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub(crate) fn reason(&self) -> String {
        format!("{} {}", self.status, String::from_utf8_lossy(&self.text))
    }
}

impl PendingCommand {
    fn new(tag: String, name: &'static str) -> Self {
        Self {
            tag,
            name,
            data: Vec::new(),
            completion: None,
        }
    }

    pub(crate) fn in_progress(&self) -> bool {
        self.completion.is_none()
    }

    pub(crate) fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    /// Hands over the untagged data received so far; it will not be seen again.
    pub(crate) fn take_data(&mut self) -> Vec<Untagged> {
        std::mem::take(&mut self.data)
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S) -> Self {
        Self {
            framed: FramedRead::new(stream, ImapCodec),
            state: ConnectionState::Disconnected,
            tag_counter: 0,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    pub(crate) async fn read_greeting(&mut self, wait: Duration) -> Result<(), ImapError> {
        let resp = timeout(wait, self.framed.next())
            .await
            .map_err(|_| ImapError::Connection(format!("no greeting within {wait:?}")))?
            .ok_or_else(|| ImapError::Connection("EOF while reading greeting".to_string()))?
            .map_err(|e| ImapError::Connection(e.to_string()))?;

        match resp {
            Response::Untagged(Untagged::Status { status, text }) => {
                let banner = String::from_utf8_lossy(&text);
                match status {
                    Status::Ok => {
                        tracing::info!(%banner, "Received OK greeting from server");
                        self.state = ConnectionState::TransportEstablished;
                        Ok(())
                    }
                    Status::PreAuth => {
                        tracing::info!(%banner, "Server greeted with PREAUTH");
                        self.state = ConnectionState::Authenticated;
                        Ok(())
                    }
                    _ => Err(ImapError::Connection(format!(
                        "server refused connection: {status} {banner}"
                    ))),
                }
            }
            _ => Err(ImapError::Connection(
                "Invalid greeting from server".to_string(),
            )),
        }
    }

    fn next_tag(&mut self) -> String {
        self.tag_counter += 1;
        format!("a{:03}", self.tag_counter)
    }

    /// Writes a single command. Only one command is ever outstanding; the
    /// caller must drive it to completion before sending the next.
    pub(crate) async fn send<C, F>(&mut self, build: F) -> Result<PendingCommand, ImapError>
    where
        C: Command,
        F: FnOnce(&str) -> C,
    {
        if self.state == ConnectionState::Disconnected {
            return Err(ImapError::State(format!("connection is {}", self.state)));
        }

        let tag = self.next_tag();
        let (name, mut line) = {
            let command = build(&tag);
            (command.name(), command.as_string().into_bytes())
        };
        line.extend_from_slice(b"\r\n");

        tracing::debug!(%tag, command = name, "Sending command");

        let stream = self.framed.get_mut();
        let written = match stream.write_all(&line).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.state = ConnectionState::Disconnected;
            return Err(e.into());
        }

        Ok(PendingCommand::new(tag, name))
    }

    /// Waits at most `wait` for the next response, then takes every further
    /// response that is already buffered without waiting again.
    ///
    /// A timeout or a broken stream leaves the command outstanding on the wire,
    /// so both mark the connection as disconnected.
    pub(crate) async fn receive(
        &mut self,
        command: &mut PendingCommand,
        wait: Duration,
    ) -> Result<(), ImapError> {
        let first = match timeout(wait, self.framed.next()).await {
            Ok(frame) => frame,
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                return Err(ImapError::Timeout(wait));
            }
        };
        self.dispatch(command, first)?;

        while command.in_progress() {
            match timeout(Duration::ZERO, self.framed.next()).await {
                Ok(frame) => self.dispatch(command, frame)?,
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Receives until the command's tagged completion arrives.
    pub(crate) async fn complete(
        &mut self,
        command: &mut PendingCommand,
        wait: Duration,
    ) -> Result<Completion, ImapError> {
        loop {
            if let Some(completion) = command.completion() {
                return Ok(completion.clone());
            }
            self.receive(command, wait).await?;
        }
    }

    fn dispatch(
        &mut self,
        command: &mut PendingCommand,
        frame: Option<Result<OwnedResponse, ImapError>>,
    ) -> Result<(), ImapError> {
        let resp = match frame {
            Some(Ok(resp)) => resp,
            Some(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                return Err(e);
            }
            None => {
                self.state = ConnectionState::Disconnected;
                return Err(ImapError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }
        };

        match resp {
            Response::Tagged { tag, status, text } if tag.as_ref() == command.tag.as_bytes() => {
                tracing::debug!(tag = %command.tag, command = command.name, %status, "Command completed");
                command.completion = Some(Completion { status, text });
            }
            Response::Tagged { tag, .. } => {
                tracing::warn!(tag = %String::from_utf8_lossy(&tag), "Ignoring completion for a tag that is not outstanding");
            }
            Response::Untagged(Untagged::Status {
                status: Status::Bye,
                text,
            }) => {
                tracing::info!(reason = %String::from_utf8_lossy(&text), "Server is closing the connection");
                self.state = ConnectionState::Disconnected;
            }
            Response::Untagged(data) => command.data.push(data),
            Response::Continuation { .. } => {
                tracing::warn!(command = command.name, "Ignoring unexpected continuation request");
            }
        }
        Ok(())
    }

    /// Closes the write side; errors are irrelevant at this point.
    pub(crate) async fn shutdown(&mut self) {
        if let Err(e) = self.framed.get_mut().shutdown().await {
            tracing::debug!(error = %e, "Error while shutting down the stream");
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandBuilder;
    use tokio_test::io::Builder;

    const WAIT: Duration = Duration::from_secs(5);

    async fn established<S: AsyncRead + AsyncWrite + Unpin>(stream: S) -> Transport<S> {
        let mut transport = Transport::new(stream);
        transport.read_greeting(WAIT).await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_greeting_states() {
        let transport = established(Builder::new().read(b"* OK ready\r\n").build()).await;
        assert_eq!(transport.state(), ConnectionState::TransportEstablished);

        let transport = established(Builder::new().read(b"* PREAUTH welcome back\r\n").build()).await;
        assert_eq!(transport.state(), ConnectionState::Authenticated);

        let mut transport = Transport::new(Builder::new().read(b"* BYE too busy\r\n").build());
        let err = transport.read_greeting(WAIT).await.unwrap_err();
        assert!(matches!(err, ImapError::Connection(msg) if msg.contains("too busy")));
    }

    #[tokio::test]
    async fn test_tags_increase() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"a001 EXAMINE \"INBOX\"\r\n")
            .write(b"a002 LOGOUT\r\n")
            .build();
        let mut transport = established(mock).await;

        let first = transport
            .send(|tag| CommandBuilder::new(tag).examine("INBOX"))
            .await
            .unwrap();
        let second = transport
            .send(|tag| CommandBuilder::new(tag).logout())
            .await
            .unwrap();

        assert_eq!(first.tag, "a001");
        assert_eq!(second.tag, "a002");
    }

    #[tokio::test]
    async fn test_receive_drains_buffered_responses() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"a001 EXAMINE \"INBOX\"\r\n")
            .read(b"* 3 EXISTS\r\n* 0 RECENT\r\na001 OK [READ-ONLY] done\r\n")
            .build();
        let mut transport = established(mock).await;

        let mut command = transport
            .send(|tag| CommandBuilder::new(tag).examine("INBOX"))
            .await
            .unwrap();
        transport.receive(&mut command, WAIT).await.unwrap();

        assert!(!command.in_progress());
        assert!(command.completion().unwrap().is_ok());
        assert_eq!(
            command.take_data(),
            vec![Untagged::Exists(3), Untagged::Recent(0)]
        );
        assert!(command.take_data().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_tags_are_ignored() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"a001 LOGOUT\r\n")
            .read(b"z999 OK stale\r\n* BYE bye\r\na001 OK logged out\r\n")
            .build();
        let mut transport = established(mock).await;

        let mut command = transport
            .send(|tag| CommandBuilder::new(tag).logout())
            .await
            .unwrap();
        let completion = transport.complete(&mut command, WAIT).await.unwrap();

        assert!(completion.is_ok());
        assert_eq!(completion.reason(), "OK logged out");
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_eof_disconnects() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"a001 LOGOUT\r\n")
            .build();
        let mut transport = established(mock).await;

        let mut command = transport
            .send(|tag| CommandBuilder::new(tag).logout())
            .await
            .unwrap();
        let err = transport.receive(&mut command, WAIT).await.unwrap_err();

        assert!(matches!(err, ImapError::Io(_)));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(matches!(
            transport.send(|tag| CommandBuilder::new(tag).logout()).await,
            Err(ImapError::State(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out() {
        let (client, mut server) = tokio::io::duplex(1024);
        tokio::io::AsyncWriteExt::write_all(&mut server, b"* OK ready\r\n")
            .await
            .unwrap();
        let mut transport = established(client).await;

        let mut command = transport
            .send(|tag| CommandBuilder::new(tag).logout())
            .await
            .unwrap();
        let err = transport.receive(&mut command, WAIT).await.unwrap_err();

        assert!(matches!(err, ImapError::Timeout(d) if d == WAIT));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        drop(server);
    }
}
