use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_stream::Stream;

use crate::ImapError;
use crate::async_impl::Session;

/// Envelope data of one message: what a listing needs, nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    uid: u32,
    subject: String,
    size: u32,
}

impl MessageMeta {
    pub(crate) fn new(uid: u32, subject: String, size: u32) -> Self {
        Self { uid, subject, size }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// RFC822.SIZE in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Messages of a fetch that runs in the background.
///
/// Yields every message in delivery order, then `None`. A failure is
/// reported once and ends the sequence.
pub struct Messages<S = TlsStream<TcpStream>> {
    receiver: mpsc::Receiver<Result<MessageMeta, ImapError>>,
    task: JoinHandle<Session<S>>,
}

impl<S> Messages<S> {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Result<MessageMeta, ImapError>>,
        task: JoinHandle<Session<S>>,
    ) -> Self {
        Self { receiver, task }
    }

    pub async fn try_next(&mut self) -> Result<Option<MessageMeta>, ImapError> {
        match self.receiver.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Stops consuming and returns the session once the outstanding FETCH
    /// has been read to its end.
    pub async fn into_session(self) -> Result<Session<S>, ImapError> {
        drop(self.receiver);
        self.task
            .await
            .map_err(|e| ImapError::State(format!("fetch task did not finish: {e}")))
    }
}

impl<S> Stream for Messages<S> {
    type Item = Result<MessageMeta, ImapError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
