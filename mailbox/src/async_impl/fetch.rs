use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use super::transport::{PendingCommand, Transport};
use crate::ImapError;
use crate::commands::CommandBuilder;
use crate::format::is_quotable;
use crate::messages::MessageMeta;
use crate::parser::header::parse_subject;
use crate::types::{ConnectionState, FetchAttribute, SequenceRange, Untagged};

/// Capacity of the channel behind a streaming fetch.
pub const MESSAGE_CHANNEL_CAPACITY: usize = 10;

/// Metadata of the newest messages in a mailbox, pulled one at a time.
///
/// Selecting the mailbox and issuing the FETCH happen in [`start`]; every call
/// to [`next`] either hands out a message that already arrived or waits for
/// the next batch of responses.
///
/// [`start`]: RecentMessages::start
/// [`next`]: RecentMessages::next
pub(crate) struct RecentMessages<'a, S> {
    transport: &'a mut Transport<S>,
    command: Option<PendingCommand>,
    ready: VecDeque<MessageMeta>,
    expected: usize,
    accepted: usize,
    wait: Duration,
}

impl<'a, S> RecentMessages<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) async fn start(
        transport: &'a mut Transport<S>,
        mailbox: &str,
        count: u32,
        wait: Duration,
    ) -> Result<Self, ImapError> {
        let state = transport.state();
        if !state.is_authenticated() {
            return Err(ImapError::State(format!(
                "cannot fetch messages while connection is {state}"
            )));
        }
        if !is_quotable(mailbox) {
            return Err(ImapError::Fetch(format!(
                "mailbox name {mailbox:?} cannot be sent as a quoted string"
            )));
        }

        let total = examine(transport, mailbox, wait).await?;

        let Some(range) = SequenceRange::most_recent(total, count) else {
            tracing::debug!(total, count, "Nothing to fetch");
            return Ok(Self::with_command(transport, None, 0, wait));
        };

        tracing::debug!(total, count, %range, "Fetching message metadata");
        let command = transport
            .send(|tag| CommandBuilder::new(tag).fetch(range))
            .await
            .map_err(fetch_failure)?;

        Ok(Self::with_command(
            transport,
            Some(command),
            range.len() as usize,
            wait,
        ))
    }

    fn with_command(
        transport: &'a mut Transport<S>,
        command: Option<PendingCommand>,
        expected: usize,
        wait: Duration,
    ) -> Self {
        Self {
            transport,
            command,
            ready: VecDeque::with_capacity(expected),
            expected,
            accepted: 0,
            wait,
        }
    }

    /// Number of messages the FETCH asked for.
    pub(crate) fn expected(&self) -> usize {
        self.expected
    }

    pub(crate) async fn next(&mut self) -> Result<Option<MessageMeta>, ImapError> {
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Ok(Some(message));
            }

            let Some(command) = self.command.as_mut() else {
                return Ok(None);
            };

            if let Some(completion) = command.completion() {
                let completion = completion.clone();
                self.command = None;
                if completion.is_ok() {
                    return Ok(None);
                }
                return Err(ImapError::Fetch(format!(
                    "FETCH rejected: {}",
                    completion.reason()
                )));
            }

            if let Err(e) = self.transport.receive(command, self.wait).await {
                self.command = None;
                return Err(fetch_failure(e));
            }

            for data in command.take_data() {
                if let Err(e) = self.accept(data) {
                    self.abandon().await;
                    return Err(e);
                }
            }
        }
    }

    fn accept(&mut self, data: Untagged) -> Result<(), ImapError> {
        let Untagged::Fetch { seq, attributes } = data else {
            tracing::debug!(?data, "Ignoring untagged data during fetch");
            return Ok(());
        };

        let mut uid = None;
        let mut size = None;
        let mut header = None;
        for attribute in attributes {
            match attribute {
                FetchAttribute::Uid(n) => uid = Some(n),
                FetchAttribute::Rfc822Size(n) => size = Some(n),
                FetchAttribute::Header(h) => header = Some(h.unwrap_or_default()),
                FetchAttribute::Other(_) => {}
            }
        }

        // Flag updates and other unsolicited FETCH data carry no header.
        let Some(header) = header else {
            tracing::debug!(seq, "Ignoring FETCH response without a header");
            return Ok(());
        };
        if self.accepted == self.expected {
            tracing::warn!(seq, expected = self.expected, "Dropping FETCH response beyond the requested range");
            return Ok(());
        }

        let uid = uid.ok_or_else(|| {
            ImapError::Fetch(format!("FETCH response for message {seq} has no UID"))
        })?;
        let size = size.ok_or_else(|| {
            ImapError::Fetch(format!("FETCH response for message {seq} has no RFC822.SIZE"))
        })?;
        let subject = parse_subject(&header)?;

        self.accepted += 1;
        self.ready.push_back(MessageMeta::new(uid, subject, size));
        Ok(())
    }

    /// Reads the outstanding FETCH to its completion and throws the data away,
    /// so that the connection can carry the next command.
    pub(crate) async fn abandon(&mut self) {
        self.ready.clear();
        let Some(mut command) = self.command.take() else {
            return;
        };

        if let Err(e) = self.transport.complete(&mut command, self.wait).await {
            tracing::warn!(error = %e, "Failed to drain abandoned FETCH");
        }
    }
}

async fn examine<S>(
    transport: &mut Transport<S>,
    mailbox: &str,
    wait: Duration,
) -> Result<u32, ImapError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut command = transport
        .send(|tag| CommandBuilder::new(tag).examine(mailbox))
        .await
        .map_err(fetch_failure)?;

    let mut total = None;
    let completion = loop {
        if let Some(completion) = command.completion() {
            break completion.clone();
        }
        transport
            .receive(&mut command, wait)
            .await
            .map_err(fetch_failure)?;
        for data in command.take_data() {
            if let Untagged::Exists(n) = data {
                total = Some(n);
            }
        }
    };

    // A BYE seen while waiting has already closed the session.
    let closed = transport.state() == ConnectionState::Disconnected;

    if !completion.is_ok() {
        if !closed {
            transport.set_state(ConnectionState::Authenticated);
        }
        return Err(ImapError::Fetch(format!(
            "EXAMINE {mailbox:?} rejected: {}",
            completion.reason()
        )));
    }
    if closed {
        return Err(ImapError::Fetch(
            "server closed the connection during EXAMINE".to_string(),
        ));
    }

    transport.set_state(ConnectionState::MailboxSelected);
    Ok(total.unwrap_or_else(|| {
        tracing::warn!(mailbox, "EXAMINE reported no message count, assuming empty");
        0
    }))
}

/// Drives a fetch and forwards every message into `tx`.
///
/// The channel closes when this returns. When the receiving side goes away
/// the FETCH is drained before returning, leaving the connection usable.
pub(crate) async fn produce<S>(
    transport: &mut Transport<S>,
    mailbox: &str,
    count: u32,
    wait: Duration,
    tx: mpsc::Sender<Result<MessageMeta, ImapError>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut fetch = match RecentMessages::start(transport, mailbox, count, wait).await {
        Ok(fetch) => fetch,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    loop {
        match fetch.next().await {
            Ok(Some(message)) => {
                if tx.send(Ok(message)).await.is_err() {
                    tracing::debug!("Consumer went away, draining FETCH");
                    fetch.abandon().await;
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

// State errors keep their meaning; anything else that breaks a fetch is a
// fetch failure.
fn fetch_failure(e: ImapError) -> ImapError {
    match e {
        ImapError::State(_) | ImapError::Fetch(_) => e,
        other => ImapError::Fetch(other.to_string()),
    }
}
