pub mod async_impl;
pub mod commands;
pub mod error;
mod format;
pub mod messages;
pub mod parser;
pub mod tls;
pub mod types;

pub use async_impl::{Builder, Client, Connector, Session};
pub use error::ImapError;
pub use messages::{MessageMeta, Messages};
pub use types::{ConnectionState, SequenceRange};

/// Connects over TLS and logs in with default settings.
pub async fn connect(host: &str, user: &str, pass: &str) -> Result<Session, ImapError> {
    Builder::new(host).connect().await?.login(user, pass).await
}
