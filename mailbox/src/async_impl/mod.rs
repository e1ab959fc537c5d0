mod builder;
mod codec;
mod fetch;
mod transport;

pub use builder::{Builder, Client, Connector, DEFAULT_LOGOUT_GRACE, DEFAULT_TIMEOUT, Session};
pub use codec::ImapCodec;
pub use fetch::MESSAGE_CHANNEL_CAPACITY;
