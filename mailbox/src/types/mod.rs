pub mod command;
pub mod common;
pub mod response;

pub use command::SequenceRange;
pub use common::{ConnectionState, Status};
pub use response::{FetchAttribute, OwnedResponse, Response, Untagged};
