use bytes::Bytes;

use super::common::Status;

// Generic over any byte container: the parser borrows from the read buffer,
// the codec hands out `Bytes`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<B = Bytes> {
    Tagged { tag: B, status: Status, text: B },
    Untagged(Untagged<B>),
    Continuation { text: B },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Untagged<B = Bytes> {
    Status { status: Status, text: B },
    Exists(u32),
    Recent(u32),
    Expunge(u32),
    Fetch {
        seq: u32,
        attributes: Vec<FetchAttribute<B>>,
    },
    // CAPABILITY, FLAGS, LIST and anything else this client never asks for
    Other { name: B, text: B },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchAttribute<B = Bytes> {
    Uid(u32),
    Rfc822Size(u32),
    // RFC822.HEADER or BODY[HEADER]; NIL when the server has no header
    Header(Option<B>),
    Other(B),
}

// Type alias for owned responses
pub type OwnedResponse = Response<Bytes>;

pub trait ToBytes {
    fn to_bytes(self) -> Bytes;
}

impl ToBytes for Bytes {
    fn to_bytes(self) -> Bytes {
        self // No copy needed - already Bytes
    }
}

impl ToBytes for &[u8] {
    fn to_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

fn to_bytes<B: ToBytes>(b: B) -> Bytes {
    b.to_bytes()
}

impl<B: ToBytes> Response<B> {
    pub fn into_owned(self) -> Response<Bytes> {
        match self {
            Response::Tagged { tag, status, text } => Response::Tagged {
                tag: to_bytes(tag),
                status,
                text: to_bytes(text),
            },
            Response::Untagged(untagged) => Response::Untagged(untagged.into_owned()),
            Response::Continuation { text } => Response::Continuation {
                text: to_bytes(text),
            },
        }
    }
}

impl<B: ToBytes> Untagged<B> {
    pub fn into_owned(self) -> Untagged<Bytes> {
        match self {
            Untagged::Status { status, text } => Untagged::Status {
                status,
                text: to_bytes(text),
            },
            Untagged::Exists(n) => Untagged::Exists(n),
            Untagged::Recent(n) => Untagged::Recent(n),
            Untagged::Expunge(n) => Untagged::Expunge(n),
            Untagged::Fetch { seq, attributes } => Untagged::Fetch {
                seq,
                attributes: attributes
                    .into_iter()
                    .map(FetchAttribute::into_owned)
                    .collect(),
            },
            Untagged::Other { name, text } => Untagged::Other {
                name: to_bytes(name),
                text: to_bytes(text),
            },
        }
    }
}

impl<B: ToBytes> FetchAttribute<B> {
    pub fn into_owned(self) -> FetchAttribute<Bytes> {
        match self {
            FetchAttribute::Uid(uid) => FetchAttribute::Uid(uid),
            FetchAttribute::Rfc822Size(size) => FetchAttribute::Rfc822Size(size),
            FetchAttribute::Header(header) => FetchAttribute::Header(header.map(to_bytes)),
            FetchAttribute::Other(name) => FetchAttribute::Other(to_bytes(name)),
        }
    }
}
