use std::fmt::{self, Display};

// RFC 3501 § 7.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Can be tagged or untagged
    Ok,
    No,
    Bad,
    // Always untagged
    PreAuth,
    Bye,
}

impl Status {
    pub fn from_atom(atom: &[u8]) -> Option<Self> {
        match atom.to_ascii_uppercase().as_slice() {
            b"OK" => Some(Status::Ok),
            b"NO" => Some(Status::No),
            b"BAD" => Some(Status::Bad),
            b"PREAUTH" => Some(Status::PreAuth),
            b"BYE" => Some(Status::Bye),
            _ => None,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::No => f.write_str("NO"),
            Status::Bad => f.write_str("BAD"),
            Status::PreAuth => f.write_str("PREAUTH"),
            Status::Bye => f.write_str("BYE"),
        }
    }
}

/// Where a connection stands in the IMAP session lifecycle.
///
/// `MailboxSelected` is transient: it is entered by a fetch and carries no
/// meaning for the caller beyond "authenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    TransportEstablished,
    Authenticated,
    MailboxSelected,
}

impl ConnectionState {
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticated | ConnectionState::MailboxSelected
        )
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::TransportEstablished => f.write_str("awaiting login"),
            ConnectionState::Authenticated => f.write_str("authenticated"),
            ConnectionState::MailboxSelected => f.write_str("mailbox selected"),
        }
    }
}
