use std::time::Duration;

use thiserror::Error;

use crate::parser::ParserError;
use crate::parser::header::HeaderError;

#[derive(Error, Debug)]
pub enum ImapError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),
    #[error("DNS name error: {0}")]
    DnsName(#[from] rustls::pki_types::InvalidDnsNameError),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out after {0:?} waiting for the server")]
    Timeout(Duration),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid connection state: {0}")]
    State(String),
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Malformed message header: {0}")]
    Parse(#[from] HeaderError),
    #[error("Malformed server response: {0}")]
    Protocol(#[from] ParserError),
}
