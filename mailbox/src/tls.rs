use crate::ImapError;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

pub const DEFAULT_PORT: u16 = 993;

pub fn create_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.into(),
    };

    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    // Honors SSLKEYLOGFILE when set.
    if cfg!(debug_assertions) {
        config.key_log = Arc::new(rustls::KeyLogFile::new());
    }

    Arc::new(config)
}

/// Appends the implicit-TLS IMAP port when `addr` names only a host.
///
/// IPv6 addresses must be bracketed when a port is given (`[::1]:993`); a
/// bare IPv6 address is bracketed here.
pub fn with_default_port(addr: &str) -> String {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, "")) => format!("{addr}:{DEFAULT_PORT}"),
            _ => addr.to_string(),
        };
    }
    if addr.matches(':').count() > 1 {
        return format!("[{addr}]:{DEFAULT_PORT}");
    }

    let has_port = addr
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());

    if has_port {
        addr.to_string()
    } else {
        format!("{addr}:{DEFAULT_PORT}")
    }
}

pub fn parse_server_name(addr: &str) -> Result<ServerName<'static>, ImapError> {
    let (host, _) = addr
        .rsplit_once(':')
        .ok_or_else(|| ImapError::InvalidAddressFormat(addr.into()))?;

    let host = match host.strip_prefix('[') {
        Some(bracketed) => bracketed
            .strip_suffix(']')
            .ok_or_else(|| ImapError::InvalidAddressFormat(addr.into()))?,
        None => host,
    };

    if host.is_empty() {
        return Err(ImapError::InvalidAddressFormat(addr.into()));
    }

    let server_name = ServerName::try_from(host.to_string())?;

    Ok(server_name)
}
