//! [`TlsProvider`] backed by rustls + ring.
//!
//! Enabled by the `tls-rustls` feature.

use std::net::TcpStream;
use std::sync::Arc;

use rustls::ClientConfig;
use rustls::pki_types::ServerName;

use linkpeek_types::error::{PeekError, Result};

use super::tls::{TlsProvider, TlsStream};

/// Reusable TLS client configuration trusting Mozilla's root CA bundle.
///
/// Only the immutable config is shared; every connection gets its own
/// session.
pub struct RustlsTlsProvider {
    config: Arc<ClientConfig>,
}

impl RustlsTlsProvider {
    pub fn new() -> Self {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for RustlsTlsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn connect_tls(&self, stream: TcpStream, server_name: &str) -> Result<Box<dyn TlsStream>> {
        let sni = ServerName::try_from(server_name.to_owned())
            .map_err(|e| PeekError::Network(format!("invalid server name: {e}")))?;

        let conn = rustls::ClientConnection::new(Arc::clone(&self.config), sni)
            .map_err(|e| PeekError::Network(format!("TLS init: {e}")))?;

        // The handshake runs lazily on the first write.
        Ok(Box::new(rustls::StreamOwned::new(conn, stream)))
    }
}
