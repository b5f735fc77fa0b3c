//! TLS provider abstraction.
//!
//! The HTTP client only knows this trait, so it never depends on a concrete
//! TLS library. The `tls-rustls` feature supplies
//! [`RustlsTlsProvider`](crate::tls_rustls::RustlsTlsProvider).

use std::io::{Read, Write};
use std::net::TcpStream;

use linkpeek_types::error::Result;

/// A bidirectional byte stream (plain TCP or TLS-wrapped).
pub trait TlsStream: Read + Write + Send {}

impl<T: Read + Write + Send> TlsStream for T {}

/// Provides TLS client connections.
pub trait TlsProvider: Send + Sync {
    /// Wrap `stream` in a TLS client session.
    ///
    /// `server_name` is used for SNI and certificate verification.
    fn connect_tls(&self, stream: TcpStream, server_name: &str) -> Result<Box<dyn TlsStream>>;
}
