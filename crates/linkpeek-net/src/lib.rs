//! Networking for linkpeek: URL handling, a one-shot HTTP/1.1 GET client,
//! and the TLS provider abstraction.
//!
//! Every request opens its own connection and closes it when done. Nothing
//! is pooled or cached, so concurrent callers never share state.

pub mod http;
pub mod tls;
#[cfg(feature = "tls-rustls")]
pub mod tls_rustls;
pub mod url;

pub use http::{HttpOptions, HttpResponse, http_get};
pub use tls::{TlsProvider, TlsStream};
#[cfg(feature = "tls-rustls")]
pub use tls_rustls::RustlsTlsProvider;
pub use url::Url;
