//! Error types for linkpeek.

use std::io;

/// Errors produced by the linkpeek crates.
#[derive(Debug, thiserror::Error)]
pub enum PeekError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PeekError>;
