//! Summary fetching.
//!
//! [`PreviewFetcher::fetch`] never fails: whatever goes wrong is logged and
//! turned into [`PreviewPayload::failed`], so the card always has something
//! to show.

use std::sync::Arc;
use std::time::Duration;

use linkpeek_net::{HttpOptions, TlsProvider, Url, http_get};
use linkpeek_types::config::PreviewConfig;
use linkpeek_types::error::PeekError;

use crate::matcher::LinkMatcher;
use crate::payload::{PreviewPayload, SummaryDocument};

/// Turns a link URL into preview content.
///
/// Implementations are called from worker threads, possibly several at
/// once, and must not share mutable state between calls.
pub trait PreviewFetcher: Send + Sync {
    /// Blocking fetch. Always yields a payload.
    fn fetch(&self, url: &str) -> PreviewPayload;
}

/// Why a summary could not be turned into a payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("no resource identifier in {0}")]
    InvalidUrl(String),

    #[error("summary request failed: {0}")]
    Network(#[from] PeekError),

    #[error("summary endpoint returned HTTP {0}")]
    Status(u16),

    #[error("malformed summary: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Fetches page summaries from a REST endpoint over HTTP(S).
pub struct SummaryFetcher {
    matcher: LinkMatcher,
    config: PreviewConfig,
    tls: Option<Arc<dyn TlsProvider>>,
}

impl SummaryFetcher {
    /// A fetcher for plain HTTP endpoints. HTTPS needs [`Self::with_tls`].
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            matcher: LinkMatcher::from_config(config),
            config: config.clone(),
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: Arc<dyn TlsProvider>) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Use rustls with the bundled Mozilla roots.
    #[cfg(feature = "tls-rustls")]
    pub fn with_rustls(self) -> Self {
        self.with_tls(Arc::new(linkpeek_net::RustlsTlsProvider::new()))
    }

    /// Summary endpoint URL for a link.
    pub fn endpoint_for(&self, url: &str) -> Result<Url, FetchFailure> {
        let id = self
            .matcher
            .resource_id(url)
            .ok_or_else(|| FetchFailure::InvalidUrl(url.to_string()))?;
        let endpoint = self.config.summary_url(id);
        Url::parse(&endpoint).ok_or(FetchFailure::InvalidUrl(endpoint))
    }

    /// Fetch and map, surfacing the failure reason.
    pub fn try_fetch(&self, url: &str) -> Result<PreviewPayload, FetchFailure> {
        let endpoint = self.endpoint_for(url)?;
        log::debug!("Fetching summary {endpoint}");

        let options = HttpOptions {
            timeout: Duration::from_millis(self.config.request_timeout_ms),
            user_agent: self.config.user_agent.clone(),
            accept: "application/json".to_string(),
        };
        let response = http_get(&endpoint, self.tls.as_deref(), &options)?;
        if !response.is_success() {
            return Err(FetchFailure::Status(response.status_code));
        }

        let summary: SummaryDocument = serde_json::from_slice(&response.body)?;
        Ok(summary.into())
    }
}

impl PreviewFetcher for SummaryFetcher {
    fn fetch(&self, url: &str) -> PreviewPayload {
        match self.try_fetch(url) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Error fetching preview for {url}: {e}");
                PreviewPayload::failed()
            },
        }
    }
}
