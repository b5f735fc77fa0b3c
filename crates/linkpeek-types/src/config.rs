//! Preview configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the English Wikipedia setup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PeekError, Result};

/// Placeholder substituted with the resource identifier in
/// [`PreviewConfig::summary_endpoint_template`].
pub const TITLE_PLACEHOLDER: &str = "{title}";

/// Upper bound accepted for `dismiss_delay_ms`.
const MAX_DISMISS_DELAY_MS: u64 = 10_000;

/// How the card position is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    /// Document-relative: the page scroll offset is added to the anchor's
    /// viewport coordinates.
    #[default]
    Absolute,
    /// Viewport-relative: anchor coordinates are used as-is.
    Fixed,
}

impl Positioning {
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Fixed => "fixed",
        }
    }
}

/// Recognised preview options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Links whose resolved href starts with this prefix trigger previews.
    #[serde(default = "default_url_prefix")]
    pub url_prefix_pattern: String,
    /// Grace window between leaving the link/card and unmounting.
    #[serde(default = "default_dismiss_delay")]
    pub dismiss_delay_ms: u64,
    /// Summary endpoint; `{title}` is replaced by the resource identifier.
    #[serde(default = "default_endpoint")]
    pub summary_endpoint_template: String,
    /// Class attached to the card root, used to find it again.
    #[serde(default = "default_card_class")]
    pub card_class: String,
    #[serde(default)]
    pub positioning: Positioning,
    /// Connect and read timeout for a single summary request.
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_url_prefix() -> String {
    "https://en.wikipedia.org/wiki/".to_string()
}
fn default_dismiss_delay() -> u64 {
    300
}
fn default_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary/{title}".to_string()
}
fn default_card_class() -> String {
    "wikipedia-preview".to_string()
}
fn default_timeout() -> u64 {
    10_000
}
fn default_user_agent() -> String {
    concat!("linkpeek/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            url_prefix_pattern: default_url_prefix(),
            dismiss_delay_ms: default_dismiss_delay(),
            summary_endpoint_template: default_endpoint(),
            card_class: default_card_class(),
            positioning: Positioning::default(),
            request_timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl PreviewConfig {
    /// Parse and validate a config from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| PeekError::Config(format!("linkpeek.toml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("Loaded preview config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the rest of the system cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.url_prefix_pattern.trim().is_empty() {
            return Err(PeekError::Config(
                "url_prefix_pattern must not be empty".to_string(),
            ));
        }
        if !self.summary_endpoint_template.contains(TITLE_PLACEHOLDER) {
            return Err(PeekError::Config(format!(
                "summary_endpoint_template must contain {TITLE_PLACEHOLDER}",
            )));
        }
        if self.dismiss_delay_ms > MAX_DISMISS_DELAY_MS {
            return Err(PeekError::Config(format!(
                "dismiss_delay_ms {} exceeds {MAX_DISMISS_DELAY_MS}",
                self.dismiss_delay_ms,
            )));
        }
        if self.card_class.is_empty() || self.card_class.contains(char::is_whitespace) {
            return Err(PeekError::Config(format!(
                "card_class must be a single class name, got {:?}",
                self.card_class,
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(PeekError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the summary endpoint URL for a resource identifier.
    pub fn summary_url(&self, resource_id: &str) -> String {
        self.summary_endpoint_template
            .replace(TITLE_PLACEHOLDER, resource_id)
    }
}
