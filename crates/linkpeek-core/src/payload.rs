//! Normalised preview content and the summary document it is built from.

use serde::Deserialize;

/// Title shown when the summary has no `description`.
pub const NO_DESCRIPTION: &str = "No description available";
/// Body shown when the summary has no `extract`.
pub const NO_EXTRACT: &str = "No extract available";
/// Title of a card whose fetch failed.
pub const FAILED_TITLE: &str = "Preview unavailable";
/// Body of a card whose fetch failed.
pub const FAILED_EXTRACT: &str = "Error fetching preview";

/// Whether the payload came from a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    Ok,
    Failed,
}

/// Everything the renderer needs to build a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPayload {
    pub title: String,
    pub extract: String,
    /// Thumbnail source; no image element is rendered without one.
    pub image_url: Option<String>,
    /// Deep link to the full resource.
    pub canonical_url: Option<String>,
    pub status: PreviewStatus,
}

impl PreviewPayload {
    /// The placeholder payload for a fetch that went wrong.
    pub fn failed() -> Self {
        Self {
            title: FAILED_TITLE.to_string(),
            extract: FAILED_EXTRACT.to_string(),
            image_url: None,
            canonical_url: None,
            status: PreviewStatus::Failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == PreviewStatus::Failed
    }
}

impl From<SummaryDocument> for PreviewPayload {
    fn from(doc: SummaryDocument) -> Self {
        Self {
            title: doc
                .description
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            extract: doc
                .extract
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| NO_EXTRACT.to_string()),
            image_url: doc.thumbnail.and_then(|t| t.source),
            canonical_url: doc
                .content_urls
                .and_then(|c| c.desktop)
                .and_then(|d| d.page),
            status: PreviewStatus::Ok,
        }
    }
}

/// Page summary JSON. Every field is optional; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryDocument {
    /// Accepted but not displayed; the card title is the description.
    pub title: Option<String>,
    pub description: Option<String>,
    pub extract: Option<String>,
    pub thumbnail: Option<Thumbnail>,
    pub content_urls: Option<ContentUrls>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnail {
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentUrls {
    pub desktop: Option<PageUrls>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageUrls {
    pub page: Option<String>,
}
