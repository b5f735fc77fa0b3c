//! Hover-triggered link previews.
//!
//! A pointer entering a link that matches the configured URL prefix starts
//! a summary fetch; when the result arrives a card is mounted under the
//! link. Leaving both the link and the card unmounts it after a short grace
//! window. Pieces, leaves first:
//!
//! - [`matcher`]: classifies pointer targets.
//! - [`fetcher`]: link URL to [`PreviewPayload`], never failing.
//! - [`renderer`]: mounts and unmounts the single card.
//! - [`machine`]: the pure hover-intent state machine.
//! - [`controller`]: runs the machine's effects against a document.
//! - [`plugin`]: host lifecycle hooks.

pub mod clock;
pub mod controller;
pub mod dispatch;
pub mod fetcher;
pub mod machine;
pub mod matcher;
pub mod payload;
pub mod plugin;
pub mod renderer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{DismissTimer, HoverController};
pub use dispatch::{FetchDispatcher, FetchOutcome, ThreadDispatcher};
pub use fetcher::{FetchFailure, PreviewFetcher, SummaryFetcher};
pub use machine::{Effect, HoverEvent, HoverMachine, HoverState, PreviewRequest, RequestId, TimerId};
pub use matcher::{Classification, LinkMatcher, LinkTarget};
pub use payload::{PreviewPayload, PreviewStatus};
pub use plugin::{Host, LinkPreviewPlugin, ListenerId};
pub use renderer::{PreviewCardState, PreviewRenderer};
