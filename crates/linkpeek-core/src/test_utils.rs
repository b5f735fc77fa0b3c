//! Test doubles for the preview pipeline.

use std::collections::HashMap;
use std::sync::Mutex;

use linkpeek_types::input::EventKind;

use crate::dispatch::{FetchDispatcher, FetchOutcome};
use crate::fetcher::PreviewFetcher;
use crate::machine::RequestId;
use crate::payload::{PreviewPayload, PreviewStatus};
use crate::plugin::{Host, ListenerId};

/// Fetcher answering from a table; unknown URLs echo the URL as the title.
pub struct StubFetcher {
    responses: HashMap<String, PreviewPayload>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, url: &str, payload: PreviewPayload) -> Self {
        self.responses.insert(url.to_string(), payload);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PreviewFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> PreviewPayload {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| payload(url, url))
    }
}

/// Dispatcher whose fetches finish only when the test says so.
#[derive(Default)]
pub struct ManualDispatcher {
    pub dispatched: Vec<(RequestId, String)>,
    ready: Vec<FetchOutcome>,
    in_flight: usize,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `request`'s result available to the next poll.
    pub fn complete(&mut self, request: RequestId, payload: PreviewPayload) {
        self.ready.push(FetchOutcome { request, payload });
    }

    /// Id of the most recently dispatched request.
    pub fn last_request(&self) -> Option<RequestId> {
        self.dispatched.last().map(|(id, _)| *id)
    }
}

impl FetchDispatcher for ManualDispatcher {
    fn dispatch(&mut self, request: RequestId, url: String) {
        self.dispatched.push((request, url));
        self.in_flight += 1;
    }

    fn poll(&mut self) -> Vec<FetchOutcome> {
        let ready = std::mem::take(&mut self.ready);
        self.in_flight = self.in_flight.saturating_sub(ready.len());
        ready
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Host that records listener registrations.
#[derive(Default)]
pub struct RecordingHost {
    pub listeners: Vec<(ListenerId, EventKind)>,
    pub added: usize,
    pub removed: usize,
    next: u64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|(_, k)| *k == kind).count()
    }
}

impl Host for RecordingHost {
    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.listeners.push((id, kind));
        self.added += 1;
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(l, _)| *l != id);
        self.removed += 1;
    }
}

/// A successful payload with no image or deep link.
pub fn payload(title: &str, extract: &str) -> PreviewPayload {
    PreviewPayload {
        title: title.to_string(),
        extract: extract.to_string(),
        image_url: None,
        canonical_url: None,
        status: PreviewStatus::Ok,
    }
}
