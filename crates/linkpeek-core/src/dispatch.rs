//! Running fetches off the event thread.
//!
//! The controller hands each fetch to a [`FetchDispatcher`] and collects
//! finished results on its next tick. There is no cancellation: a result
//! for a superseded request still arrives and is dropped by the machine.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::fetcher::PreviewFetcher;
use crate::machine::RequestId;
use crate::payload::PreviewPayload;

/// A finished fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub request: RequestId,
    pub payload: PreviewPayload,
}

/// Executes fetches asynchronously with respect to the caller.
pub trait FetchDispatcher {
    /// Start fetching `url` for `request`. Must not block on the network.
    fn dispatch(&mut self, request: RequestId, url: String);

    /// Results that finished since the last poll, in completion order.
    fn poll(&mut self) -> Vec<FetchOutcome>;

    /// Fetches dispatched but not yet returned by [`Self::poll`].
    fn in_flight(&self) -> usize;
}

/// One worker thread per fetch, results over a channel.
pub struct ThreadDispatcher {
    fetcher: Arc<dyn PreviewFetcher>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
    in_flight: usize,
}

impl ThreadDispatcher {
    pub fn new(fetcher: Arc<dyn PreviewFetcher>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            fetcher,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Block up to `timeout` for the next result.
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.in_flight -= 1;
                Some(outcome)
            },
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl FetchDispatcher for ThreadDispatcher {
    fn dispatch(&mut self, request: RequestId, url: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        self.in_flight += 1;

        let spawned = std::thread::Builder::new()
            .name(format!("linkpeek-fetch-{}", request.0))
            .spawn(move || {
                let payload = fetcher.fetch(&url);
                // The receiver is gone only when the controller was dropped.
                let _ = tx.send(FetchOutcome { request, payload });
            });

        if let Err(e) = spawned {
            log::warn!("Could not spawn fetch worker for {request}: {e}");
            let _ = self.tx.send(FetchOutcome {
                request,
                payload: PreviewPayload::failed(),
            });
        }
    }

    fn poll(&mut self) -> Vec<FetchOutcome> {
        let outcomes: Vec<FetchOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}
