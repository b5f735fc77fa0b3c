//! Console stand-in for the host editor's listener registry.

use linkpeek_core::{Host, ListenerId};
use linkpeek_types::input::EventKind;

/// Keeps track of registered listeners and logs changes.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    next_id: u64,
    active: Vec<(ListenerId, EventKind)>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &[(ListenerId, EventKind)] {
        &self.active
    }
}

impl Host for ConsoleHost {
    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.active.push((id, kind));
        log::debug!("Listener {} registered for {kind}", id.0);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        let before = self.active.len();
        self.active.retain(|(l, _)| *l != id);
        if self.active.len() == before {
            log::warn!("Listener {} was not registered", id.0);
        } else {
            log::debug!("Listener {} removed", id.0);
        }
    }
}
