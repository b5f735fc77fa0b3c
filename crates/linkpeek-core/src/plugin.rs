//! Host lifecycle integration.
//!
//! The host editor loads the plugin once, forwards pointer events while it
//! is loaded, calls the per-fragment render hook for every rendered chunk of
//! the document, and unloads it on shutdown.

use linkpeek_dom::{Document, NodeId, PointerEvent, TagName};
use linkpeek_types::input::EventKind;

use crate::clock::Clock;
use crate::controller::HoverController;
use crate::dispatch::FetchDispatcher;
use crate::matcher::resolve_href;

/// Handle for a registered document-level listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// What the plugin needs from the host application.
pub trait Host {
    /// Register a document-level listener for `kind`.
    fn add_listener(&mut self, kind: EventKind) -> ListenerId;

    /// Remove a listener returned by [`Host::add_listener`].
    fn remove_listener(&mut self, id: ListenerId);
}

/// The link preview plugin: one controller plus its listener registrations.
pub struct LinkPreviewPlugin<D, C> {
    controller: HoverController<D, C>,
    listeners: Vec<ListenerId>,
}

impl<D: FetchDispatcher, C: Clock> LinkPreviewPlugin<D, C> {
    pub fn new(controller: HoverController<D, C>) -> Self {
        Self {
            controller,
            listeners: Vec::new(),
        }
    }

    pub fn controller(&self) -> &HoverController<D, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut HoverController<D, C> {
        &mut self.controller
    }

    pub fn is_loaded(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Attach one listener per pointer event kind. Loading twice is a no-op.
    pub fn on_load(&mut self, host: &mut dyn Host) {
        if self.is_loaded() {
            log::debug!("Link preview plugin already loaded");
            return;
        }
        self.listeners = EventKind::ALL
            .iter()
            .map(|&kind| host.add_listener(kind))
            .collect();
        log::info!("Link preview plugin loaded ({} listeners)", self.listeners.len());
    }

    /// Detach the listeners registered by [`Self::on_load`] and remove any
    /// card.
    pub fn on_unload(&mut self, host: &mut dyn Host, doc: &mut Document) {
        for id in self.listeners.drain(..) {
            host.remove_listener(id);
        }
        self.controller.reset(doc);
        log::info!("Link preview plugin unloaded");
    }

    /// Per-fragment render hook. Listeners are document-wide, so nothing is
    /// registered here; returns how many previewable links the fragment
    /// holds.
    pub fn post_process(&self, doc: &Document, fragment: NodeId) -> usize {
        if !doc.contains_id(fragment) {
            return 0;
        }
        let matcher = self.controller.matcher();
        let count = doc
            .descendants(fragment)
            .into_iter()
            .filter_map(|n| doc.element(n))
            .filter(|e| e.tag == TagName::A)
            .filter_map(|e| e.href())
            .filter(|href| matcher.matches(&resolve_href(doc, href)))
            .count();
        log::trace!("Fragment {fragment} has {count} previewable links");
        count
    }

    /// Forward a pointer event. Ignored while unloaded.
    pub fn handle_pointer(&mut self, doc: &mut Document, event: PointerEvent) {
        if !self.is_loaded() {
            return;
        }
        self.controller.handle_pointer(doc, event);
    }

    /// Drive timers and fetch completions. Ignored while unloaded.
    pub fn tick(&mut self, doc: &mut Document) {
        if self.is_loaded() {
            self.controller.tick(doc);
        }
    }
}
