//! Effect interpreter around [`HoverMachine`].
//!
//! The controller is the only owner of mutable preview state: the machine
//! (with its request and timer counters), the renderer (with the card) and
//! the single dismiss deadline. The host calls [`HoverController::handle_pointer`]
//! for pointer events and [`HoverController::tick`] from its event loop.

use linkpeek_dom::{Document, NodeId, PointerEvent};
use linkpeek_types::config::PreviewConfig;
use linkpeek_types::input::EventKind;

use crate::clock::Clock;
use crate::dispatch::FetchDispatcher;
use crate::machine::{Effect, HoverEvent, HoverMachine, TimerId};
use crate::matcher::{Classification, LinkMatcher};
use crate::renderer::PreviewRenderer;

/// The armed dismiss timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissTimer {
    pub id: TimerId,
    pub deadline_ms: u64,
}

pub struct HoverController<D, C> {
    machine: HoverMachine,
    matcher: LinkMatcher,
    renderer: PreviewRenderer,
    dispatcher: D,
    clock: C,
    dismiss: Option<DismissTimer>,
}

impl<D: FetchDispatcher, C: Clock> HoverController<D, C> {
    pub fn new(config: &PreviewConfig, dispatcher: D, clock: C) -> Self {
        Self {
            machine: HoverMachine::new(config.dismiss_delay_ms),
            matcher: LinkMatcher::from_config(config),
            renderer: PreviewRenderer::from_config(config),
            dispatcher,
            clock,
            dismiss: None,
        }
    }

    pub fn machine(&self) -> &HoverMachine {
        &self.machine
    }

    pub fn matcher(&self) -> &LinkMatcher {
        &self.matcher
    }

    pub fn renderer(&self) -> &PreviewRenderer {
        &self.renderer
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Root node of the mounted card.
    pub fn card_node(&self) -> Option<NodeId> {
        self.renderer.card_node()
    }

    pub fn dismiss_timer(&self) -> Option<DismissTimer> {
        self.dismiss
    }

    /// Whether [`Self::tick`] still has anything to wait for.
    pub fn is_busy(&self) -> bool {
        self.dismiss.is_some() || self.dispatcher.in_flight() > 0
    }

    /// Classify the pointer target and feed the machine.
    pub fn handle_pointer(&mut self, doc: &mut Document, event: PointerEvent) {
        let target = self
            .matcher
            .classify(doc, event.target, self.renderer.card_node());
        log::trace!("{} on {} -> {target:?}", event.kind, event.target);
        if target == Classification::Other {
            return;
        }
        let event = match event.kind {
            EventKind::PointerOver => HoverEvent::Enter(target),
            EventKind::PointerOut => HoverEvent::Leave(target),
        };
        self.handle_event(doc, event);
    }

    /// Deliver finished fetches, then fire the dismiss timer if it is due.
    pub fn tick(&mut self, doc: &mut Document) {
        for outcome in self.dispatcher.poll() {
            self.handle_event(
                doc,
                HoverEvent::FetchResolved {
                    request: outcome.request,
                    payload: outcome.payload,
                },
            );
        }

        if let Some(timer) = self.dismiss
            && self.clock.now_ms() >= timer.deadline_ms
        {
            self.dismiss = None;
            self.handle_event(doc, HoverEvent::DismissElapsed(timer.id));
        }
    }

    /// Tear everything down and return to idle.
    pub fn reset(&mut self, doc: &mut Document) {
        self.handle_event(doc, HoverEvent::Reset);
        // The renderer may hold a card the machine never learned about if
        // a mount failed halfway.
        self.renderer.unmount(doc);
        self.dismiss = None;
    }

    /// Step the machine and perform its effects.
    pub fn handle_event(&mut self, doc: &mut Document, event: HoverEvent) {
        let transition = std::mem::take(&mut self.machine).step(event);
        self.machine = transition.machine;
        for effect in transition.effects {
            self.apply(doc, effect);
        }
    }

    fn apply(&mut self, doc: &mut Document, effect: Effect) {
        match effect {
            Effect::StartFetch { request, url } => {
                log::debug!("Starting preview fetch {request} for {url}");
                self.dispatcher.dispatch(request, url);
            },
            Effect::Mount {
                request,
                anchor,
                payload,
            } => {
                if let Err(e) = self.renderer.mount(doc, &payload, anchor, request) {
                    log::warn!("Failed to mount preview for {request}: {e}");
                }
            },
            Effect::Unmount => {
                self.renderer.unmount(doc);
            },
            Effect::ArmDismiss { timer, delay_ms } => {
                let deadline_ms = self.clock.now_ms().saturating_add(delay_ms);
                self.dismiss = Some(DismissTimer {
                    id: timer,
                    deadline_ms,
                });
            },
            Effect::CancelDismiss { timer } => {
                if self.dismiss.is_some_and(|d| d.id == timer) {
                    self.dismiss = None;
                }
            },
            Effect::DropStale { request } => {
                log::debug!("Dropping stale preview result {request}");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::machine::{HoverState, RequestId};
    use crate::payload::{
        FAILED_EXTRACT, NO_DESCRIPTION, NO_EXTRACT, PreviewPayload, SummaryDocument,
    };
    use crate::test_utils::{ManualDispatcher, payload};
    use linkpeek_dom::{ElementData, TagName};
    use linkpeek_types::geometry::Rect;
    use proptest::prelude::*;

    const CLASS: &str = "wikipedia-preview";

    struct Fixture {
        doc: Document,
        ctl: HoverController<ManualDispatcher, ManualClock>,
        clock: ManualClock,
        /// Anchors, each with a text child at the same index in `texts`.
        links: Vec<NodeId>,
        texts: Vec<NodeId>,
        plain: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut doc = Document::with_body();
            let body = doc.body().unwrap();
            let p = doc.append_element(body, ElementData::new(TagName::P));
            let plain = doc.append_text(p, "See ");
            let mut links = Vec::new();
            let mut texts = Vec::new();
            for (i, name) in ["X", "Y", "Z"].iter().enumerate() {
                let a = doc.append_element(
                    p,
                    ElementData::new(TagName::A)
                        .with_attribute("href", &format!("https://en.wikipedia.org/wiki/{name}")),
                );
                doc.set_rect(a, Rect::new(10.0 + 50.0 * i as f32, 20.0, 40.0, 16.0));
                texts.push(doc.append_text(a, name));
                links.push(a);
            }
            let clock = ManualClock::new();
            let ctl = HoverController::new(
                &PreviewConfig::default(),
                ManualDispatcher::new(),
                clock.clone(),
            );
            Self {
                doc,
                ctl,
                clock,
                links,
                texts,
                plain,
            }
        }

        fn over(&mut self, node: NodeId) {
            self.ctl.handle_pointer(&mut self.doc, PointerEvent::over(node));
        }

        fn out(&mut self, node: NodeId) {
            self.ctl.handle_pointer(&mut self.doc, PointerEvent::out(node));
        }

        fn resolve(&mut self, request: RequestId, payload: PreviewPayload) {
            self.ctl.dispatcher_mut().complete(request, payload);
            self.ctl.tick(&mut self.doc);
        }

        fn wait(&mut self, ms: u64) {
            self.clock.advance(ms);
            self.ctl.tick(&mut self.doc);
        }

        fn last_request(&self) -> RequestId {
            self.ctl.dispatcher().last_request().unwrap()
        }

        fn cards(&self) -> Vec<NodeId> {
            self.doc.elements_with_class(CLASS)
        }

        fn card_text(&self) -> String {
            let card = self.ctl.card_node().unwrap();
            self.doc
                .get(card)
                .unwrap()
                .children
                .iter()
                .map(|&c| self.doc.text_content(c))
                .collect::<Vec<_>>()
                .join("|")
        }
    }

    fn summary(json: &str) -> PreviewPayload {
        serde_json::from_str::<SummaryDocument>(json).unwrap().into()
    }

    #[test]
    fn hover_shows_card_with_summary_content() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        assert_eq!(
            f.ctl.dispatcher().dispatched,
            vec![(RequestId(1), "https://en.wikipedia.org/wiki/X".to_string())]
        );
        assert!(f.cards().is_empty());

        f.resolve(
            RequestId(1),
            summary(r#"{"description":"D","extract":"E","thumbnail":{"source":"img.png"}}"#),
        );
        let card = f.ctl.card_node().unwrap();
        assert_eq!(f.cards(), vec![card]);
        let children = f.doc.get(card).unwrap().children.clone();
        assert_eq!(f.doc.element(children[0]).unwrap().src(), Some("img.png"));
        assert_eq!(f.doc.text_content(children[1]), "D");
        assert_eq!(f.doc.text_content(children[2]), "E");
    }

    #[test]
    fn empty_summary_shows_fallbacks_without_image() {
        let mut f = Fixture::new();
        f.over(f.texts[0]);
        f.resolve(RequestId(1), summary("{}"));
        assert_eq!(f.card_text(), format!("{NO_DESCRIPTION}|{NO_EXTRACT}"));
        let card = f.ctl.card_node().unwrap();
        assert!(
            f.doc
                .descendants(card)
                .iter()
                .all(|&n| f.doc.element(n).is_none_or(|e| e.tag != TagName::Img))
        );
    }

    #[test]
    fn late_result_for_superseded_link_changes_nothing() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.out(f.links[0]);
        f.over(f.links[1]);
        assert_eq!(f.last_request(), RequestId(2));

        f.resolve(RequestId(2), payload("Y title", "Y body"));
        let card = f.ctl.card_node().unwrap();
        assert_eq!(f.card_text(), "Y title|Y body");

        f.resolve(RequestId(1), payload("X title", "X body"));
        assert_eq!(f.ctl.card_node(), Some(card));
        assert_eq!(f.cards(), vec![card]);
        assert_eq!(f.card_text(), "Y title|Y body");
    }

    #[test]
    fn moving_onto_card_keeps_it_until_card_is_left() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        let card = f.ctl.card_node().unwrap();
        let card_text = f.doc.get(card).unwrap().children[1];

        f.out(f.texts[0]);
        f.over(card_text);
        f.wait(1_000);
        assert_eq!(f.cards(), vec![card]);
        assert_eq!(f.ctl.dismiss_timer(), None);

        f.out(card_text);
        f.wait(299);
        assert_eq!(f.cards(), vec![card]);
        f.wait(1);
        assert!(f.cards().is_empty());
        assert_eq!(f.ctl.machine().state(), &HoverState::Idle);
    }

    #[test]
    fn rehover_cancels_dismiss_without_remount() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        let card = f.ctl.card_node().unwrap();

        f.out(f.links[0]);
        f.wait(150);
        f.over(f.links[0]);
        f.wait(1_000);

        assert_eq!(f.ctl.card_node(), Some(card));
        assert_eq!(f.cards(), vec![card]);
        assert_eq!(f.ctl.dispatcher().dispatched.len(), 1);
    }

    #[test]
    fn failed_fetch_still_mounts_placeholder() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), PreviewPayload::failed());
        assert_eq!(f.cards().len(), 1);
        assert!(f.card_text().contains(FAILED_EXTRACT));
    }

    #[test]
    fn other_link_replaces_card_immediately() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        f.over(f.links[1]);
        assert!(f.cards().is_empty());
        f.resolve(RequestId(2), payload("Y", "Y"));
        assert_eq!(f.cards().len(), 1);
        assert_eq!(f.ctl.renderer().card().unwrap().anchor, f.links[1]);
    }

    #[test]
    fn leaving_before_result_abandons_request() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.out(f.links[0]);
        f.wait(300);
        assert_eq!(f.ctl.machine().state(), &HoverState::Idle);
        f.resolve(RequestId(1), payload("D", "E"));
        assert!(f.cards().is_empty());
    }

    #[test]
    fn result_after_leave_shows_then_dismisses_on_schedule() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.out(f.links[0]);
        f.wait(100);
        f.resolve(RequestId(1), payload("D", "E"));
        assert_eq!(f.cards().len(), 1);
        f.wait(200);
        assert!(f.cards().is_empty());
    }

    #[test]
    fn hover_cycles_do_not_grow_the_document() {
        fn cycle(f: &mut Fixture, link: usize) {
            f.over(f.links[link]);
            let request = f.last_request();
            f.resolve(request, payload("D", "E"));
            f.out(f.links[link]);
            f.wait(300);
            assert!(f.cards().is_empty());
        }

        let mut f = Fixture::new();
        cycle(&mut f, 0);
        let slots = f.doc.slot_count();
        let live = f.doc.len();

        for i in 0..1_000 {
            cycle(&mut f, i % 3);
        }
        assert_eq!(f.doc.slot_count(), slots);
        assert_eq!(f.doc.len(), live);
    }

    #[test]
    fn leaving_a_dismissed_card_is_ignored() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        let old_card = f.ctl.card_node().unwrap();
        f.out(f.links[0]);
        f.wait(300);
        assert!(f.cards().is_empty());

        // The next card reuses the old card's slots.
        f.over(f.links[1]);
        f.resolve(RequestId(2), payload("Y", "Y"));
        let card = f.ctl.card_node().unwrap();
        assert_eq!(card.index(), old_card.index());

        // A late pointer-out for the old card must not start a dismiss.
        f.out(old_card);
        assert_eq!(f.ctl.dismiss_timer(), None);
        assert_eq!(f.cards(), vec![card]);
    }

    #[test]
    fn plain_text_is_ignored() {
        let mut f = Fixture::new();
        f.over(f.plain);
        f.out(f.plain);
        assert!(f.ctl.dispatcher().dispatched.is_empty());
        assert!(!f.ctl.is_busy());
    }

    #[test]
    fn reset_removes_card_and_timer() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        f.out(f.links[0]);
        assert!(f.ctl.dismiss_timer().is_some());

        f.ctl.reset(&mut f.doc);
        assert!(f.cards().is_empty());
        assert_eq!(f.ctl.dismiss_timer(), None);
        f.ctl.reset(&mut f.doc);
        assert!(f.cards().is_empty());
    }

    #[test]
    fn dismiss_deadline_uses_configured_delay() {
        let mut f = Fixture::new();
        f.clock.set(1_000);
        f.over(f.links[0]);
        f.resolve(RequestId(1), payload("D", "E"));
        f.out(f.links[0]);
        assert_eq!(
            f.ctl.dismiss_timer(),
            Some(DismissTimer {
                id: TimerId(1),
                deadline_ms: 1_300,
            })
        );
    }

    #[test]
    fn mount_failure_is_logged_not_fatal() {
        let mut f = Fixture::new();
        f.over(f.links[0]);
        // Take the body away so the renderer has nowhere to mount.
        let body = f.doc.body().unwrap();
        f.doc.detach(body);
        f.resolve(RequestId(1), payload("D", "E"));
        assert_eq!(f.ctl.card_node(), None);
        assert!(f.ctl.machine().is_mounted());
        f.ctl.reset(&mut f.doc);
        assert_eq!(f.ctl.machine().state(), &HoverState::Idle);
    }

    #[test]
    fn thread_dispatcher_delivers_on_tick() {
        use crate::clock::SystemClock;
        use crate::dispatch::ThreadDispatcher;
        use crate::test_utils::StubFetcher;
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let url = "https://en.wikipedia.org/wiki/X";
        let fetcher = StubFetcher::new().with_response(url, payload("Threaded", "body"));
        let mut f = Fixture::new();
        let mut ctl = HoverController::new(
            &PreviewConfig::default(),
            ThreadDispatcher::new(Arc::new(fetcher)),
            SystemClock::new(),
        );
        ctl.handle_pointer(&mut f.doc, PointerEvent::over(f.links[0]));
        assert!(ctl.is_busy());

        let started = Instant::now();
        while ctl.card_node().is_none() && started.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(5));
            ctl.tick(&mut f.doc);
        }
        let card = ctl.card_node().unwrap();
        assert_eq!(f.doc.text_content(f.doc.get(card).unwrap().children[0]), "Threaded");
        assert!(!ctl.is_busy());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Over(usize),
        Out(usize),
        OverCard,
        OutCard,
        Resolve(usize),
        Wait(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize).prop_map(Op::Over),
            (0..6usize).prop_map(Op::Out),
            Just(Op::OverCard),
            Just(Op::OutCard),
            (0..4usize).prop_map(Op::Resolve),
            (0..400u64).prop_map(Op::Wait),
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_card_for_the_latest_request(ops in prop::collection::vec(op(), 0..80)) {
            let mut f = Fixture::new();
            for op in ops {
                let targets = [
                    f.links[0], f.links[1], f.links[2], f.texts[0], f.texts[1], f.plain,
                ];
                match op {
                    Op::Over(i) => f.over(targets[i]),
                    Op::Out(i) => f.out(targets[i]),
                    Op::OverCard => {
                        if let Some(card) = f.ctl.card_node() {
                            f.over(card);
                        }
                    },
                    Op::OutCard => {
                        if let Some(card) = f.ctl.card_node() {
                            f.out(card);
                        }
                    },
                    Op::Resolve(back) => {
                        let id = f.ctl.dispatcher().dispatched.iter().rev().nth(back).map(|(id, _)| *id);
                        if let Some(id) = id {
                            f.resolve(id, payload(&format!("{}", id.0), "body"));
                        }
                    },
                    Op::Wait(ms) => f.wait(ms),
                }

                let cards = f.cards();
                prop_assert!(cards.len() <= 1);
                prop_assert_eq!(cards.first().copied(), f.ctl.card_node());
                if let Some(state) = f.ctl.renderer().card() {
                    let latest = f.ctl.dispatcher().last_request();
                    prop_assert_eq!(Some(state.request), latest);
                    prop_assert_eq!(
                        f.ctl.machine().current_request().map(|r| r.id),
                        Some(state.request)
                    );
                }
            }
        }
    }
}
