//! Hover-intent state machine.
//!
//! [`HoverMachine::step`] is a pure function from (state, event) to (state,
//! effects). It never touches the document, the network or a clock; the
//! [`HoverController`](crate::controller::HoverController) carries out the
//! effects it returns.
//!
//! ```text
//!   Idle ──enter link──▶ Pending ──resolve──▶ Showing ──leave──▶ Dismissing
//!    ▲                     │  ▲                  ▲                 │
//!    │                     │  └──enter other link┼─────────────────┤
//!    │◀──timer (pending)───┘                     └────re-enter─────┤
//!    └───────────────────────────timer─────────────────────────────┘
//! ```

use std::fmt;

use linkpeek_dom::NodeId;

use crate::matcher::{Classification, LinkTarget};
use crate::payload::PreviewPayload;

/// Default grace window between leaving and unmounting.
pub const DEFAULT_DISMISS_DELAY_MS: u64 = 300;

/// Monotonic fetch attempt identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic dismiss timer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One fetch attempt for one hovered link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub id: RequestId,
    pub target_url: String,
    pub anchor: NodeId,
}

impl PreviewRequest {
    fn new(id: RequestId, link: LinkTarget) -> Self {
        Self {
            id,
            target_url: link.url,
            anchor: link.anchor,
        }
    }

    /// Whether this request was made for `link`.
    pub fn is_for(&self, link: &LinkTarget) -> bool {
        self.anchor == link.anchor && self.target_url == link.url
    }

    pub fn link(&self) -> LinkTarget {
        LinkTarget {
            anchor: self.anchor,
            url: self.target_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    /// Fetch in flight. `dismiss` is armed if the pointer left the link
    /// before the result came back.
    Pending {
        request: PreviewRequest,
        dismiss: Option<TimerId>,
    },
    /// Card mounted, pointer on the link or the card.
    Showing { request: PreviewRequest },
    /// Card mounted, pointer gone, waiting for `timer`.
    Dismissing {
        request: PreviewRequest,
        timer: TimerId,
    },
}

/// Input to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverEvent {
    Enter(Classification),
    Leave(Classification),
    FetchResolved {
        request: RequestId,
        payload: PreviewPayload,
    },
    DismissElapsed(TimerId),
    /// Plugin teardown.
    Reset,
}

/// Side effects for the controller to perform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartFetch {
        request: RequestId,
        url: String,
    },
    Mount {
        request: RequestId,
        anchor: NodeId,
        payload: PreviewPayload,
    },
    Unmount,
    ArmDismiss {
        timer: TimerId,
        delay_ms: u64,
    },
    CancelDismiss {
        timer: TimerId,
    },
    /// A result arrived for a request that is no longer current.
    DropStale {
        request: RequestId,
    },
}

/// Result of [`HoverMachine::step`].
#[derive(Debug, Clone)]
pub struct Transition {
    pub machine: HoverMachine,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverMachine {
    state: HoverState,
    next_request: u64,
    next_timer: u64,
    dismiss_delay_ms: u64,
}

impl Default for HoverMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_DELAY_MS)
    }
}

impl HoverMachine {
    pub fn new(dismiss_delay_ms: u64) -> Self {
        Self {
            state: HoverState::Idle,
            next_request: 1,
            next_timer: 1,
            dismiss_delay_ms,
        }
    }

    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn dismiss_delay_ms(&self) -> u64 {
        self.dismiss_delay_ms
    }

    /// The request whose result would still be honoured (or is showing).
    pub fn current_request(&self) -> Option<&PreviewRequest> {
        self.state.request()
    }

    /// Whether a card is (supposed to be) in the document.
    pub fn is_mounted(&self) -> bool {
        matches!(
            self.state,
            HoverState::Showing { .. } | HoverState::Dismissing { .. }
        )
    }

    pub fn armed_timer(&self) -> Option<TimerId> {
        match self.state {
            HoverState::Pending { dismiss, .. } => dismiss,
            HoverState::Dismissing { timer, .. } => Some(timer),
            _ => None,
        }
    }

    /// Advance by one event.
    pub fn step(mut self, event: HoverEvent) -> Transition {
        let mut effects = Vec::new();
        let state = std::mem::take(&mut self.state);
        self.state = match event {
            HoverEvent::Enter(Classification::Link(link)) => {
                self.on_enter_link(state, link, &mut effects)
            },
            HoverEvent::Enter(Classification::InsidePreview) => {
                Self::on_reenter(state, &mut effects)
            },
            HoverEvent::Enter(Classification::Other) => state,
            HoverEvent::Leave(target) => self.on_leave(state, &target, &mut effects),
            HoverEvent::FetchResolved { request, payload } => {
                Self::on_resolved(state, request, payload, &mut effects)
            },
            HoverEvent::DismissElapsed(timer) => Self::on_elapsed(state, timer, &mut effects),
            HoverEvent::Reset => {
                Self::teardown(&state, &mut effects);
                HoverState::Idle
            },
        };
        Transition {
            machine: self,
            effects,
        }
    }

    fn on_enter_link(
        &mut self,
        state: HoverState,
        link: LinkTarget,
        effects: &mut Vec<Effect>,
    ) -> HoverState {
        let same = state
            .request()
            .is_some_and(|request| request.is_for(&link));
        if same {
            return Self::on_reenter(state, effects);
        }

        // A different link wins at once, without the grace window.
        Self::teardown(&state, effects);
        let request = PreviewRequest::new(self.allocate_request(), link);
        effects.push(Effect::StartFetch {
            request: request.id,
            url: request.target_url.clone(),
        });
        HoverState::Pending {
            request,
            dismiss: None,
        }
    }

    /// Pointer is back on the current link or on the card.
    fn on_reenter(state: HoverState, effects: &mut Vec<Effect>) -> HoverState {
        match state {
            HoverState::Pending {
                request,
                dismiss: Some(timer),
            } => {
                effects.push(Effect::CancelDismiss { timer });
                HoverState::Pending {
                    request,
                    dismiss: None,
                }
            },
            HoverState::Dismissing { request, timer } => {
                effects.push(Effect::CancelDismiss { timer });
                HoverState::Showing { request }
            },
            other => other,
        }
    }

    fn on_leave(
        &mut self,
        state: HoverState,
        target: &Classification,
        effects: &mut Vec<Effect>,
    ) -> HoverState {
        match (state, target) {
            (HoverState::Showing { request }, Classification::Link(link))
                if request.is_for(link) =>
            {
                let timer = self.arm(effects);
                HoverState::Dismissing { request, timer }
            },
            (HoverState::Showing { request }, Classification::InsidePreview) => {
                let timer = self.arm(effects);
                HoverState::Dismissing { request, timer }
            },
            (
                HoverState::Pending {
                    request,
                    dismiss: None,
                },
                Classification::Link(link),
            ) if request.is_for(link) => {
                let timer = self.arm(effects);
                HoverState::Pending {
                    request,
                    dismiss: Some(timer),
                }
            },
            // Leaving something unrelated, or a timer is already running.
            (state, _) => state,
        }
    }

    fn on_resolved(
        state: HoverState,
        id: RequestId,
        payload: PreviewPayload,
        effects: &mut Vec<Effect>,
    ) -> HoverState {
        match state {
            HoverState::Pending { request, dismiss } if request.id == id => {
                effects.push(Effect::Mount {
                    request: id,
                    anchor: request.anchor,
                    payload,
                });
                match dismiss {
                    Some(timer) => HoverState::Dismissing { request, timer },
                    None => HoverState::Showing { request },
                }
            },
            other => {
                effects.push(Effect::DropStale { request: id });
                other
            },
        }
    }

    fn on_elapsed(state: HoverState, fired: TimerId, effects: &mut Vec<Effect>) -> HoverState {
        match state {
            HoverState::Dismissing { timer, .. } if timer == fired => {
                effects.push(Effect::Unmount);
                HoverState::Idle
            },
            // Left before the result arrived and never came back.
            HoverState::Pending {
                dismiss: Some(timer),
                ..
            } if timer == fired => HoverState::Idle,
            other => other,
        }
    }

    /// Cancel any timer and unmount any card.
    fn teardown(state: &HoverState, effects: &mut Vec<Effect>) {
        match state {
            HoverState::Idle => {},
            HoverState::Pending { dismiss, .. } => {
                if let Some(timer) = *dismiss {
                    effects.push(Effect::CancelDismiss { timer });
                }
            },
            HoverState::Showing { .. } => effects.push(Effect::Unmount),
            HoverState::Dismissing { timer, .. } => {
                effects.push(Effect::CancelDismiss { timer: *timer });
                effects.push(Effect::Unmount);
            },
        }
    }

    fn arm(&mut self, effects: &mut Vec<Effect>) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        effects.push(Effect::ArmDismiss {
            timer,
            delay_ms: self.dismiss_delay_ms,
        });
        timer
    }

    fn allocate_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }
}

impl HoverState {
    pub fn request(&self) -> Option<&PreviewRequest> {
        match self {
            HoverState::Idle => None,
            HoverState::Pending { request, .. }
            | HoverState::Showing { request }
            | HoverState::Dismissing { request, .. } => Some(request),
        }
    }
}
