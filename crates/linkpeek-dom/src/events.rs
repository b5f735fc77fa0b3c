//! Pointer events delivered by the host.

use linkpeek_types::input::EventKind;

use crate::dom::NodeId;

/// A pointer notification targeting the deepest node under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: EventKind,
    pub target: NodeId,
}

impl PointerEvent {
    pub fn over(target: NodeId) -> Self {
        Self {
            kind: EventKind::PointerOver,
            target,
        }
    }

    pub fn out(target: NodeId) -> Self {
        Self {
            kind: EventKind::PointerOut,
            target,
        }
    }
}
