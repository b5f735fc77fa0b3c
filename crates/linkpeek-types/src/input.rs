//! Host-agnostic pointer event kinds.
//!
//! Every host maps its native pointer notifications to these kinds. The
//! preview core never sees raw platform input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The pointer notifications the preview system listens for.
///
/// Both kinds follow DOM `mouseover`/`mouseout` semantics: they fire on
/// the deepest element under the pointer and are delivered once per
/// element boundary crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The pointer moved onto an element.
    PointerOver,
    /// The pointer moved off an element.
    PointerOut,
}

impl EventKind {
    /// All kinds, in listener registration order.
    pub const ALL: [EventKind; 2] = [EventKind::PointerOver, EventKind::PointerOut];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PointerOver => "pointerover",
            Self::PointerOut => "pointerout",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pointerover" | "mouseover" | "over" => Ok(Self::PointerOver),
            "pointerout" | "mouseout" | "out" => Ok(Self::PointerOut),
            other => Err(format!("unknown pointer event kind: {other}")),
        }
    }
}
