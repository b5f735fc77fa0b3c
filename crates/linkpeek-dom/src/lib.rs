//! Host document model for linkpeek.
//!
//! The host editor hands over its rendered document as an arena tree
//! ([`Document`]) with per-node layout boxes. The preview core classifies
//! pointer targets against it and mounts its card into it.

pub mod dom;
pub mod events;

pub use dom::{Attribute, Document, ElementData, Node, NodeId, NodeKind, TagName};
pub use events::PointerEvent;
