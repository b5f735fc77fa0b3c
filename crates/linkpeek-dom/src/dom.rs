//! Arena-based document tree.
//!
//! Nodes live in a flat slot arena linked by [`NodeId`]. Removing a subtree
//! frees its slots for reuse; every id carries the generation of the slot
//! it was issued for, so ids held past removal resolve to nothing instead
//! of to whatever node took the slot over.

use std::fmt;
use std::str::FromStr;

use linkpeek_types::error::PeekError;
use linkpeek_types::geometry::{Point, Rect};

/// Handle to a node in a [`Document`]: a slot index plus the slot's
/// generation when the node was created.
///
/// Displayed as `12` for first-generation slots and `12v3` once the slot
/// has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.generation {
            0 => self.index.to_string(),
            g => format!("{}v{g}", self.index),
        };
        f.pad(&text)
    }
}

impl FromStr for NodeId {
    type Err = PeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PeekError::Dom(format!("invalid node id {s:?}"));
        let (index, generation) = match s.split_once('v') {
            Some((i, g)) => (i, g.parse::<u32>().map_err(|_| bad())?),
            None => (s, 0),
        };
        let index = index.parse::<u32>().map_err(|_| bad())?;
        Ok(Self::new(index, generation))
    }
}

// ------------------------------------------------------------------
// Node types
// ------------------------------------------------------------------

/// A rendered host document.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    /// Indices of vacant slots, reused before the arena grows.
    free: Vec<u32>,
    pub root: NodeId,
    /// Base URL used to resolve relative `href`s.
    pub base_url: Option<String>,
    /// Current page scroll offset.
    pub scroll: Point,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A single node in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Layout box in viewport coordinates, if the host laid it out.
    pub rect: Option<Rect>,
}

/// The kind of node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

/// Data associated with an Element node.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: TagName,
    pub attributes: Vec<Attribute>,
}

/// An element attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

// ------------------------------------------------------------------
// TagName
// ------------------------------------------------------------------

/// Tag names the preview system cares about.
///
/// Anything else the host renders is kept as `Unknown(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagName {
    Html,
    Head,
    Body,
    Div,
    Span,
    P,
    A,
    Img,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Em,
    Strong,
    Code,
    Blockquote,
    Unknown(String),
}

impl TagName {
    /// Parse a tag name, case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Self::Html,
            "head" => Self::Head,
            "body" => Self::Body,
            "div" => Self::Div,
            "span" => Self::Span,
            "p" => Self::P,
            "a" => Self::A,
            "img" => Self::Img,
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "ul" => Self::Ul,
            "ol" => Self::Ol,
            "li" => Self::Li,
            "em" => Self::Em,
            "strong" => Self::Strong,
            "code" => Self::Code,
            "blockquote" => Self::Blockquote,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::Head => "head",
            Self::Body => "body",
            Self::Div => "div",
            Self::Span => "span",
            Self::P => "p",
            Self::A => "a",
            Self::Img => "img",
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
            Self::Ul => "ul",
            Self::Ol => "ol",
            Self::Li => "li",
            Self::Em => "em",
            Self::Strong => "strong",
            Self::Code => "code",
            Self::Blockquote => "blockquote",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

// ------------------------------------------------------------------
// ElementData
// ------------------------------------------------------------------

impl ElementData {
    /// Create a new `ElementData` with the given tag and no attributes.
    pub fn new(tag: TagName) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Get an attribute value by name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Check if this element carries the given class.
    ///
    /// The `class` attribute value is split on ASCII whitespace and each
    /// token is compared to `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .map(|v| v.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    pub fn href(&self) -> Option<&str> {
        self.get_attribute("href")
    }

    pub fn src(&self) -> Option<&str> {
        self.get_attribute("src")
    }
}

// ------------------------------------------------------------------
// Document
// ------------------------------------------------------------------

impl Document {
    /// Create an empty document with a synthetic `Document` root node.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            base_url: None,
            scroll: Point::default(),
        };
        doc.root = doc.add_node(NodeKind::Document);
        doc
    }

    /// Create a document with the usual `html > (head, body)` skeleton.
    pub fn with_body() -> Self {
        let mut doc = Self::new();
        let html = doc.append_element(doc.root, ElementData::new(TagName::Html));
        doc.append_element(html, ElementData::new(TagName::Head));
        doc.append_element(html, ElementData::new(TagName::Body));
        doc
    }

    /// Add a detached node to the arena and return its [`NodeId`].
    ///
    /// Vacant slots left by [`Self::remove_subtree`] are reused first.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
            rect: None,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// Append `child_id` as the last child of `parent_id`.
    ///
    /// A child that already has a parent is unlinked from it first.
    /// Returns `false`, leaving the tree untouched, when either id is stale
    /// or the move would make a node its own ancestor.
    pub fn append_child(&mut self, parent_id: NodeId, child_id: NodeId) -> bool {
        if !self.contains_id(parent_id) || !self.contains_id(child_id) {
            log::warn!("append_child({parent_id}, {child_id}): unknown node");
            return false;
        }
        if self.is_inclusive_descendant(parent_id, child_id) {
            log::warn!("append_child({parent_id}, {child_id}): would create a cycle");
            return false;
        }
        self.detach(child_id);
        if let Some(parent) = self.node_mut(parent_id) {
            parent.children.push(child_id);
        }
        if let Some(child) = self.node_mut(child_id) {
            child.parent = Some(parent_id);
        }
        true
    }

    /// Create an element and append it under `parent_id`.
    pub fn append_element(&mut self, parent_id: NodeId, data: ElementData) -> NodeId {
        let id = self.add_node(NodeKind::Element(data));
        self.append_child(parent_id, id);
        id
    }

    /// Create a text node and append it under `parent_id`.
    pub fn append_text(&mut self, parent_id: NodeId, text: &str) -> NodeId {
        let id = self.add_node(NodeKind::Text(text.to_string()));
        self.append_child(parent_id, id);
        id
    }

    /// Unlink `id` (and with it its whole subtree) from its parent.
    ///
    /// Returns `false` when the node had no parent or does not exist.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node_mut(id).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|&c| c != id);
        }
        true
    }

    /// Unlink `id` and free the slots of its whole subtree.
    ///
    /// Every id inside the subtree goes stale. Returns how many nodes were
    /// removed; the root cannot be removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root {
            log::warn!("Refusing to remove the document root");
            return 0;
        }
        if !self.contains_id(id) {
            return 0;
        }
        self.detach(id);
        let doomed = self.descendants(id);
        // Reversed so the subtree root's slot is handed out first again.
        for &n in doomed.iter().rev() {
            let slot = &mut self.slots[n.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
        }
        doomed.len()
    }

    /// The node behind `id`, or `None` if the id is stale or foreign.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Whether `id` names a live node in this arena.
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots the arena holds, live or vacant.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let node = slot.node.as_ref()?;
            Some((NodeId::new(i as u32, slot.generation), node))
        })
    }

    /// Get the [`ElementData`] for a node, if it is a live `Element`.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Set the layout box the host computed for a node. Returns `false`
    /// for a stale id.
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.rect = Some(rect);
                true
            },
            None => {
                log::warn!("set_rect({id}): unknown node");
                false
            },
        }
    }

    /// Layout box of `id`, falling back to the nearest laid-out ancestor.
    ///
    /// Inline children (text runs inside a link) are often not boxed
    /// separately by the host.
    pub fn bounding_rect(&self, id: NodeId) -> Option<Rect> {
        self.ancestors(id).find_map(|n| self.get(n)?.rect)
    }

    /// Iterate from `id` up to the root, `id` included. Empty for a stale
    /// id.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.contains_id(id).then_some(id);
        std::iter::successors(start, move |&n| self.get(n)?.parent)
    }

    /// Nearest inclusive ancestor of `id` that is an element matching `pred`.
    pub fn closest<F>(&self, id: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&ElementData) -> bool,
    {
        self.ancestors(id)
            .find(|&n| self.element(n).is_some_and(&mut pred))
    }

    /// Whether `id` equals `ancestor` or lies inside its subtree.
    pub fn is_inclusive_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|n| n == ancestor)
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_inclusive_descendant(id, self.root)
    }

    /// Get the concatenated text content of a node and all its
    /// descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match &self.get(n)?.kind {
                NodeKind::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Find the first attached element whose `id` attribute matches.
    pub fn get_element_by_id(&self, target: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.element(n).and_then(|e| e.id()) == Some(target))
    }

    /// All attached elements carrying `class`, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.element(n).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    /// Topmost attached node whose layout box contains the point
    /// (viewport coordinates): the last match in document order, which is
    /// the deepest one when boxes nest.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| {
                self.get(n)
                    .and_then(|node| node.rect)
                    .is_some_and(|r| r.contains(x, y))
            })
            .last()
    }

    /// Find the `<body>` element.
    pub fn body(&self) -> Option<NodeId> {
        self.find_first_element(&TagName::Body)
    }

    /// Find the `<head>` element.
    pub fn head(&self) -> Option<NodeId> {
        self.find_first_element(&TagName::Head)
    }

    /// First attached element with the given tag, in document order.
    pub fn find_first_element(&self, tag: &TagName) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.element(n).is_some_and(|e| e.tag == *tag))
    }

    /// Pre-order list of `id` and everything below it. Empty for a stale
    /// id.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.get(n) else {
                continue;
            };
            out.push(n);
            // Reverse so the leftmost child is visited first.
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
