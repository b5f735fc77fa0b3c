//! Preview card rendering.
//!
//! The renderer owns the single card subtree. All payload text goes into
//! text nodes, never markup.

use linkpeek_dom::{Document, ElementData, NodeId, NodeKind, TagName};
use linkpeek_types::config::{Positioning, PreviewConfig};
use linkpeek_types::error::{PeekError, Result};
use linkpeek_types::geometry::Point;

use crate::machine::RequestId;
use crate::payload::PreviewPayload;

/// The mounted card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewCardState {
    /// Root `div` of the card.
    pub node: NodeId,
    /// Link the card is attached to.
    pub anchor: NodeId,
    pub request: RequestId,
}

/// Builds, places and removes the preview card.
#[derive(Debug)]
pub struct PreviewRenderer {
    card_class: String,
    positioning: Positioning,
    card: Option<PreviewCardState>,
}

impl PreviewRenderer {
    pub fn new(card_class: impl Into<String>, positioning: Positioning) -> Self {
        Self {
            card_class: card_class.into(),
            positioning,
            card: None,
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.card_class.clone(), config.positioning)
    }

    /// The mounted card, if any.
    pub fn card(&self) -> Option<&PreviewCardState> {
        self.card.as_ref()
    }

    pub fn card_node(&self) -> Option<NodeId> {
        self.card.map(|c| c.node)
    }

    pub fn card_class(&self) -> &str {
        &self.card_class
    }

    /// Replace whatever card is showing with one for `payload`.
    pub fn mount(
        &mut self,
        doc: &mut Document,
        payload: &PreviewPayload,
        anchor: NodeId,
        request: RequestId,
    ) -> Result<NodeId> {
        let body = doc
            .body()
            .ok_or_else(|| PeekError::Dom("document has no <body>".to_string()))?;
        if !doc.contains_id(anchor) {
            return Err(PeekError::Dom(format!("anchor node {anchor} does not exist")));
        }

        self.unmount(doc);
        // Cards left behind by someone else would break the one-card rule.
        for stray in doc.elements_with_class(&self.card_class) {
            log::debug!("Removing stray preview card {stray}");
            doc.remove_subtree(stray);
        }

        let position = self.position_for(doc, anchor);
        let style = format!(
            "position: {}; left: {}px; top: {}px;",
            self.positioning.as_css(),
            position.x,
            position.y,
        );
        let card = doc.add_node(NodeKind::Element(
            ElementData::new(TagName::Div)
                .with_attribute("class", &self.card_class)
                .with_attribute("style", &style),
        ));

        if let Some(src) = &payload.image_url {
            doc.append_element(
                card,
                ElementData::new(TagName::Img)
                    .with_attribute("src", src)
                    .with_attribute("alt", "Featured image"),
            );
        }
        let title = doc.append_element(card, ElementData::new(TagName::H5));
        doc.append_text(title, &payload.title);
        let extract = doc.append_element(card, ElementData::new(TagName::P));
        doc.append_text(extract, &payload.extract);
        if let Some(href) = &payload.canonical_url {
            let more = doc.append_element(
                card,
                ElementData::new(TagName::A).with_attribute("href", href),
            );
            doc.append_text(more, "Read more");
        }

        // Built detached, inserted in one step.
        doc.append_child(body, card);
        self.card = Some(PreviewCardState {
            node: card,
            anchor,
            request,
        });
        log::debug!("Mounted preview card {card} for request {request}");
        Ok(card)
    }

    /// Remove the card. Returns `false` when nothing was mounted.
    pub fn unmount(&mut self, doc: &mut Document) -> bool {
        let Some(card) = self.card.take() else {
            return false;
        };
        let removed = doc.remove_subtree(card.node);
        log::debug!("Unmounted preview card {} ({removed} nodes)", card.node);
        true
    }

    /// Bottom-left corner of the anchor's box, in the coordinate space the
    /// positioning mode expects.
    fn position_for(&self, doc: &Document, anchor: NodeId) -> Point {
        let Some(rect) = doc.bounding_rect(anchor) else {
            log::warn!("Anchor {anchor} has no layout box; placing card at origin");
            return Point::default();
        };
        match self.positioning {
            Positioning::Absolute => {
                Point::new(rect.left() + doc.scroll.x, rect.bottom() + doc.scroll.y)
            },
            Positioning::Fixed => Point::new(rect.left(), rect.bottom()),
        }
    }
}
