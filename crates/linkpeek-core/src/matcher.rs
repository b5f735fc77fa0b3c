//! Pointer target classification.
//!
//! Decides whether a node under the pointer belongs to a previewable link,
//! to the mounted preview card, or to neither.

use linkpeek_dom::{Document, NodeId, TagName};
use linkpeek_net::Url;
use linkpeek_types::config::PreviewConfig;

/// A confirmed previewable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// The `<a>` element, not the inline child the pointer actually hit.
    pub anchor: NodeId,
    /// Fully resolved href.
    pub url: String,
}

impl LinkTarget {
    /// Same anchor element and same URL.
    pub fn is_same_link(&self, other: &LinkTarget) -> bool {
        self == other
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Link(LinkTarget),
    InsidePreview,
    Other,
}

/// Prefix-based link matcher.
#[derive(Debug, Clone)]
pub struct LinkMatcher {
    prefix: String,
}

impl LinkMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.url_prefix_pattern.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Classify `target`. `card` is the currently mounted preview root.
    ///
    /// The card is checked first: links rendered inside it (the "Read
    /// more" link) never start a new preview.
    pub fn classify(&self, doc: &Document, target: NodeId, card: Option<NodeId>) -> Classification {
        if !doc.contains_id(target) || !doc.is_attached(target) {
            return Classification::Other;
        }

        if let Some(card) = card
            && doc.contains_id(card)
            && doc.is_inclusive_descendant(target, card)
        {
            return Classification::InsidePreview;
        }

        let Some(anchor) = doc.closest(target, |e| e.tag == TagName::A) else {
            return Classification::Other;
        };
        let Some(href) = doc.element(anchor).and_then(|e| e.href()) else {
            return Classification::Other;
        };

        let url = resolve_href(doc, href);
        match self.resource_id(&url) {
            Some(_) => Classification::Link(LinkTarget { anchor, url }),
            None => Classification::Other,
        }
    }

    /// Whether `url` starts with the prefix and names a resource.
    pub fn matches(&self, url: &str) -> bool {
        self.resource_id(url).is_some()
    }

    /// Identifier following the prefix, without query or fragment.
    ///
    /// `None` when the URL does not start with the prefix or nothing
    /// follows it.
    pub fn resource_id<'a>(&self, url: &'a str) -> Option<&'a str> {
        let rest = url.strip_prefix(self.prefix.as_str())?;
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        let id = &rest[..end];
        (!id.is_empty()).then_some(id)
    }
}

/// Resolve an `href` the way a browser's `HTMLAnchorElement.href` would.
///
/// Without a usable base URL, absolute hrefs are normalised and anything
/// else is returned verbatim.
pub(crate) fn resolve_href(doc: &Document, href: &str) -> String {
    let base = doc.base_url.as_deref().and_then(Url::parse);
    let resolved = match base {
        Some(base) => base.resolve(href),
        None => Url::parse(href),
    };
    match resolved {
        Some(url) => url.to_string(),
        None => href.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkpeek_dom::ElementData;

    const PREFIX: &str = "https://en.wikipedia.org/wiki/";

    fn matcher() -> LinkMatcher {
        LinkMatcher::new(PREFIX)
    }

    fn doc_with_link(href: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let p = doc.append_element(body, ElementData::new(TagName::P));
        let a = doc.append_element(
            p,
            ElementData::new(TagName::A).with_attribute("href", href),
        );
        let text = doc.append_text(a, "Rust");
        (doc, a, text)
    }

    #[test]
    fn matching_anchor_is_link() {
        let (doc, a, _) = doc_with_link("https://en.wikipedia.org/wiki/Rust");
        assert_eq!(
            matcher().classify(&doc, a, None),
            Classification::Link(LinkTarget {
                anchor: a,
                url: "https://en.wikipedia.org/wiki/Rust".to_string(),
            })
        );
    }

    #[test]
    fn text_inside_anchor_classifies_as_enclosing_link() {
        let (doc, a, text) = doc_with_link("https://en.wikipedia.org/wiki/Rust");
        match matcher().classify(&doc, text, None) {
            Classification::Link(link) => assert_eq!(link.anchor, a),
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn nested_inline_markup_classifies_as_link() {
        let (mut doc, a, _) = doc_with_link("https://en.wikipedia.org/wiki/Crab");
        let em = doc.append_element(a, ElementData::new(TagName::Em));
        let inner = doc.append_text(em, "crab");
        match matcher().classify(&doc, inner, None) {
            Classification::Link(link) => assert_eq!(link.anchor, a),
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn non_matching_href_is_other() {
        let (doc, a, _) = doc_with_link("https://example.com/wiki/Rust");
        assert_eq!(matcher().classify(&doc, a, None), Classification::Other);
    }

    #[test]
    fn anchor_without_href_is_other() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let a = doc.append_element(body, ElementData::new(TagName::A));
        assert_eq!(matcher().classify(&doc, a, None), Classification::Other);
    }

    #[test]
    fn bare_prefix_is_other() {
        let (doc, a, _) = doc_with_link("https://en.wikipedia.org/wiki/");
        assert_eq!(matcher().classify(&doc, a, None), Classification::Other);
    }

    #[test]
    fn plain_text_is_other() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let text = doc.append_text(body, "hello");
        assert_eq!(matcher().classify(&doc, text, None), Classification::Other);
        assert_eq!(matcher().classify(&doc, NodeId::new(999, 0), None), Classification::Other);
    }

    #[test]
    fn href_with_space_and_non_ascii_is_reported_encoded() {
        let (doc, a, _) = doc_with_link("https://en.wikipedia.org/wiki/São Paulo");
        match matcher().classify(&doc, a, None) {
            Classification::Link(target) => {
                assert_eq!(target.url, "https://en.wikipedia.org/wiki/S%C3%A3o%20Paulo");
            },
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn detached_link_is_other() {
        let (mut doc, a, text) = doc_with_link("https://en.wikipedia.org/wiki/Rust");
        doc.detach(a);
        assert_eq!(matcher().classify(&doc, text, None), Classification::Other);
    }

    #[test]
    fn relative_href_resolves_against_base() {
        let (mut doc, a, _) = doc_with_link("/wiki/Ferris");
        assert_eq!(matcher().classify(&doc, a, None), Classification::Other);

        doc.base_url = Some("https://en.wikipedia.org/wiki/Main_Page".to_string());
        match matcher().classify(&doc, a, None) {
            Classification::Link(link) => {
                assert_eq!(link.url, "https://en.wikipedia.org/wiki/Ferris");
            },
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn uppercase_host_is_normalised() {
        let (doc, a, _) = doc_with_link("HTTPS://EN.WIKIPEDIA.ORG/wiki/Rust");
        assert!(matches!(
            matcher().classify(&doc, a, None),
            Classification::Link(_)
        ));
    }

    #[test]
    fn card_content_is_inside_preview() {
        let (mut doc, _, _) = doc_with_link("https://en.wikipedia.org/wiki/Rust");
        let body = doc.body().unwrap();
        let card = doc.append_element(
            body,
            ElementData::new(TagName::Div).with_attribute("class", "wikipedia-preview"),
        );
        let p = doc.append_element(card, ElementData::new(TagName::P));
        let text = doc.append_text(p, "extract");

        let m = matcher();
        assert_eq!(m.classify(&doc, card, Some(card)), Classification::InsidePreview);
        assert_eq!(m.classify(&doc, text, Some(card)), Classification::InsidePreview);
        assert_eq!(m.classify(&doc, text, None), Classification::Other);
    }

    #[test]
    fn link_inside_card_is_inside_preview() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let card = doc.append_element(body, ElementData::new(TagName::Div));
        let more = doc.append_element(
            card,
            ElementData::new(TagName::A)
                .with_attribute("href", "https://en.wikipedia.org/wiki/Rust"),
        );
        assert_eq!(
            matcher().classify(&doc, more, Some(card)),
            Classification::InsidePreview
        );
    }

    #[test]
    fn resource_id_strips_query_and_fragment() {
        let m = matcher();
        assert_eq!(
            m.resource_id("https://en.wikipedia.org/wiki/Rust_(language)"),
            Some("Rust_(language)")
        );
        assert_eq!(
            m.resource_id("https://en.wikipedia.org/wiki/Rust#History"),
            Some("Rust")
        );
        assert_eq!(
            m.resource_id("https://en.wikipedia.org/wiki/Rust?action=raw"),
            Some("Rust")
        );
        assert_eq!(m.resource_id("https://en.wikipedia.org/wiki/#top"), None);
        assert_eq!(m.resource_id("https://example.com/wiki/Rust"), None);
        assert!(m.matches("https://en.wikipedia.org/wiki/Crab"));
    }

    #[test]
    fn same_link_needs_same_anchor_and_url() {
        let a = LinkTarget {
            anchor: NodeId::new(4, 0),
            url: "https://en.wikipedia.org/wiki/Rust".to_string(),
        };
        let moved = LinkTarget {
            anchor: NodeId::new(9, 0),
            ..a.clone()
        };
        let retargeted = LinkTarget {
            url: "https://en.wikipedia.org/wiki/Crab".to_string(),
            ..a.clone()
        };
        assert!(a.is_same_link(&a.clone()));
        assert!(!a.is_same_link(&moved));
        assert!(!a.is_same_link(&retargeted));
    }
}
