//! The demo note the script runs against.

use linkpeek_dom::{Document, ElementData, NodeId, TagName};
use linkpeek_types::geometry::Rect;

const LINE_HEIGHT: f32 = 20.0;
const CHAR_WIDTH: f32 = 8.0;
const MARGIN: f32 = 16.0;

/// A link in the demo note.
#[derive(Debug, Clone)]
pub struct NoteLink {
    pub anchor: NodeId,
    pub text: NodeId,
    pub label: String,
    pub href: String,
}

pub struct DemoNote {
    pub doc: Document,
    pub links: Vec<NoteLink>,
}

/// Paragraphs made of plain runs and `(label, href)` links.
enum Run {
    Text(&'static str),
    Link(&'static str, &'static str),
}

const NOTE: &[&[Run]] = &[
    &[
        Run::Text("Reading list: start with "),
        Run::Link("Rust", "https://en.wikipedia.org/wiki/Rust_(programming_language)"),
        Run::Text(", then "),
        Run::Link("memory safety", "https://en.wikipedia.org/wiki/Memory_safety"),
        Run::Text("."),
    ],
    &[
        Run::Text("The mascot is a "),
        Run::Link("crab", "/wiki/Crab"),
        Run::Text("; see also "),
        Run::Link("rust-lang.org", "https://www.rust-lang.org/"),
        Run::Text(" and "),
        Run::Link("type systems", "https://en.wikipedia.org/wiki/Type_system#Static"),
        Run::Text("."),
    ],
];

/// Build the note with a fixed monospace layout so every node has a box.
pub fn build(base_url: &str) -> DemoNote {
    let mut doc = Document::with_body();
    doc.base_url = Some(base_url.to_string());
    let Some(body) = doc.body() else {
        return DemoNote {
            doc,
            links: Vec::new(),
        };
    };

    let heading = doc.append_element(body, ElementData::new(TagName::H1));
    doc.append_text(heading, "Notes");
    doc.set_rect(heading, Rect::new(MARGIN, MARGIN, 200.0, LINE_HEIGHT * 1.5));

    let mut links = Vec::new();
    let mut y = MARGIN + LINE_HEIGHT * 2.0;
    for paragraph in NOTE {
        let p = doc.append_element(body, ElementData::new(TagName::P));
        let mut x = MARGIN;
        for run in paragraph.iter() {
            let width = match run {
                Run::Text(text) => {
                    doc.append_text(p, text);
                    text.chars().count()
                },
                Run::Link(label, href) => {
                    let anchor = doc.append_element(
                        p,
                        ElementData::new(TagName::A).with_attribute("href", href),
                    );
                    let text = doc.append_text(anchor, label);
                    let w = label.chars().count() as f32 * CHAR_WIDTH;
                    doc.set_rect(anchor, Rect::new(x, y, w, LINE_HEIGHT));
                    links.push(NoteLink {
                        anchor,
                        text,
                        label: label.to_string(),
                        href: href.to_string(),
                    });
                    label.chars().count()
                },
            };
            x += width as f32 * CHAR_WIDTH;
        }
        doc.set_rect(p, Rect::new(MARGIN, y, x - MARGIN, LINE_HEIGHT));
        y += LINE_HEIGHT * 2.0;
    }

    DemoNote { doc, links }
}
