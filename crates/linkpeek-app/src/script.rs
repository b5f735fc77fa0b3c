//! Pointer script interpreter.
//!
//! One command per line:
//!
//! ```text
//! over <node>     pointer enters a node
//! out <node>      pointer leaves a node
//! move <x> <y>    pointer moves to a viewport position (over/out as needed)
//! wait <ms>       let fetches and timers run
//! show            print the current card
//! links           list the note's links
//! quit
//! ```
//!
//! Node ids are written the way they are printed (`12`, or `12v3` for a
//! reused slot). Blank lines and lines starting with `#` are ignored.

use std::io::{self, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};

use linkpeek_core::{Clock, FetchDispatcher, Host, LinkPreviewPlugin};
use linkpeek_dom::{Document, NodeId, PointerEvent, TagName};
use linkpeek_types::input::EventKind;

use crate::note::NoteLink;

/// Granularity of `wait`.
const TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pointer(EventKind, NodeId),
    Move(f32, f32),
    Wait(u64),
    Show,
    Links,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or("empty command")?;
        let mut arg = |name: &str| {
            words
                .next()
                .ok_or_else(|| format!("{verb}: missing <{name}>"))
        };
        let command = match verb {
            "wait" => {
                let ms = arg("ms")?;
                Command::Wait(ms.parse::<u64>().map_err(|_| format!("wait: bad duration {ms:?}"))?)
            },
            "move" => {
                let x = arg("x")?;
                let x = x.parse::<f32>().map_err(|_| format!("move: bad x {x:?}"))?;
                let y = arg("y")?;
                let y = y.parse::<f32>().map_err(|_| format!("move: bad y {y:?}"))?;
                Command::Move(x, y)
            },
            "show" => Command::Show,
            "links" => Command::Links,
            "quit" | "exit" => Command::Quit,
            other => {
                let kind = EventKind::from_str(other).map_err(|_| format!("unknown command {other:?}"))?;
                let node = arg("node")?;
                Command::Pointer(
                    kind,
                    node.parse::<NodeId>().map_err(|_| format!("{other}: bad node id {node:?}"))?,
                )
            },
        };
        if let Some(extra) = words.next() {
            return Err(format!("{verb}: unexpected argument {extra:?}"));
        }
        Ok(command)
    }
}

/// Parse a script line; `None` for blanks and comments.
pub fn parse_line(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}

/// The note, the plugin driving it, and what has been printed so far.
pub struct Session<D, C> {
    plugin: LinkPreviewPlugin<D, C>,
    doc: Document,
    links: Vec<NoteLink>,
    /// Node under the pointer after the last `move`.
    hovered: Option<NodeId>,
    /// Card last reported to the user.
    reported: Option<NodeId>,
}

impl<D: FetchDispatcher, C: Clock> Session<D, C> {
    pub fn new(plugin: LinkPreviewPlugin<D, C>, doc: Document, links: Vec<NoteLink>) -> Self {
        Self {
            plugin,
            doc,
            links,
            hovered: None,
            reported: None,
        }
    }

    /// Unload the plugin, removing any card.
    pub fn finish(&mut self, host: &mut dyn Host, out: &mut impl Write) -> io::Result<()> {
        self.plugin.on_unload(host, &mut self.doc);
        self.report(out)
    }

    /// Run one command. Returns `false` when the script should stop.
    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<bool> {
        match command {
            Command::Pointer(kind, node) => {
                if !self.doc.contains_id(node) {
                    writeln!(out, "no such node: {node}")?;
                    return Ok(true);
                }
                self.pointer(PointerEvent { kind, target: node });
            },
            Command::Move(x, y) => {
                let target = self.doc.hit_test(x, y);
                if target != self.hovered {
                    if let Some(old) = self.hovered {
                        self.pointer(PointerEvent::out(old));
                    }
                    if let Some(new) = target {
                        self.pointer(PointerEvent::over(new));
                    }
                    self.hovered = target;
                }
            },
            Command::Wait(ms) => {
                let deadline = Instant::now() + Duration::from_millis(ms);
                loop {
                    self.plugin.tick(&mut self.doc);
                    self.report(out)?;
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    std::thread::sleep(TICK.min(deadline - now));
                }
            },
            Command::Show => match self.plugin.controller().card_node() {
                Some(card) => write_card(out, &self.doc, card)?,
                None => writeln!(out, "no card")?,
            },
            Command::Links => {
                writeln!(out, "link text  label            href")?;
                for link in &self.links {
                    writeln!(
                        out,
                        "{:>4} {:>4}  {:<16} {}",
                        link.anchor, link.text, link.label, link.href
                    )?;
                }
            },
            Command::Quit => return Ok(false),
        }
        self.plugin.tick(&mut self.doc);
        self.report(out)?;
        Ok(true)
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.plugin.handle_pointer(&mut self.doc, event);
    }

    /// Print the card if it changed since the last report.
    fn report(&mut self, out: &mut impl Write) -> io::Result<()> {
        let card = self.plugin.controller().card_node();
        if card == self.reported {
            return Ok(());
        }
        match card {
            Some(node) => write_card(out, &self.doc, node)?,
            None => writeln!(out, "card dismissed")?,
        }
        self.reported = card;
        Ok(())
    }
}

/// Print a card as indented text.
pub fn write_card(out: &mut impl Write, doc: &Document, card: NodeId) -> io::Result<()> {
    let style = doc
        .element(card)
        .and_then(|e| e.get_attribute("style"))
        .unwrap_or("");
    writeln!(out, "card {card} [{style}]")?;
    let children = doc.get(card).map(|n| n.children.as_slice()).unwrap_or_default();
    for &child in children {
        let Some(element) = doc.element(child) else {
            continue;
        };
        match element.tag {
            TagName::Img => writeln!(out, "  image: {}", element.src().unwrap_or(""))?,
            TagName::A => writeln!(
                out,
                "  {} -> {}",
                doc.text_content(child),
                element.href().unwrap_or("")
            )?,
            _ => writeln!(out, "  {}", doc.text_content(child))?,
        }
    }
    Ok(())
}
