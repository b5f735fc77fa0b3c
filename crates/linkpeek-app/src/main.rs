//! linkpeek console demo.
//!
//! Builds a small note, loads the link preview plugin against it and replays
//! a pointer script from stdin, printing the preview card whenever it
//! appears or goes away. Summaries are fetched live from the configured
//! endpoint.
//!
//! Config comes from the first CLI argument or `LINKPEEK_CONFIG`; without
//! either the built-in English Wikipedia defaults are used.

mod host;
mod note;
mod script;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use host::ConsoleHost;
use linkpeek_core::{
    HoverController, LinkPreviewPlugin, SummaryFetcher, SystemClock, ThreadDispatcher,
};
use linkpeek_types::config::PreviewConfig;
use script::Session;

/// Base URL the note's relative links resolve against.
const NOTE_BASE_URL: &str = "https://en.wikipedia.org/wiki/Main_Page";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LINKPEEK_CONFIG").ok())
        .map(PathBuf::from);
    let config = match config_path {
        Some(path) => PreviewConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PreviewConfig::default(),
    };
    log::info!(
        "Previewing links under {} (dismiss after {} ms)",
        config.url_prefix_pattern,
        config.dismiss_delay_ms,
    );

    let fetcher = SummaryFetcher::new(&config).with_rustls();
    let controller = HoverController::new(
        &config,
        ThreadDispatcher::new(Arc::new(fetcher)),
        SystemClock::new(),
    );
    let mut plugin = LinkPreviewPlugin::new(controller);
    let mut host = ConsoleHost::new();
    plugin.on_load(&mut host);
    log::debug!("{} host listeners active", host.active().len());

    let note = note::build(NOTE_BASE_URL);
    if let Some(body) = note.doc.body() {
        let count = plugin.post_process(&note.doc, body);
        log::info!("Note has {count} previewable links");
    }

    let mut session = Session::new(plugin, note.doc, note.links);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    session.execute(script::Command::Links, &mut out)?;

    for (number, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("reading script")?;
        let command = match script::parse_line(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                writeln!(out, "line {}: {e}", number + 1)?;
                continue;
            },
        };
        if !session.execute(command, &mut out)? {
            break;
        }
        out.flush()?;
    }

    session.finish(&mut host, &mut out)?;
    log::info!("Done");
    Ok(())
}
