//! Parse command implementation.
//!
//! Classifies a saved trace (file or stdin) and prints JSON events.

use super::drain::{drain_events, DynSink, RawOutput};
use super::models::ParseArgs;
use crate::output::EventSink;
use crate::parser::{ParseSummary, ParserConfig, TraceParser, TracePatterns};
use crate::utils::cancel::CancellationToken;
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::thread;

/// Execute the parse command, writing events to stdout
///
/// **Public** - main entry point called from main.rs
pub fn execute_parse(args: ParseArgs) -> Result<ParseSummary> {
    let sink: Arc<DynSink> = Arc::new(EventSink::new(Box::new(std::io::stdout())));
    parse_to_sink(args, sink)
}

/// Parse a saved trace into the given sink
///
/// **Public** - usable from tests with an in-memory or file sink
///
/// # Errors
/// * Input file cannot be opened
/// * Read errors on the input
/// * Write errors on the sink
pub fn parse_to_sink(args: ParseArgs, sink: Arc<DynSink>) -> Result<ParseSummary> {
    let patterns = Arc::new(TracePatterns::new().context("Failed to compile trace patterns")?);
    let cancel = CancellationToken::new();
    let config = ParserConfig::new()
        .with_selector(args.format.clone())
        .with_cancellation(cancel.clone());

    let (parser, receivers) = match &args.input {
        Some(path) => {
            info!("Parsing trace file: {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open trace file {}", path.display()))?;
            TraceParser::new(BufReader::new(file), patterns, config)
        }
        None => {
            info!("Parsing trace from stdin");
            TraceParser::from_reader(std::io::stdin(), patterns, config)
        }
    };

    let parser_thread = thread::Builder::new()
        .name("parser".to_string())
        .spawn(move || parser.run())
        .context("Failed to spawn parser thread")?;

    let raw = if args.include_raw {
        RawOutput::Events
    } else {
        RawOutput::Discard
    };
    let summary = drain_events(receivers, sink.clone(), raw, &cancel);

    if parser_thread.join().is_err() {
        anyhow::bail!("Parser thread panicked");
    }

    let summary = summary?;
    info!(
        "Parsed {} lines: {} gc, {} scvg, {} unmatched",
        summary.lines, summary.gc, summary.scvg, summary.raw
    );

    Ok(summary)
}

/// Render a summary as a JSON line
pub fn summary_line(summary: &ParseSummary) -> Result<String> {
    serde_json::to_string(summary).context("Failed to serialize summary")
}
