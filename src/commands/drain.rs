//! Channel draining shared by the run and parse commands.
//!
//! Each event channel gets its own thread so a slow category never holds
//! back the others.

use crate::output::EventSink;
use crate::parser::{ParseSummary, TraceEvent, TraceReceivers};
use crate::utils::cancel::CancellationToken;
use crate::utils::error::SinkError;
use anyhow::{Context, Result};
use log::{debug, error};
use std::io::Write;
use std::sync::Arc;
use std::thread;

/// Sink type used by the commands
pub type DynSink = EventSink<Box<dyn Write + Send>>;

/// What to do with lines that matched no grammar
pub enum RawOutput {
    /// Write the line verbatim to this sink
    Forward(Arc<DynSink>),
    /// Write a `raw` JSON event to the event sink
    Events,
    /// Count and drop
    Discard,
}

/// Drain all receivers into sinks until the parser completes
///
/// **Public** - used by execute_run and execute_parse
///
/// A sink failure cancels the token so the parser and child wind down.
///
/// # Returns
/// The parser's summary, or the first sink or parser error
pub fn drain_events(
    receivers: TraceReceivers,
    events: Arc<DynSink>,
    raw: RawOutput,
    cancel: &CancellationToken,
) -> Result<ParseSummary> {
    let TraceReceivers { gc, scvg, raw: raw_rx, done } = receivers;

    let gc_worker = {
        let sink = events.clone();
        let cancel = cancel.clone();
        spawn_drain("gc-drain", cancel, move || {
            for trace in gc.iter() {
                sink.write_event(&TraceEvent::Gc(trace))?;
            }
            Ok(())
        })?
    };

    let scvg_worker = {
        let sink = events.clone();
        let cancel = cancel.clone();
        spawn_drain("scvg-drain", cancel, move || {
            for trace in scvg.iter() {
                sink.write_event(&TraceEvent::Scvg(trace))?;
            }
            Ok(())
        })?
    };

    let raw_worker = spawn_drain("raw-drain", cancel.clone(), move || {
        for line in raw_rx.iter() {
            match &raw {
                RawOutput::Forward(sink) => sink.write_line(&line)?,
                RawOutput::Events => events.write_event(&TraceEvent::Raw { line })?,
                RawOutput::Discard => {}
            }
        }
        Ok(())
    })?;

    let drained = [gc_worker, scvg_worker, raw_worker]
        .into_iter()
        .map(|worker| {
            worker
                .join()
                .unwrap_or_else(|_| Err(SinkError::Write(std::io::Error::other("drain thread panicked"))))
        })
        .collect::<Vec<_>>();

    let completion = done
        .recv()
        .context("Parser stopped without signalling completion")?;

    for result in drained {
        result.context("Failed to write trace output")?;
    }

    let summary = completion.context("Trace parsing failed")?;
    debug!("Drained {} lines", summary.lines);

    Ok(summary)
}

/// Spawn a named drain thread that cancels on failure
///
/// **Private** - internal helper for drain_events
fn spawn_drain<F>(
    name: &str,
    cancel: CancellationToken,
    body: F,
) -> Result<thread::JoinHandle<Result<(), SinkError>>>
where
    F: FnOnce() -> Result<(), SinkError> + Send + 'static,
{
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let result = body();
            if let Err(e) = &result {
                error!("{} failed: {}", thread_name, e);
                cancel.cancel();
            }
            result
        })
        .with_context(|| format!("Failed to spawn {} thread", name))
}
