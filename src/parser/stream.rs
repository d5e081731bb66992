//! Streaming trace parser.
//!
//! Reads a line-oriented source (normally the read end of the bridge pipe),
//! classifies every line and publishes the result on one of three
//! single-slot channels. Publishing blocks while the previous event of the
//! same category is still unconsumed. This backpressure is intentional: it
//! bounds memory no matter how fast the child writes.
//!
//! Each channel must be drained on its own, otherwise a full slot in one
//! category stalls the others. [`TraceReceivers::collect`] does this for
//! callers that only need the final result.

use super::classify::LineClassifier;
use super::patterns::{FormatSelector, GcFormat, TracePatterns};
use super::trace::{GcTrace, ScvgTrace, TraceEvent};
use crate::utils::cancel::CancellationToken;
use crate::utils::config::{CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL};
use crate::utils::error::ParseError;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SPIN_ATTEMPTS: u32 = 64;
const MIN_BACKOFF: Duration = Duration::from_micros(50);

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub format: FormatSelector,
    pub poll_interval: Duration,
    pub cancel: CancellationToken,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: FormatSelector::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, format: FormatSelector) -> Self {
        self.format = format;
        self
    }

    pub fn with_format(mut self, format: GcFormat) -> Self {
        self.format = FormatSelector::Explicit(format);
        self
    }

    pub fn with_go_version(mut self, version: impl Into<String>) -> Self {
        self.format = FormatSelector::GoVersion(version.into());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Per-category line counts for one completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub lines: u64,
    pub gc: u64,
    pub scvg: u64,
    pub raw: u64,
}

/// Outcome carried by the completion signal
pub type Completion = Result<ParseSummary, ParseError>;

/// Consumer side of a parser
///
/// `done` fires exactly once, after the last event has been published.
#[derive(Debug)]
pub struct TraceReceivers {
    pub gc: Receiver<GcTrace>,
    pub scvg: Receiver<ScvgTrace>,
    pub raw: Receiver<String>,
    pub done: Receiver<Completion>,
}

struct TraceSenders {
    gc: SyncSender<GcTrace>,
    scvg: SyncSender<ScvgTrace>,
    raw: SyncSender<String>,
    done: SyncSender<Completion>,
}

/// Everything a parser published, gathered after it finished
#[derive(Debug)]
pub struct CollectedTraces {
    pub gc: Vec<GcTrace>,
    pub scvg: Vec<ScvgTrace>,
    pub raw: Vec<String>,
    pub completion: Completion,
}

impl TraceReceivers {
    /// Drain every channel until the parser finishes
    ///
    /// **Public** - convenience for batch callers and tests
    ///
    /// Spawns one drain thread per event channel so that no category can
    /// stall the others, then waits for the completion signal.
    pub fn collect(self) -> CollectedTraces {
        let TraceReceivers { gc, scvg, raw, done } = self;

        let gc = thread::spawn(move || gc.iter().collect::<Vec<_>>());
        let scvg = thread::spawn(move || scvg.iter().collect::<Vec<_>>());
        let raw = thread::spawn(move || raw.iter().collect::<Vec<_>>());

        // A parser that vanished without signalling is treated as a read failure
        let completion = done.recv().unwrap_or_else(|_| {
            Err(ParseError::Read(std::io::Error::other(
                "parser stopped without signalling completion",
            )))
        });

        CollectedTraces {
            gc: gc.join().unwrap_or_default(),
            scvg: scvg.join().unwrap_or_default(),
            raw: raw.join().unwrap_or_default(),
            completion,
        }
    }
}

/// Streaming parser over a line-oriented source
pub struct TraceParser {
    source: Box<dyn BufRead + Send>,
    patterns: Arc<TracePatterns>,
    config: ParserConfig,
    senders: TraceSenders,
}

impl TraceParser {
    /// Create a parser and its receivers
    ///
    /// **Public** - main entry point for streaming parsing
    ///
    /// # Arguments
    /// * `source` - Line-oriented byte source
    /// * `patterns` - Compiled grammars, shared between parsers
    /// * `config` - GC grammar selection, cancellation and polling
    pub fn new(
        source: impl BufRead + Send + 'static,
        patterns: Arc<TracePatterns>,
        config: ParserConfig,
    ) -> (Self, TraceReceivers) {
        let (gc_tx, gc_rx) = sync_channel(CHANNEL_CAPACITY);
        let (scvg_tx, scvg_rx) = sync_channel(CHANNEL_CAPACITY);
        let (raw_tx, raw_rx) = sync_channel(CHANNEL_CAPACITY);
        let (done_tx, done_rx) = sync_channel(1);

        let parser = Self {
            source: Box::new(source),
            patterns,
            config,
            senders: TraceSenders {
                gc: gc_tx,
                scvg: scvg_tx,
                raw: raw_tx,
                done: done_tx,
            },
        };

        let receivers = TraceReceivers {
            gc: gc_rx,
            scvg: scvg_rx,
            raw: raw_rx,
            done: done_rx,
        };

        (parser, receivers)
    }

    /// Same as [`TraceParser::new`] for an unbuffered reader such as a pipe
    pub fn from_reader(
        reader: impl Read + Send + 'static,
        patterns: Arc<TracePatterns>,
        config: ParserConfig,
    ) -> (Self, TraceReceivers) {
        Self::new(BufReader::new(reader), patterns, config)
    }

    /// Parse until end of stream, read error or cancellation
    ///
    /// **Public** - intended to run on its own thread
    ///
    /// Never panics on input. The outcome is delivered once on
    /// `TraceReceivers::done`; all senders are dropped on return so
    /// consumers see their channels close afterwards.
    pub fn run(self) {
        let TraceParser {
            mut source,
            patterns,
            config,
            senders,
        } = self;

        let classifier = LineClassifier::new(&patterns, config.format.resolve());
        info!("Parsing trace stream with {} GC format", classifier.format());

        let completion = pump(&mut *source, &classifier, &config, &senders);

        match &completion {
            Ok(summary) => info!(
                "Trace stream ended: {} lines ({} gc, {} scvg, {} raw)",
                summary.lines, summary.gc, summary.scvg, summary.raw
            ),
            Err(e) => warn!("Trace stream stopped: {}", e),
        }

        // Capacity 1 and sent once, so this never blocks
        if senders.done.send(completion).is_err() {
            debug!("Completion receiver dropped before parser finished");
        }
    }
}

/// Main read-classify-publish loop
///
/// **Private** - internal helper for TraceParser::run
fn pump(
    source: &mut dyn BufRead,
    classifier: &LineClassifier<'_>,
    config: &ParserConfig,
    senders: &TraceSenders,
) -> Completion {
    let mut summary = ParseSummary::default();
    let mut buf = Vec::new();

    loop {
        if config.cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        buf.clear();
        if source.read_until(b'\n', &mut buf)? == 0 {
            // A cancelled child is killed, which also shows up as end of stream
            if config.cancel.is_cancelled() {
                return Err(ParseError::Cancelled);
            }
            return Ok(summary);
        }

        let line = String::from_utf8_lossy(trim_line_ending(&buf));
        summary.lines += 1;

        match classifier.classify(&line) {
            TraceEvent::Gc(trace) => {
                publish(&senders.gc, trace, "gc", config)?;
                summary.gc += 1;
            }
            TraceEvent::Scvg(trace) => {
                publish(&senders.scvg, trace, "scvg", config)?;
                summary.scvg += 1;
            }
            TraceEvent::Raw { line } => {
                publish(&senders.raw, line, "raw", config)?;
                summary.raw += 1;
            }
        }
    }
}

/// Send one item, waiting while the slot is full
///
/// **Private** - polls so that cancellation is observed while blocked.
/// A consumer that keeps up frees the slot within microseconds, so the
/// wait starts with yields and only backs off to sleeping (capped at the
/// configured poll interval) when the consumer is actually behind.
fn publish<T>(
    tx: &SyncSender<T>,
    item: T,
    channel: &'static str,
    config: &ParserConfig,
) -> Result<(), ParseError> {
    let mut pending = item;
    let mut attempts: u32 = 0;
    let mut backoff = MIN_BACKOFF;

    loop {
        if config.cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        match tx.try_send(pending) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(item)) => {
                pending = item;
                attempts += 1;
                if attempts <= SPIN_ATTEMPTS {
                    thread::yield_now();
                } else {
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(config.poll_interval.max(MIN_BACKOFF));
                }
            }
            Err(TrySendError::Disconnected(_)) => return Err(ParseError::Disconnected(channel)),
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
