//! gctrace-bridge
//!
//! Launches a program with Go GC tracing switched on, intercepts the stream
//! carrying the trace, and turns `gc` and `scvg` lines into typed events
//! while the program is still running.
//!
//! The pieces:
//! - [`bridge::ProcessBridge`] spawns the child and exposes a pipe
//! - [`parser::TraceParser`] classifies lines onto three single-slot channels
//! - [`output::EventSink`] writes events as JSON lines
//!
//! ```no_run
//! use gctrace_bridge::bridge::{ProcessBridge, Stream};
//! use gctrace_bridge::parser::{ParserConfig, TraceParser, TracePatterns};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let argv = vec!["./server".to_string()];
//! let mut bridge = ProcessBridge::new(&argv, Stream::Stderr)?;
//! let reader = bridge.take_reader().expect("fresh bridge");
//!
//! let patterns = Arc::new(TracePatterns::new()?);
//! let config = ParserConfig::new().with_go_version("go1.22.1");
//! let (parser, receivers) = TraceParser::from_reader(reader, patterns, config);
//!
//! std::thread::spawn(move || bridge.run());
//! std::thread::spawn(move || parser.run());
//!
//! // Drains all three channels until the child exits
//! let traces = receivers.collect();
//! for trace in &traces.gc {
//!     println!("heap: {} MB", trace.heap_mb);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;
