//! Trace line parsing.
//!
//! This module handles:
//! - Compiling the GC and scavenger grammars
//! - Extracting named numeric captures
//! - Classifying lines into typed events
//! - Streaming a live source onto single-slot channels

pub mod classify;
pub mod fields;
pub mod patterns;
pub mod stream;
pub mod trace;

// Re-export main types
pub use classify::LineClassifier;
pub use fields::{extract_fields, FieldMap};
pub use patterns::{FormatSelector, GcFormat, TracePatterns};
pub use stream::{CollectedTraces, Completion, ParseSummary, ParserConfig, TraceParser, TraceReceivers};
pub use trace::{GcTrace, ScvgTrace, TraceEvent};
