//! Output writers for trace events.
//!
//! This module handles writing parsed events as JSON lines and forwarding
//! unmatched lines unchanged.

pub mod json;

// Re-export main functions
pub use json::{event_from_str, event_to_string, EventSink};
