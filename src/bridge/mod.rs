//! Process bridge.
//!
//! Launches the traced program and exposes the pipe carrying its
//! intercepted output stream.

pub mod process;

// Re-export main types
pub use process::{merge_godebug, ProcessBridge, Stream};
