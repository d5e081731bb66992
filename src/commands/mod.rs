//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the bridge, parser and output components.

pub mod drain;
pub mod models;
pub mod parse;
pub mod run;
pub mod utils;

// Re-export main command functions
pub use models::{OutputTarget, ParseArgs, RunArgs};
pub use parse::{execute_parse, parse_to_sink, summary_line};
pub use run::{execute_run, run_with_sinks, validate_args};
