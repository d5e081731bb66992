//! Configuration and constants for the bridge and parser.

use std::time::Duration;

/// Environment variable read by the Go runtime for debug switches
pub const GODEBUG_VAR: &str = "GODEBUG";

/// Switch that turns on one trace line per GC cycle (and scvg lines)
pub const GCTRACE_SWITCH: &str = "gctrace=1";

/// Environment variable the CLI reads the child's Go version from
pub const GO_VERSION_ENV: &str = "GCTRACE_GO_VERSION";

/// Slots per event channel. One slot means at most one unconsumed event
/// per category, so a chatty child cannot grow an unbounded backlog.
pub const CHANNEL_CAPACITY: usize = 1;

/// How often a blocked send or child wait re-checks for cancellation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// Required capture names
pub const HEAP_FIELD: &str = "Heap1";
pub const SCVG_FIELDS: [&str; 5] = ["inuse", "idle", "sys", "released", "consumed"];

/// Current JSON event schema version
pub const EVENT_SCHEMA_VERSION: &str = "1.0.0";
