use crate::parser::patterns::{CURRENT_GC_PATTERN, LEGACY_GC_PATTERN, SCVG_PATTERN};
use crate::utils::config::{EVENT_SCHEMA_VERSION, GCTRACE_SWITCH, GODEBUG_VAR};

/// Display the trace grammars
pub fn display_patterns() {
    println!("GC trace grammars");
    println!();
    println!("legacy (Go 1.4 and earlier):");
    println!("  {}", LEGACY_GC_PATTERN);
    println!();
    println!("current (Go 1.5 and later):");
    println!("  {}", CURRENT_GC_PATTERN);
    println!();
    println!("scavenger:");
    println!("  {}", SCVG_PATTERN);
}

/// Display version information
pub fn display_version() {
    println!("gctrace-bridge v{}", env!("CARGO_PKG_VERSION"));
    println!("Event Schema: v{}", EVENT_SCHEMA_VERSION);
    println!();
    println!("Runs a program with {}={} and streams its GC trace as JSON events.", GODEBUG_VAR, GCTRACE_SWITCH);
}
