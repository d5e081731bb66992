//! Line grammars for Go runtime trace output.
//!
//! Two mutually exclusive GC grammars exist: the legacy one printed by
//! Go 1.4 and earlier, and the current one introduced with Go 1.5.
//! The scavenger grammar is shared by both.
//!
//! Patterns are compiled once into a [`TracePatterns`] value and handed to
//! each parser explicitly, so independent parsers never share hidden state.

use crate::utils::error::PatternError;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// GC line grammar printed by Go 1.4 and earlier
pub const LEGACY_GC_PATTERN: &str = r"gc\d+\(\d+\): ([\d.]+\+?)+ us, \d+ -> (?P<Heap1>\d+) MB, \d+ \(\d+-\d+\) objects,( \d+ goroutines,)? \d+/\d+/\d+ sweeps, \d+\(\d+\) handoff, \d+\(\d+\) steal, \d+/\d+/\d+ yields";

/// GC line grammar printed by Go 1.5 and later
pub const CURRENT_GC_PATTERN: &str = r"gc \d+ @[\d.]+s \d+%: ([\d.]+\+?)+ ms clock, ([\d.+/]+?)+ ms cpu, \d+->\d+->\d+ MB, (?P<Heap1>\d+) MB goal, \d+ P";

/// Scavenger line grammar
pub const SCVG_PATTERN: &str = r"scvg\d+: inuse: (?P<inuse>\d+), idle: (?P<idle>\d+), sys: (?P<sys>\d+), released: (?P<released>\d+), consumed: (?P<consumed>\d+) \(MB\)";

/// Which GC grammar a child process prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcFormat {
    /// `gc76(1): ... us, 1 -> 3 MB, ...` (Go 1.4 and earlier)
    Legacy,
    /// `gc 47 @1.101s 13%: ... MB goal, 4 P` (Go 1.5 and later)
    Current,
}

impl GcFormat {
    /// Pick the grammar for a child built with the given Go version
    ///
    /// **Public** - callers pass the *child's* version, never the version
    /// this crate was built with.
    ///
    /// # Arguments
    /// * `version` - Version string as printed by `go version`, e.g. `go1.4.2`
    ///
    /// # Returns
    /// `Legacy` for Go 1.0 through 1.4, `Current` for everything else,
    /// including development builds and strings that cannot be parsed.
    pub fn from_go_version(version: &str) -> Self {
        match parse_major_minor(version) {
            Some((1, minor)) if minor < 5 => Self::Legacy,
            Some(_) => Self::Current,
            None => {
                debug!("Unrecognised Go version {:?}, assuming current GC format", version);
                Self::Current
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Current => "current",
        }
    }
}

impl std::str::FromStr for GcFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "go1.4" => Ok(Self::Legacy),
            "current" | "go1.5" => Ok(Self::Current),
            other => Err(format!("unknown GC format: {}", other)),
        }
    }
}

impl std::fmt::Display for GcFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a parser decides on its GC grammar
///
/// Resolution happens once, when the parser starts running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelector {
    /// Use this grammar regardless of version
    Explicit(GcFormat),
    /// Derive the grammar from the child's Go version string
    GoVersion(String),
}

impl Default for FormatSelector {
    fn default() -> Self {
        Self::Explicit(GcFormat::Current)
    }
}

impl FormatSelector {
    pub fn resolve(&self) -> GcFormat {
        match self {
            Self::Explicit(format) => *format,
            Self::GoVersion(version) => GcFormat::from_go_version(version),
        }
    }
}

/// Compiled trace grammars
///
/// Build once with [`TracePatterns::new`] and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TracePatterns {
    legacy_gc: Regex,
    current_gc: Regex,
    scvg: Regex,
}

impl TracePatterns {
    /// Compile the three grammars
    ///
    /// # Errors
    /// * `PatternError::Compile` - a grammar failed to compile
    pub fn new() -> Result<Self, PatternError> {
        Ok(Self {
            legacy_gc: compile("legacy gc", LEGACY_GC_PATTERN)?,
            current_gc: compile("current gc", CURRENT_GC_PATTERN)?,
            scvg: compile("scvg", SCVG_PATTERN)?,
        })
    }

    /// GC grammar for the given format
    pub fn gc(&self, format: GcFormat) -> &Regex {
        match format {
            GcFormat::Legacy => &self.legacy_gc,
            GcFormat::Current => &self.current_gc,
        }
    }

    pub fn scvg(&self) -> &Regex {
        &self.scvg
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|source| PatternError::Compile { name, source })
}

/// Extract `(major, minor)` from strings like `go1.4.2`, `go1.21rc1` or `1.5`
fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix("go").unwrap_or(trimmed);

    let mut parts = trimmed.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor_part = parts.next()?;
    let digits: String = minor_part.chars().take_while(|c| c.is_ascii_digit()).collect();
    let minor = digits.parse().ok()?;

    Some((major, minor))
}
