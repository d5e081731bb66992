use crate::bridge::Stream;
use crate::parser::FormatSelector;
use std::path::PathBuf;

/// Where a command writes an output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
}

impl From<Stream> for OutputTarget {
    fn from(stream: Stream) -> Self {
        match stream {
            Stream::Stdout => Self::Stdout,
            Stream::Stderr => Self::Stderr,
        }
    }
}

/// Arguments for the run command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Program and its arguments
    pub command: Vec<String>,

    /// Child stream carrying the trace lines
    pub stream: Stream,

    /// GC grammar selection
    pub format: FormatSelector,

    /// Where JSON events go
    pub events_to: OutputTarget,

    /// Extra environment for the child
    pub env: Vec<(String, String)>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            stream: Stream::Stderr,
            format: FormatSelector::default(),
            events_to: OutputTarget::Stdout,
            env: Vec::new(),
        }
    }
}

/// Arguments for the parse command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct ParseArgs {
    /// Saved trace file (None = stdin)
    pub input: Option<PathBuf>,

    /// GC grammar selection
    pub format: FormatSelector,

    /// Emit unmatched lines as `raw` events instead of dropping them
    pub include_raw: bool,
}
