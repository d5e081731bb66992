//! JSON-lines event writer.
//!
//! One serialized [`TraceEvent`] per line, shared between drain threads.

use crate::parser::trace::TraceEvent;
use crate::utils::error::SinkError;
use log::debug;
use std::io::Write;
use std::sync::Mutex;

/// Thread-safe line writer for events and passthrough text
///
/// Lines from different threads never interleave mid-line.
#[derive(Debug)]
pub struct EventSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> EventSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Write one event as a JSON line
    ///
    /// **Public** - used by the run and parse commands
    ///
    /// # Errors
    /// * `SinkError::Serialize` - event could not be serialized
    /// * `SinkError::Write` - I/O error on the underlying writer
    pub fn write_event(&self, event: &TraceEvent) -> Result<(), SinkError> {
        let json = event_to_string(event)?;
        self.write_line(&json)
    }

    /// Write a line verbatim, appending a newline
    pub fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        debug!("Closing event sink");
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Serialize an event to a compact JSON string
pub fn event_to_string(event: &TraceEvent) -> Result<String, SinkError> {
    Ok(serde_json::to_string(event)?)
}

/// Parse a JSON line produced by [`EventSink::write_event`]
pub fn event_from_str(line: &str) -> Result<TraceEvent, SinkError> {
    Ok(serde_json::from_str(line)?)
}
