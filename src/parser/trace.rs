//! Typed trace events produced by the parser.
//!
//! Events are plain immutable values. Each one is built from exactly one
//! source line and owned by whichever consumer receives it.

use super::fields::FieldMap;
use crate::utils::config::{HEAP_FIELD, SCVG_FIELDS};
use serde::{Deserialize, Serialize};

/// One GC cycle as reported by a `gctrace=1` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcTrace {
    /// Heap size in MB (post-collection for the legacy grammar, heap goal
    /// for the current one)
    pub heap_mb: i64,
}

impl GcTrace {
    /// Build from extracted fields
    ///
    /// # Returns
    /// `None` when the `Heap1` capture is missing
    pub fn from_fields(fields: &FieldMap) -> Option<Self> {
        Some(Self {
            heap_mb: *fields.get(HEAP_FIELD)?,
        })
    }
}

/// One scavenger pass as reported by a `scvg` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScvgTrace {
    pub inuse_mb: i64,
    pub idle_mb: i64,
    pub sys_mb: i64,
    pub released_mb: i64,
    pub consumed_mb: i64,
}

impl ScvgTrace {
    /// Build from extracted fields
    ///
    /// # Returns
    /// `None` unless all five scavenger captures are present
    pub fn from_fields(fields: &FieldMap) -> Option<Self> {
        let [inuse, idle, sys, released, consumed] = SCVG_FIELDS;

        Some(Self {
            inuse_mb: *fields.get(inuse)?,
            idle_mb: *fields.get(idle)?,
            sys_mb: *fields.get(sys)?,
            released_mb: *fields.get(released)?,
            consumed_mb: *fields.get(consumed)?,
        })
    }
}

/// Classification of a single source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Gc(GcTrace),
    Scvg(ScvgTrace),
    Raw { line: String },
}

impl TraceEvent {
    /// Channel name used in logs and error messages
    pub fn category(&self) -> &'static str {
        match self {
            Self::Gc(_) => "gc",
            Self::Scvg(_) => "scvg",
            Self::Raw { .. } => "raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_trace_requires_heap() {
        let mut fields = FieldMap::new();
        assert_eq!(GcTrace::from_fields(&fields), None);

        fields.insert("Heap1".to_string(), 42);
        assert_eq!(GcTrace::from_fields(&fields), Some(GcTrace { heap_mb: 42 }));
    }

    #[test]
    fn test_scvg_trace_requires_all_fields() {
        let mut fields = FieldMap::new();
        for (i, name) in ["inuse", "idle", "sys", "released"].iter().enumerate() {
            fields.insert(name.to_string(), i as i64);
        }
        assert_eq!(ScvgTrace::from_fields(&fields), None);

        fields.insert("consumed".to_string(), 9);
        let trace = ScvgTrace::from_fields(&fields).unwrap();
        assert_eq!(trace.inuse_mb, 0);
        assert_eq!(trace.released_mb, 3);
        assert_eq!(trace.consumed_mb, 9);
    }

    #[test]
    fn test_event_json_shape() {
        let event = TraceEvent::Gc(GcTrace { heap_mb: 7 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "gc", "heap_mb": 7 }));
    }
}
