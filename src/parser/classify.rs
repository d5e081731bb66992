//! Single-line classification.
//!
//! Priority is fixed: the active GC grammar first, then the scavenger
//! grammar, otherwise the line is raw. Only one GC grammar is active per
//! classifier.

use super::fields::extract_fields;
use super::patterns::{GcFormat, TracePatterns};
use super::trace::{GcTrace, ScvgTrace, TraceEvent};
use log::debug;
use regex::Regex;

/// Classifier bound to one resolved GC grammar
#[derive(Debug, Clone, Copy)]
pub struct LineClassifier<'a> {
    gc: &'a Regex,
    scvg: &'a Regex,
    format: GcFormat,
}

impl<'a> LineClassifier<'a> {
    pub fn new(patterns: &'a TracePatterns, format: GcFormat) -> Self {
        Self {
            gc: patterns.gc(format),
            scvg: patterns.scvg(),
            format,
        }
    }

    pub fn format(&self) -> GcFormat {
        self.format
    }

    /// Classify one line into exactly one event
    ///
    /// **Public** - pure entry point, no channels involved
    ///
    /// A line that matches a grammar but lacks a required numeric field is
    /// demoted to `TraceEvent::Raw` instead of failing.
    pub fn classify(&self, line: &str) -> TraceEvent {
        if let Some(caps) = self.gc.captures(line) {
            let fields = extract_fields(self.gc, &caps);
            if let Some(trace) = GcTrace::from_fields(&fields) {
                return TraceEvent::Gc(trace);
            }
            debug!("GC line without heap size, passing through: {}", line);
        } else if let Some(caps) = self.scvg.captures(line) {
            let fields = extract_fields(self.scvg, &caps);
            if let Some(trace) = ScvgTrace::from_fields(&fields) {
                return TraceEvent::Scvg(trace);
            }
            debug!("scvg line with missing fields, passing through: {}", line);
        }

        TraceEvent::Raw {
            line: line.to_string(),
        }
    }
}
