//! Named-capture extraction.
//!
//! Turns a regex match into a readable map, something like `{ "Heap1": 123 }`.

use log::trace;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Capture name to parsed integer, built per line and then discarded
pub type FieldMap = HashMap<String, i64>;

/// Extract integer-valued named captures from a match
///
/// **Public** - used by the line classifier
///
/// Every capture is paired with the name the pattern declares for it.
/// Unnamed groups (the whole-match slot included) are skipped, as are
/// captures that do not parse as an integer. Neither case is an error.
/// A repeated name overwrites the earlier value.
///
/// # Arguments
/// * `regex` - Pattern that produced the captures
/// * `captures` - Result of `regex.captures(line)`
pub fn extract_fields(regex: &Regex, captures: &Captures<'_>) -> FieldMap {
    let mut fields = FieldMap::new();

    for (name, group) in regex.capture_names().zip(captures.iter()) {
        let (Some(name), Some(group)) = (name, group) else {
            continue;
        };

        match group.as_str().parse::<i64>() {
            Ok(value) => {
                fields.insert(name.to_string(), value);
            }
            Err(_) => trace!("Skipping non-numeric capture {}={:?}", name, group.as_str()),
        }
    }

    fields
}
