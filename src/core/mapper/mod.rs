// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Field Mapping
//!
//! Turns a document's wire-tagged field tree into a flat record according
//! to a configured ordered mapping table.
//!
//! ```text
//! wire fields → extract_path (per mapping entry) → decode → flat Record
//! ```
//!
//! Dotted paths (`profile.address.city`) walk the tree one segment at a
//! time through `mapValue` fields only. Absent intermediate segments
//! resolve to "absent", not an error. An explicit wire null and an absent
//! path are indistinguishable in the output record: both omit the
//! destination key. That quirk is preserved and covered by a named test.

use serde_json::{Map, Value};

use crate::core::config::FieldMapping;
use crate::core::value::decode_value;

/// A flat destination record: destination field name → decoded value.
///
/// Ordered (serde_json `preserve_order`), built fresh per document.
pub type Record = Map<String, Value>;

/// Resolve a dotted path against a wire-tagged field tree.
///
/// Returns the decoded leaf value, or `None` when any segment is absent.
/// A single-segment path is a direct top-level field lookup.
pub fn extract_path(fields: &Map<String, Value>, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = fields.get(first)?;

    for segment in segments {
        // Intermediate segments are only traversable through map fields
        current = current
            .get("mapValue")
            .and_then(|m| m.get("fields"))
            .and_then(|f| f.get(segment))?;
    }

    Some(decode_value(current))
}

/// Apply an ordered mapping table to a document's field tree.
///
/// Each entry is independent; the destination key is assigned only when
/// the source path resolves to a non-null decoded value. Unresolvable or
/// null sources are omitted entirely, never defaulted to null.
pub fn map_document(fields: &Map<String, Value>, mapping: &[FieldMapping]) -> Record {
    let mut record = Record::new();
    for entry in mapping {
        if let Some(value) = extract_path(fields, &entry.source) {
            if !value.is_null() {
                record.insert(entry.dest.clone(), value);
            }
        }
    }
    record
}
