// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON output through serde_json.

use super::RecordFormatter;
use crate::value::{ExportedRecord, Value};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// JSON formatter. Compact output doubles as JSON Lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    /// Pretty print JSON.
    pub pretty: bool,
    /// Add `"<field>_truncated": true` after strings that had no NUL.
    pub show_truncation: bool,
}

impl JsonFormatter {
    /// Create compact JSON formatter.
    pub fn compact() -> Self {
        Self::default()
    }

    fn encode<T: Serialize>(&self, value: &T) -> Vec<u8> {
        // String-keyed maps of integers and strings cannot fail to serialize.
        if self.pretty {
            serde_json::to_vec_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_vec(value).unwrap_or_default()
        }
    }
}

impl RecordFormatter for JsonFormatter {
    fn format(&self, record: &ExportedRecord) -> Vec<u8> {
        let mut out = if self.show_truncation {
            self.encode(&MarkTruncated(record))
        } else {
            self.encode(record)
        };
        out.push(b'\n');
        out
    }
}

/// Record view that emits a `_truncated` sibling after each truncated string.
struct MarkTruncated<'a>(&'a ExportedRecord);

impl Serialize for MarkTruncated<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.0.fields() {
            match value {
                Value::Nested(inner) => map.serialize_entry(name, &MarkTruncated(inner))?,
                _ => map.serialize_entry(name, value)?,
            }
            if value.is_truncated() {
                map.serialize_entry(&format!("{}_truncated", name), &true)?;
            }
        }
        map.end()
    }
}
