// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable `struct k=v` lines.

use super::RecordFormatter;
use crate::value::{ExportedRecord, Value};
use std::fmt::Write;

/// Text formatter: `event ts=1 comm="cat" task={pid=7}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter {
    /// Append `(truncated)` to strings that had no NUL.
    pub show_truncation: bool,
}

impl TextFormatter {
    fn write_fields(&self, out: &mut String, record: &ExportedRecord) {
        for (i, (name, value)) in record.fields().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(name);
            out.push('=');
            self.write_value(out, value);
        }
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Int { .. } => out.push_str(&value.int_string().unwrap_or_default()),
            Value::Str { bytes, truncated } => {
                let _ = write!(out, "{:?}", String::from_utf8_lossy(bytes));
                if *truncated && self.show_truncation {
                    out.push_str("(truncated)");
                }
            }
            Value::Enum { name: Some(name), .. } => out.push_str(name),
            Value::Enum { .. } => out.push_str(&value.int_string().unwrap_or_default()),
            Value::Nested(inner) => {
                out.push('{');
                self.write_fields(out, inner);
                out.push('}');
            }
        }
    }
}

impl RecordFormatter for TextFormatter {
    fn format(&self, record: &ExportedRecord) -> Vec<u8> {
        let mut out = String::with_capacity(64 + record.len() * 16);
        out.push_str(record.type_name());
        if !record.is_empty() {
            out.push(' ');
        }
        self.write_fields(&mut out, record);
        out.push('\n');
        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_and_escaped() {
        let task = ExportedRecord::new("task")
            .with("pid", Value::signed(4, -1))
            .with("comm", Value::str("a\"b\n"));
        let record = ExportedRecord::new("sched")
            .with("cpu", Value::unsigned(2, 3))
            .with("task", Value::Nested(task))
            .with(
                "state",
                Value::enumeration(None, 4, false, 7),
            );
        let text = String::from_utf8(TextFormatter::default().format(&record)).unwrap();
        assert_eq!(
            text,
            "sched cpu=3 task={pid=-1 comm=\"a\\\"b\\n\"} state=7\n"
        );
    }

    #[test]
    fn test_truncation_marker() {
        let record = ExportedRecord::new("e").with(
            "comm",
            Value::Str {
                bytes: b"abcd".to_vec(),
                truncated: true,
            },
        );
        let plain = TextFormatter::default().format(&record);
        assert_eq!(plain, b"e comm=\"abcd\"\n");

        let marked = TextFormatter {
            show_truncation: true,
        }
        .format(&record);
        assert_eq!(marked, b"e comm=\"abcd\"(truncated)\n");
    }

    #[test]
    fn test_u64_max_is_not_negative() {
        let record = ExportedRecord::new("e").with("v", Value::unsigned(8, u64::MAX));
        let text = TextFormatter::default().format(&record);
        assert_eq!(text, format!("e v={}\n", u64::MAX).into_bytes());
    }
}
