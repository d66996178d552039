// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Columnar output: RFC 4180 CSV with dotted columns for nested fields.

use super::RecordFormatter;
use crate::value::{ExportedRecord, Value};

/// CSV formatter.
#[derive(Debug, Clone, Copy)]
pub struct CsvFormatter {
    /// Emit the header row before the value row.
    pub header: bool,
    /// Follow every string column with a `<column>_truncated` column
    /// (`true`/`false`). Depends only on the layout, so the header stays
    /// the same for every record of a struct.
    pub show_truncation: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self {
            header: true,
            show_truncation: false,
        }
    }
}

impl CsvFormatter {
    /// Header row for `record` (`ts,pid,task.comm`).
    pub fn header_row(&self, record: &ExportedRecord) -> String {
        let mut columns = Vec::new();
        for (path, value) in record.leaves() {
            columns.push(quote(&path));
            if self.show_truncation && matches!(value, Value::Str { .. }) {
                columns.push(quote(&format!("{}_truncated", path)));
            }
        }
        columns.join(",")
    }

    /// Value row for `record`.
    pub fn value_row(&self, record: &ExportedRecord) -> String {
        let mut cells = Vec::new();
        for (_, value) in record.leaves() {
            cells.push(cell(value));
            if self.show_truncation && matches!(value, Value::Str { .. }) {
                cells.push(value.is_truncated().to_string());
            }
        }
        cells.join(",")
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Int { .. } => value.int_string().unwrap_or_default(),
        Value::Str { bytes, .. } => quote(&String::from_utf8_lossy(bytes)),
        Value::Enum { name: Some(name), .. } => quote(name),
        Value::Enum { .. } => value.int_string().unwrap_or_default(),
        // leaves() never yields nested records
        Value::Nested(_) => String::new(),
    }
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl RecordFormatter for CsvFormatter {
    fn format(&self, record: &ExportedRecord) -> Vec<u8> {
        let mut out = String::new();
        if self.header {
            out.push_str(&self.header_row(record));
            out.push('\n');
        }
        out.push_str(&self.value_row(record));
        out.push('\n');
        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_nested_columns() {
        let task = ExportedRecord::new("task")
            .with("pid", Value::signed(4, 7))
            .with("comm", Value::str("a,b"));
        let record = ExportedRecord::new("e")
            .with("cpu", Value::unsigned(2, 1))
            .with("task", Value::Nested(task));
        let out = CsvFormatter::default().format(&record);
        assert_eq!(out, b"cpu,task.pid,task.comm\n1,7,\"a,b\"\n");
    }

    #[test]
    fn test_truncation_columns() {
        let task = ExportedRecord::new("task").with(
            "comm",
            Value::Str {
                bytes: b"abcd".to_vec(),
                truncated: true,
            },
        );
        let record = ExportedRecord::new("e")
            .with("path", Value::str("/tmp"))
            .with("task", Value::Nested(task));
        let formatter = CsvFormatter {
            show_truncation: true,
            ..Default::default()
        };
        assert_eq!(
            formatter.format(&record),
            b"path,path_truncated,task.comm,task.comm_truncated\n/tmp,false,abcd,true\n"
        );
    }
}
