// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record serializers: text, JSON, JSON lines, CSV.
//!
//! Every format walks the record in declaration order and terminates its
//! output with a newline, so serialized records can be written back to back.

mod csv;
mod json;
mod text;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::error::UnsupportedFormatError;
use crate::value::ExportedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format for exported records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `struct k=v k=v` (human-readable).
    #[default]
    Text,
    /// One JSON document per record.
    Json,
    /// JSON Lines (always compact).
    #[serde(alias = "jsonl")]
    JsonLines,
    /// Header row plus value row, nested fields as dotted columns.
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = UnsupportedFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "json-lines" | "ndjson" => Ok(Self::JsonLines),
            "csv" | "columnar" => Ok(Self::Csv),
            _ => Err(UnsupportedFormatError(s.to_string())),
        }
    }
}

/// Formatting options shared by all formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    /// Pretty-print [`ExportFormat::Json`] output.
    pub pretty_json: bool,
    /// Emit the CSV header row before the value row.
    pub csv_header: bool,
    /// Mark strings that filled their array without a NUL: a `(truncated)`
    /// suffix in text, a `<field>_truncated: true` sibling key in JSON, and
    /// a `<column>_truncated` column after every string column in CSV.
    pub show_truncation: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            pretty_json: false,
            csv_header: true,
            show_truncation: false,
        }
    }
}

/// Renders one record to bytes.
pub trait RecordFormatter {
    fn format(&self, record: &ExportedRecord) -> Vec<u8>;
}

/// Create a formatter for the given output format.
pub fn create_formatter(
    format: ExportFormat,
    options: &SerializerOptions,
) -> Box<dyn RecordFormatter + Send + Sync> {
    match format {
        ExportFormat::Text => Box::new(TextFormatter {
            show_truncation: options.show_truncation,
        }),
        ExportFormat::Json => Box::new(JsonFormatter {
            pretty: options.pretty_json,
            show_truncation: options.show_truncation,
        }),
        ExportFormat::JsonLines => Box::new(JsonFormatter {
            pretty: false,
            show_truncation: options.show_truncation,
        }),
        ExportFormat::Csv => Box::new(CsvFormatter {
            header: options.csv_header,
            show_truncation: options.show_truncation,
        }),
    }
}

/// Serializer front-end holding the formatting options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportSerializer {
    options: SerializerOptions,
}

impl ExportSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// Render `record` in `format`. Never fails.
    pub fn serialize(&self, record: &ExportedRecord, format: ExportFormat) -> Vec<u8> {
        create_formatter(format, &self.options).format(record)
    }
}

/// Render `record` in `format` with default options.
pub fn serialize(record: &ExportedRecord, format: ExportFormat) -> Vec<u8> {
    ExportSerializer::new().serialize(record, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample() -> ExportedRecord {
        ExportedRecord::new("event")
            .with("ts", Value::unsigned(8, 123_456_789))
            .with("pid", Value::signed(4, 42))
            .with("comm", Value::str("cat"))
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("JSONL".parse::<ExportFormat>(), Ok(ExportFormat::JsonLines));
        assert_eq!("columnar".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!(
            "xml".parse::<ExportFormat>(),
            Err(UnsupportedFormatError("xml".into()))
        );
    }

    #[test]
    fn test_format_display_round_trip() {
        for format in [
            ExportFormat::Text,
            ExportFormat::Json,
            ExportFormat::JsonLines,
            ExportFormat::Csv,
        ] {
            assert_eq!(format.to_string().parse::<ExportFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_serialize_every_format() {
        let record = sample();
        assert_eq!(
            serialize(&record, ExportFormat::Text),
            b"event ts=123456789 pid=42 comm=\"cat\"\n"
        );
        assert_eq!(
            serialize(&record, ExportFormat::JsonLines),
            b"{\"ts\":123456789,\"pid\":42,\"comm\":\"cat\"}\n"
        );
        assert_eq!(
            serialize(&record, ExportFormat::Csv),
            b"ts,pid,comm\n123456789,42,cat\n"
        );
    }

    #[test]
    fn test_create_formatter_honours_options() {
        let options = SerializerOptions {
            csv_header: false,
            ..Default::default()
        };
        let formatter = create_formatter(ExportFormat::Csv, &options);
        assert_eq!(formatter.format(&sample()), b"123456789,42,cat\n");
    }

    #[test]
    fn test_truncation_survives_every_format() {
        let record = ExportedRecord::new("event")
            .with("pid", Value::signed(4, 1))
            .with(
                "comm",
                Value::Str {
                    bytes: b"abcd".to_vec(),
                    truncated: true,
                },
            );
        let serializer = ExportSerializer::with_options(SerializerOptions {
            show_truncation: true,
            ..Default::default()
        });
        assert_eq!(
            serializer.serialize(&record, ExportFormat::Text),
            b"event pid=1 comm=\"abcd\"(truncated)\n"
        );
        assert_eq!(
            serializer.serialize(&record, ExportFormat::JsonLines),
            b"{\"pid\":1,\"comm\":\"abcd\",\"comm_truncated\":true}\n"
        );
        assert_eq!(
            serializer.serialize(&record, ExportFormat::Csv),
            b"pid,comm,comm_truncated\n1,abcd,true\n"
        );
        // off by default
        assert_eq!(
            serialize(&record, ExportFormat::JsonLines),
            b"{\"pid\":1,\"comm\":\"abcd\"}\n"
        );
    }
}
