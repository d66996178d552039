// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream configuration.

use crate::decode::{DecoderConfig, Endianness};
use crate::export::{ExportFormat, SerializerOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of one [`EventStream`](crate::EventStream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Struct whose layout decodes every frame of this stream.
    pub struct_name: String,
    /// Serialize records before handing them to the sink.
    pub format: Option<ExportFormat>,
    /// Formatting options used when `format` is set.
    pub serializer: SerializerOptions,
    /// Decoder settings.
    pub decoder: DecoderConfig,
    /// How long one source poll may block before the stop flag is checked again.
    pub poll_timeout_ms: u64,
    /// Log a drop at `warn` on the first one and then every N drops.
    pub drop_warn_every: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            struct_name: String::new(),
            format: None,
            serializer: SerializerOptions::default(),
            decoder: DecoderConfig::default(),
            poll_timeout_ms: 100,
            drop_warn_every: 1024,
        }
    }
}

impl StreamConfig {
    /// Create a new builder.
    pub fn builder(struct_name: impl Into<String>) -> StreamConfigBuilder {
        StreamConfigBuilder {
            struct_name: struct_name.into(),
            ..Default::default()
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Builder for StreamConfig.
#[derive(Debug, Default)]
pub struct StreamConfigBuilder {
    struct_name: String,
    format: Option<ExportFormat>,
    serializer: Option<SerializerOptions>,
    byte_order: Option<Endianness>,
    poll_timeout_ms: Option<u64>,
    drop_warn_every: Option<u64>,
}

impl StreamConfigBuilder {
    /// Serialize records in this format.
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set formatting options.
    pub fn serializer(mut self, options: SerializerOptions) -> Self {
        self.serializer = Some(options);
        self
    }

    /// Pretty-print JSON output.
    pub fn pretty_json(mut self, pretty: bool) -> Self {
        let mut options = self.serializer.take().unwrap_or_default();
        options.pretty_json = pretty;
        self.serializer = Some(options);
        self
    }

    /// Emit (or suppress) the CSV header row.
    pub fn csv_header(mut self, header: bool) -> Self {
        let mut options = self.serializer.take().unwrap_or_default();
        options.csv_header = header;
        self.serializer = Some(options);
        self
    }

    /// Mark truncated strings in text output.
    pub fn show_truncation(mut self, show: bool) -> Self {
        let mut options = self.serializer.take().unwrap_or_default();
        options.show_truncation = show;
        self.serializer = Some(options);
        self
    }

    /// Byte order of incoming frames.
    pub fn byte_order(mut self, order: Endianness) -> Self {
        self.byte_order = Some(order);
        self
    }

    /// Source poll timeout.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Warn on the first drop and then every `n` drops.
    pub fn drop_warn_every(mut self, n: u64) -> Self {
        self.drop_warn_every = Some(n.max(1));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> StreamConfig {
        let defaults = StreamConfig::default();
        StreamConfig {
            struct_name: self.struct_name,
            format: self.format,
            serializer: self.serializer.unwrap_or(defaults.serializer),
            decoder: DecoderConfig {
                byte_order: self.byte_order.unwrap_or_default(),
            },
            poll_timeout_ms: self.poll_timeout_ms.unwrap_or(defaults.poll_timeout_ms),
            drop_warn_every: self.drop_warn_every.unwrap_or(defaults.drop_warn_every),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert!(config.format.is_none());
        assert_eq!(config.decoder.byte_order, Endianness::Native);
        assert_eq!(config.poll_timeout(), Duration::from_millis(100));
        assert!(config.serializer.csv_header);
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::builder("event")
            .format(ExportFormat::Csv)
            .csv_header(false)
            .show_truncation(true)
            .byte_order(Endianness::Big)
            .poll_timeout(Duration::from_millis(5))
            .build();

        assert_eq!(config.struct_name, "event");
        assert_eq!(config.format, Some(ExportFormat::Csv));
        assert!(!config.serializer.csv_header);
        assert!(config.serializer.show_truncation);
        assert_eq!(config.decoder.byte_order, Endianness::Big);
        assert_eq!(config.poll_timeout_ms, 5);
        assert_eq!(config.drop_warn_every, 1024);
    }

    #[test]
    fn test_config_from_json() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "struct_name": "event", "format": "jsonl", "decoder": { "byte_order": "little" } }"#,
        )
        .unwrap();
        assert_eq!(config.format, Some(ExportFormat::JsonLines));
        assert_eq!(config.decoder.byte_order, Endianness::Little);
        assert_eq!(config.poll_timeout_ms, 100);
    }
}
