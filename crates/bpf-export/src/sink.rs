// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record destinations: closures, channels, stdout/stderr, files.

use crate::export::{serialize, ExportFormat};
use crate::value::ExportedRecord;
use chrono::{DateTime, Utc};
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// A decoded frame on its way to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub record: ExportedRecord,
    /// Serialized form, when the stream has an export format configured.
    pub serialized: Option<Vec<u8>>,
    pub source_id: u32,
    pub received_at: DateTime<Utc>,
}

/// Consumer of decoded events.
pub trait EventSink: Send {
    /// Accept one event.
    fn deliver(&mut self, event: DecodedEvent) -> io::Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EventSink for Box<dyn EventSink> {
    fn deliver(&mut self, event: DecodedEvent) -> io::Result<()> {
        (**self).deliver(event)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Sink calling a closure for each event.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(DecodedEvent) -> io::Result<()> + Send,
{
    fn deliver(&mut self, event: DecodedEvent) -> io::Result<()> {
        (self.0)(event)
    }
}

/// Sink forwarding events over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<DecodedEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<DecodedEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn deliver(&mut self, event: DecodedEvent) -> io::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "event channel disconnected"))
    }
}

/// Sink writing serialized records to any `Write`.
///
/// Events without a serialized form are rendered as text.
pub struct WriterSink<W: Write + Send> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn deliver(&mut self, event: DecodedEvent) -> io::Result<()> {
        let bytes = match event.serialized {
            Some(bytes) => bytes,
            None => serialize(&event.record, ExportFormat::Text),
        };
        self.writer.write_all(&bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Where a writer sink sends its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputConfig {
    /// Write to stdout.
    #[default]
    Stdout,
    /// Write to stderr.
    Stderr,
    /// Write to a file, truncating it unless `append` is set.
    File { path: PathBuf, append: bool },
}

/// Create a writer sink from configuration.
pub fn create_sink(config: &OutputConfig) -> io::Result<Box<dyn EventSink>> {
    match config {
        OutputConfig::Stdout => Ok(Box::new(WriterSink::new(io::stdout()))),
        OutputConfig::Stderr => Ok(Box::new(WriterSink::new(io::stderr()))),
        OutputConfig::File { path, append } => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file: File = OpenOptions::new()
                .create(true)
                .write(true)
                .append(*append)
                .truncate(!*append)
                .open(path)?;
            Ok(Box::new(WriterSink::new(BufWriter::new(file))))
        }
    }
}
