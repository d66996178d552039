// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-frame orchestration: source -> decode -> (serialize) -> sink.
//!
//! One [`EventStream`] drives one transport source on its own thread. A frame
//! that fails to decode is counted, logged and dropped; the loop only ends
//! when the source closes or a [`StopHandle`] is used.

use crate::config::StreamConfig;
use crate::decode::{EventDecoder, RawEvent};
use crate::error::{DecodeError, StreamError};
use crate::export::{ExportFormat, ExportSerializer, SerializerOptions};
use crate::layout::StructLayout;
use crate::metrics::StreamMetrics;
use crate::sink::{DecodedEvent, EventSink};
use crate::types::TypeCatalog;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of one source poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    /// A frame is available.
    Event(RawEvent),
    /// Nothing arrived within the timeout.
    Empty,
    /// The source is exhausted; no more frames will come.
    Closed,
}

/// Producer of raw frames.
pub trait EventSource {
    /// Wait up to `timeout` for the next frame.
    fn poll(&mut self, timeout: Duration) -> SourcePoll;
}

impl EventSource for Receiver<RawEvent> {
    fn poll(&mut self, timeout: Duration) -> SourcePoll {
        match self.recv_timeout(timeout) {
            Ok(raw) => SourcePoll::Event(raw),
            Err(RecvTimeoutError::Timeout) => SourcePoll::Empty,
            Err(RecvTimeoutError::Disconnected) => SourcePoll::Closed,
        }
    }
}

/// Source draining an iterator; closes when the iterator ends.
#[derive(Debug)]
pub struct IterSource<I>(pub I);

impl<I> EventSource for IterSource<I>
where
    I: Iterator<Item = RawEvent>,
{
    fn poll(&mut self, _timeout: Duration) -> SourcePoll {
        match self.0.next() {
            Some(raw) => SourcePoll::Event(raw),
            None => SourcePoll::Closed,
        }
    }
}

/// Handle to stop a running stream from another thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Stop the stream. The frame in flight is still completed.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Decodes every frame of one source with the layout of one struct.
#[derive(Debug)]
pub struct EventStream {
    config: StreamConfig,
    decoder: EventDecoder,
    serializer: ExportSerializer,
    metrics: Arc<StreamMetrics>,
    stopped: Arc<AtomicBool>,
    csv_header_written: bool,
}

impl EventStream {
    /// Create a stream decoding `config.struct_name` frames.
    pub fn new(catalog: Arc<TypeCatalog>, config: StreamConfig) -> Self {
        Self {
            decoder: EventDecoder::with_config(catalog, config.decoder),
            serializer: ExportSerializer::with_options(config.serializer),
            config,
            metrics: Arc::new(StreamMetrics::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            csv_header_written: false,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Shared counters, readable while the stream runs.
    pub fn metrics(&self) -> Arc<StreamMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get a handle to stop the stream from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: Arc::clone(&self.stopped),
        }
    }

    /// Stop the stream.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Run the stream (blocking) until the source closes or it is stopped.
    ///
    /// Fails up front if no layout is registered for the stream's struct.
    /// Per-frame failures never end the loop.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<(), StreamError>
    where
        S: EventSource + ?Sized,
        K: EventSink + ?Sized,
    {
        let struct_name = self.config.struct_name.clone();
        let layout = self
            .decoder
            .catalog()
            .layout(&struct_name)
            .ok_or_else(|| StreamError::UnknownStruct(struct_name.clone()))?;

        tracing::info!(
            struct_name = %struct_name,
            format = %self.config.format.map_or("record", ExportFormat::as_str),
            "Starting event stream"
        );

        let timeout = self.config.poll_timeout();
        while !self.is_stopped() {
            match source.poll(timeout) {
                SourcePoll::Event(raw) => {
                    // failures are already counted and logged
                    let _ = self.handle(&layout, raw, sink);
                }
                SourcePoll::Empty => {}
                SourcePoll::Closed => {
                    tracing::debug!(struct_name = %struct_name, "Event source closed");
                    break;
                }
            }
        }

        if let Err(err) = sink.flush() {
            self.metrics.record_sink_error(&err);
            tracing::warn!(struct_name = %struct_name, "Sink flush failed: {}", err);
        }

        tracing::info!(
            struct_name = %struct_name,
            received = self.metrics.received(),
            decoded = self.metrics.decoded(),
            dropped = self.metrics.dropped(),
            "Event stream stopped"
        );
        Ok(())
    }

    /// Decode one frame and deliver it.
    ///
    /// The layout is looked up on every call; an unregistered struct is a
    /// counted drop like any other decode failure.
    pub fn process<K>(&mut self, raw: RawEvent, sink: &mut K) -> Result<(), DecodeError>
    where
        K: EventSink + ?Sized,
    {
        match self.decoder.catalog().layout(&self.config.struct_name) {
            Some(layout) => self.handle(&layout, raw, sink),
            None => {
                self.metrics.record_received();
                let err = DecodeError::UnknownStruct(self.config.struct_name.clone());
                self.record_drop(&err, &raw);
                Err(err)
            }
        }
    }

    fn handle<K>(
        &mut self,
        layout: &StructLayout,
        raw: RawEvent,
        sink: &mut K,
    ) -> Result<(), DecodeError>
    where
        K: EventSink + ?Sized,
    {
        self.metrics.record_received();

        let record = match self.decoder.decode(layout, &raw) {
            Ok(record) => record,
            Err(err) => {
                self.record_drop(&err, &raw);
                return Err(err);
            }
        };
        self.metrics.record_decoded();

        let serialized = self.config.format.map(|format| {
            let serializer = if format == ExportFormat::Csv && self.csv_header_written {
                ExportSerializer::with_options(SerializerOptions {
                    csv_header: false,
                    ..*self.serializer.options()
                })
            } else {
                self.serializer
            };
            self.csv_header_written = true;
            serializer.serialize(&record, format)
        });

        let event = DecodedEvent {
            record,
            serialized,
            source_id: raw.source_id,
            received_at: raw.received_at,
        };
        if let Err(err) = sink.deliver(event) {
            let total = self.metrics.record_sink_error(&err);
            if total == 1 || total % self.config.drop_warn_every.max(1) == 0 {
                tracing::warn!(
                    struct_name = %self.config.struct_name,
                    sink_errors = total,
                    "Sink rejected record: {}",
                    err
                );
            }
        }
        Ok(())
    }

    fn record_drop(&self, err: &DecodeError, raw: &RawEvent) {
        let total = self.metrics.record_drop(err);
        if total == 1 || total % self.config.drop_warn_every.max(1) == 0 {
            tracing::warn!(
                struct_name = %self.config.struct_name,
                reason = err.reason(),
                source_id = raw.source_id,
                dropped = total,
                "Dropping frame: {}",
                err
            );
        } else {
            tracing::debug!(
                struct_name = %self.config.struct_name,
                reason = err.reason(),
                len = raw.len(),
                "Dropping frame: {}",
                err
            );
        }
    }
}
