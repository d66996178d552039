// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream counters and their Prometheus text rendering.
//!
//! ```rust,ignore
//! let metrics = stream.metrics();
//! let output = bpf_export::metrics::export_prometheus(&metrics.snapshot(), "bpf");
//! // bpf_events_received_total 42 ...
//! ```

use crate::error::DecodeError;
use parking_lot::Mutex;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-stream counters.
///
/// Thread-safe: counters are Relaxed atomics, the last error reason sits
/// behind a mutex that is only taken on the drop path.
#[derive(Debug)]
pub struct StreamMetrics {
    received: AtomicU64,
    decoded: AtomicU64,
    dropped_truncated: AtomicU64,
    dropped_unknown: AtomicU64,
    sink_errors: AtomicU64,
    last_error: Mutex<Option<String>>,
    created: Instant,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            decoded: AtomicU64::new(0),
            dropped_truncated: AtomicU64::new(0),
            dropped_unknown: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            last_error: Mutex::new(None),
            created: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dropped frame and remember why. Returns the new drop total.
    pub fn record_drop(&self, err: &DecodeError) -> u64 {
        match err {
            DecodeError::Truncated(_) => &self.dropped_truncated,
            DecodeError::UnknownStruct(_) => &self.dropped_unknown,
        }
        .fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(err.to_string());
        self.dropped()
    }

    pub fn record_sink_error(&self, err: &std::io::Error) -> u64 {
        *self.last_error.lock() = Some(format!("sink: {}", err));
        self.sink_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    /// Frames dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_truncated.load(Ordering::Relaxed)
            + self.dropped_unknown.load(Ordering::Relaxed)
    }

    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received(),
            decoded: self.decoded(),
            dropped_truncated: self.dropped_truncated.load(Ordering::Relaxed),
            dropped_unknown_struct: self.dropped_unknown.load(Ordering::Relaxed),
            sink_errors: self.sink_errors(),
            last_error: self.last_error(),
            uptime: self.created.elapsed(),
        }
    }
}

/// Point-in-time copy of [`StreamMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub decoded: u64,
    pub dropped_truncated: u64,
    pub dropped_unknown_struct: u64,
    pub sink_errors: u64,
    pub last_error: Option<String>,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.dropped_truncated + self.dropped_unknown_struct
    }
}

/// Export a snapshot in Prometheus text exposition format.
///
/// `prefix` is prepended to every metric name (`bpf` -> `bpf_events_received_total`).
pub fn export_prometheus(snapshot: &MetricsSnapshot, prefix: &str) -> String {
    let mut output = String::with_capacity(1024);

    counter(
        &mut output,
        prefix,
        "events_received_total",
        "Raw frames pulled from the source",
        snapshot.received,
    );
    counter(
        &mut output,
        prefix,
        "events_decoded_total",
        "Frames decoded into records",
        snapshot.decoded,
    );

    let name = format!("{}_events_dropped_total", prefix);
    let _ = writeln!(output, "# TYPE {} counter", name);
    let _ = writeln!(output, "# HELP {} Frames dropped by decode failure", name);
    let _ = writeln!(
        output,
        "{}{{reason=\"truncated\"}} {}",
        name, snapshot.dropped_truncated
    );
    let _ = writeln!(
        output,
        "{}{{reason=\"unknown_struct\"}} {}",
        name, snapshot.dropped_unknown_struct
    );
    let _ = writeln!(output);

    counter(
        &mut output,
        prefix,
        "sink_errors_total",
        "Records the sink failed to accept",
        snapshot.sink_errors,
    );

    let name = format!("{}_uptime_seconds", prefix);
    let _ = writeln!(output, "# TYPE {} gauge", name);
    let _ = writeln!(output, "# HELP {} Time since the stream metrics were created", name);
    let _ = writeln!(output, "{} {:.3}", name, snapshot.uptime.as_secs_f64());

    output
}

fn counter(output: &mut String, prefix: &str, name: &str, help: &str, value: u64) {
    let full_name = format!("{}_{}", prefix, name);
    let _ = writeln!(output, "# TYPE {} counter", full_name);
    let _ = writeln!(output, "# HELP {} {}", full_name, help);
    let _ = writeln!(output, "{} {}", full_name, value);
    let _ = writeln!(output);
}
