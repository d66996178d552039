// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BPF Event Export
//!
//! Decode fixed-layout binary event records emitted by kernel
//! instrumentation programs, using type metadata handed over at run time
//! instead of a shared header.
//!
//! # Features
//!
//! - **Type Catalog**: descriptors built from exported type trees (JSON), lock-free lookups
//! - **Layout Resolution**: natural-alignment offsets, nested structs, fixed arrays, enums
//! - **Decoding**: raw frame -> ordered, typed [`ExportedRecord`]
//! - **Export**: text, JSON, JSON Lines, CSV
//! - **Streaming**: source -> decode -> sink loop with drop counters and Prometheus export
//!
//! # Example
//!
//! ```rust,ignore
//! use bpf_export::{EventStream, StreamConfig, TypeCatalog, TypeNode, ExportFormat};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(TypeCatalog::new());
//! catalog.register_struct("event", &TypeNode::from_json(EVENT_JSON)?)?;
//!
//! let config = StreamConfig::builder("event").format(ExportFormat::JsonLines).build();
//! let mut stream = EventStream::new(catalog, config);
//! stream.run(&mut receiver, &mut bpf_export::create_sink(&OutputConfig::Stdout)?)?;
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod frame_file;
pub mod layout;
pub mod metrics;
pub mod sink;
pub mod stream;
pub mod types;
pub mod value;

pub use config::{StreamConfig, StreamConfigBuilder};
pub use decode::{decode_record, DecoderConfig, Endianness, EventDecoder, RawEvent};
pub use error::{
    ConflictingTypeError, DecodeError, FrameFileError, MalformedTypeInfoError, RegistrationError,
    StreamError, TruncatedEventError, UnsupportedFormatError, UnsupportedTypeError,
};
pub use export::{serialize, ExportFormat, ExportSerializer, RecordFormatter, SerializerOptions};
pub use frame_file::{FrameReader, FrameWriter};
pub use layout::{build_layout, FieldKind, FieldLayout, LeafField, StructLayout};
pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use sink::{create_sink, ChannelSink, DecodedEvent, EventSink, FnSink, OutputConfig, WriterSink};
pub use stream::{EventSource, EventStream, IterSource, SourcePoll, StopHandle};
pub use types::{
    EnumBuilder, TypeCatalog, TypeDescriptor, TypeDescriptorBuilder, TypeKind, TypeNode,
    TypeResolver, MAX_TYPE_SIZE,
};
pub use value::{ExportedRecord, Value};
