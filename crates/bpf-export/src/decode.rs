// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame decoding.
//!
//! [`EventDecoder`] turns a [`RawEvent`] into an [`ExportedRecord`] by walking
//! a [`StructLayout`]. The frame length is checked once against the layout's
//! data extent; after that every field read is in bounds by construction.

use crate::error::{DecodeError, TruncatedEventError};
use crate::layout::{FieldKind, StructLayout};
use crate::types::{EnumDescriptor, TypeCatalog};
use crate::value::{ExportedRecord, Value};
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Byte order of integers in incoming frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Same as this host (frames produced locally).
    #[default]
    Native,
    Little,
    Big,
}

impl Endianness {
    fn read_uint(self, buf: &[u8], width: usize) -> u64 {
        match self {
            Self::Native => NativeEndian::read_uint(buf, width),
            Self::Little => LittleEndian::read_uint(buf, width),
            Self::Big => BigEndian::read_uint(buf, width),
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Byte order used for integer and enum fields.
    pub byte_order: Endianness,
}

/// One raw frame as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub bytes: Vec<u8>,
    pub received_at: DateTime<Utc>,
    /// CPU or channel the frame came from.
    pub source_id: u32,
}

impl RawEvent {
    /// Frame received now from source 0.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            received_at: Utc::now(),
            source_id: 0,
        }
    }

    pub fn with_source(mut self, source_id: u32) -> Self {
        self.source_id = source_id;
        self
    }

    pub fn with_timestamp(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decodes frames against layouts held by a [`TypeCatalog`].
#[derive(Debug, Clone)]
pub struct EventDecoder {
    catalog: Arc<TypeCatalog>,
    config: DecoderConfig,
}

impl EventDecoder {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self::with_config(catalog, DecoderConfig::default())
    }

    pub fn with_config(catalog: Arc<TypeCatalog>, config: DecoderConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Decode `raw` with `layout`. `raw` is never modified.
    pub fn decode(
        &self,
        layout: &StructLayout,
        raw: &RawEvent,
    ) -> Result<ExportedRecord, DecodeError> {
        Ok(decode_record(layout, &raw.bytes, self.config.byte_order)?)
    }

    /// Decode `raw` with the layout registered under `struct_name`.
    pub fn decode_named(
        &self,
        struct_name: &str,
        raw: &RawEvent,
    ) -> Result<ExportedRecord, DecodeError> {
        let layout = self
            .catalog
            .layout(struct_name)
            .ok_or_else(|| DecodeError::UnknownStruct(struct_name.to_string()))?;
        self.decode(&layout, raw)
    }
}

/// Decode a byte buffer with `layout`.
///
/// Fails without extracting anything if `bytes` is shorter than
/// [`StructLayout::data_extent`]. Trailing bytes past the extent are ignored.
pub fn decode_record(
    layout: &StructLayout,
    bytes: &[u8],
    order: Endianness,
) -> Result<ExportedRecord, TruncatedEventError> {
    let expected = layout.data_extent();
    if bytes.len() < expected {
        return Err(TruncatedEventError {
            expected,
            actual: bytes.len(),
        });
    }
    decode_struct(layout, bytes, 0, order)
}

fn decode_struct(
    layout: &StructLayout,
    bytes: &[u8],
    base: usize,
    order: Endianness,
) -> Result<ExportedRecord, TruncatedEventError> {
    let mut record = ExportedRecord::with_capacity(layout.name(), layout.fields().len());
    for field in layout.fields() {
        let start = base + field.offset;
        let value = match &field.kind {
            FieldKind::Struct(nested) => {
                Value::Nested(decode_struct(nested, bytes, start, order)?)
            }
            FieldKind::Integer { width, signed } => {
                let slice = field_bytes(bytes, start, field.size)?;
                Value::int(*width as u8, *signed, order.read_uint(slice, *width))
            }
            FieldKind::CharArray { capacity } => {
                decode_char_array(field_bytes(bytes, start, field.size)?, *capacity)
            }
            FieldKind::Enum(desc) => decode_enum(desc, field_bytes(bytes, start, field.size)?, order),
        };
        record.push(field.name.clone(), value);
    }
    Ok(record)
}

fn field_bytes(bytes: &[u8], start: usize, size: usize) -> Result<&[u8], TruncatedEventError> {
    bytes.get(start..start + size).ok_or(TruncatedEventError {
        expected: start + size,
        actual: bytes.len(),
    })
}

fn decode_char_array(slice: &[u8], capacity: usize) -> Value {
    match slice.iter().position(|&b| b == 0) {
        Some(end) => Value::Str {
            bytes: slice[..end].to_vec(),
            truncated: false,
        },
        None => Value::Str {
            bytes: slice.to_vec(),
            truncated: capacity > 0,
        },
    }
}

fn decode_enum(desc: &EnumDescriptor, slice: &[u8], order: Endianness) -> Value {
    let bits = order.read_uint(slice, desc.width);
    let value = Value::enumeration(None, desc.width as u8, desc.signed, bits);
    // unsigned values above i64::MAX match no declared variant
    match value
        .as_i64()
        .and_then(|int| desc.variant_by_value(int))
    {
        Some(variant) => Value::enumeration(
            Some(variant.name.clone()),
            desc.width as u8,
            desc.signed,
            bits,
        ),
        None => value,
    }
}
