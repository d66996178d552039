// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded values and records.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::borrow::Cow;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer of `width` bytes. `bits` holds the raw value zero-extended to 64 bits.
    Int { width: u8, signed: bool, bits: u64 },
    /// Char array contents up to the first NUL. `truncated` is set when the
    /// array had no NUL, so the real string may have been longer.
    Str { bytes: Vec<u8>, truncated: bool },
    /// Nested struct.
    Nested(ExportedRecord),
    /// Enum value with its variant name, if the value is declared. The
    /// backing integer is kept the same way as [`Value::Int`].
    Enum {
        name: Option<String>,
        width: u8,
        signed: bool,
        bits: u64,
    },
}

impl Value {
    /// Build an integer value from raw bits (masked to `width`).
    pub fn int(width: u8, signed: bool, bits: u64) -> Self {
        Self::Int {
            width,
            signed,
            bits: bits & width_mask(width),
        }
    }

    /// Build an enum value from raw bits (masked to `width`).
    pub fn enumeration(name: Option<String>, width: u8, signed: bool, bits: u64) -> Self {
        Self::Enum {
            name,
            width,
            signed,
            bits: bits & width_mask(width),
        }
    }

    /// Signed integer value.
    pub fn signed(width: u8, v: i64) -> Self {
        Self::int(width, true, v as u64)
    }

    /// Unsigned integer value.
    pub fn unsigned(width: u8, v: u64) -> Self {
        Self::int(width, false, v)
    }

    /// String value.
    pub fn str(s: &str) -> Self {
        Self::Str {
            bytes: s.as_bytes().to_vec(),
            truncated: false,
        }
    }

    /// Width, signedness and raw bits of integer-backed values.
    fn int_parts(&self) -> Option<(u8, bool, u64)> {
        match self {
            Self::Int {
                width,
                signed,
                bits,
            }
            | Self::Enum {
                width,
                signed,
                bits,
                ..
            } => Some((*width, *signed, *bits)),
            _ => None,
        }
    }

    /// Try to get as i64 (sign-extends signed integers; enums give their value).
    pub fn as_i64(&self) -> Option<i64> {
        match self.int_parts()? {
            (width, true, bits) => Some(sign_extend(bits, width)),
            (_, false, bits) => i64::try_from(bits).ok(),
        }
    }

    /// Try to get as u64 (negative signed values give `None`).
    pub fn as_u64(&self) -> Option<u64> {
        match self.int_parts()? {
            (_, false, bits) => Some(bits),
            (width, true, bits) => u64::try_from(sign_extend(bits, width)).ok(),
        }
    }

    /// Decimal rendering of integer-backed values, exact for the full
    /// signed and unsigned 64-bit ranges.
    pub fn int_string(&self) -> Option<String> {
        match self.int_parts()? {
            (width, true, bits) => Some(sign_extend(bits, width).to_string()),
            (_, false, bits) => Some(bits.to_string()),
        }
    }

    /// Try to get as string (lossy UTF-8).
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Str { bytes, .. } => Some(String::from_utf8_lossy(bytes)),
            _ => None,
        }
    }

    /// Whether a string value filled its whole capacity without a NUL.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            Self::Str {
                truncated: true,
                ..
            }
        )
    }

    /// Try to get as nested record.
    pub fn as_record(&self) -> Option<&ExportedRecord> {
        match self {
            Self::Nested(r) => Some(r),
            _ => None,
        }
    }

    /// Enum variant name, if this is a declared enum value.
    pub fn enum_name(&self) -> Option<&str> {
        match self {
            Self::Enum { name, .. } => name.as_deref(),
            _ => None,
        }
    }
}

fn width_mask(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (u32::from(width) * 8)) - 1
    }
}

fn sign_extend(bits: u64, width: u8) -> i64 {
    if width >= 8 {
        return bits as i64;
    }
    let shift = 64 - u32::from(width) * 8;
    ((bits << shift) as i64) >> shift
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str { bytes, .. } => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Self::Nested(record) => record.serialize(serializer),
            Self::Enum {
                name: Some(name), ..
            } => serializer.serialize_str(name),
            Self::Int {
                width,
                signed: true,
                bits,
            }
            | Self::Enum {
                width,
                signed: true,
                bits,
                ..
            } => serializer.serialize_i64(sign_extend(*bits, *width)),
            Self::Int { bits, .. } | Self::Enum { bits, .. } => serializer.serialize_u64(*bits),
        }
    }
}

/// A decoded event: field name -> value, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportedRecord {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl ExportedRecord {
    /// Create an empty record for struct `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(type_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field (keeps insertion order).
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// Name of the struct this record was decoded from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Top-level field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field by dotted path through nested records (`task.pid`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.get(path),
            Some((head, rest)) => self.get(head)?.as_record()?.get_path(rest),
        }
    }

    /// Iterate over fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten to (dotted path, leaf value) pairs in declaration order.
    pub fn leaves(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
        for (name, value) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            match value {
                Value::Nested(inner) => inner.collect_leaves(&path, out),
                leaf => out.push((path, leaf)),
            }
        }
    }
}

impl Serialize for ExportedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
