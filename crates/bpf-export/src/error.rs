// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.
//!
//! Registration-time errors ([`RegistrationError`] and its parts) are returned
//! synchronously to whoever registers a type. Per-event errors
//! ([`DecodeError`]) are counted by the stream and never stop it.

use std::io;
use thiserror::Error;

/// The type tree handed to the catalog is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed type info for `{type_name}`: {reason}")]
pub struct MalformedTypeInfoError {
    /// Name (or member path) of the offending type.
    pub type_name: String,
    /// What is wrong with it.
    pub reason: String,
}

impl MalformedTypeInfoError {
    pub(crate) fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// A name is already registered with a different shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type `{name}` is already registered with a different shape")]
pub struct ConflictingTypeError {
    pub name: String,
}

/// No layout can be built for a type kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported type at `{path}`: {reason}")]
pub struct UnsupportedTypeError {
    /// Qualified member path, rooted at the struct name.
    pub path: String,
    pub reason: String,
}

impl UnsupportedTypeError {
    pub(crate) fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Anything that makes a registration fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Malformed(#[from] MalformedTypeInfoError),

    #[error(transparent)]
    Conflicting(#[from] ConflictingTypeError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedTypeError),
}

/// The frame is shorter than the layout requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("truncated event: expected at least {expected} bytes, got {actual}")]
pub struct TruncatedEventError {
    pub expected: usize,
    pub actual: usize,
}

/// Per-event decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Truncated(#[from] TruncatedEventError),

    #[error("no layout registered for struct `{0}`")]
    UnknownStruct(String),
}

impl DecodeError {
    /// Short machine-friendly reason, used as the metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Truncated(_) => "truncated",
            Self::UnknownStruct(_) => "unknown_struct",
        }
    }
}

/// An export format name that no serializer implements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported export format `{0}` (expected text, json, jsonl or csv)")]
pub struct UnsupportedFormatError(pub String);

/// Failure to start a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no layout registered for struct `{0}`")]
    UnknownStruct(String),
}

/// Errors reading or writing recorded frame files.
#[derive(Debug, Error)]
pub enum FrameFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid frame file: {0}")]
    InvalidFormat(String),

    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },
}
