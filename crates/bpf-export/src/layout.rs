// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct layout resolution.
//!
//! [`build_layout`] walks a struct [`TypeDescriptor`] depth-first and assigns
//! every member its byte offset under the producer's natural-alignment ABI:
//!
//! - integers and enums align to their own width (1/2/4/8),
//! - `char[N]` aligns to 1 and occupies N bytes,
//! - arrays align to their element and are expanded into `name[i]` fields,
//! - structs align to their widest member; `sizeof` is rounded up to that.
//!
//! Everything the decoder relies on (offsets in bounds, no overlap, supported
//! kinds only, total size within [`MAX_TYPE_SIZE`]) is established here once,
//! so the per-event path never re-validates.

use crate::error::UnsupportedTypeError;
use crate::types::descriptor::{align_up, MAX_TYPE_SIZE};
use crate::types::{EnumDescriptor, StructDescriptor, TypeDescriptor, TypeKind};
use std::sync::Arc;

/// How a resolved field is turned into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer of `width` bytes.
    Integer { width: usize, signed: bool },
    /// `char[capacity]`, read up to the first NUL.
    CharArray { capacity: usize },
    /// Integer-backed enum.
    Enum(Arc<EnumDescriptor>),
    /// Nested struct with its own (relative) layout.
    Struct(Arc<StructLayout>),
}

/// One resolved field. `offset` is relative to the enclosing struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub kind: FieldKind,
}

/// Leaf field with its path-qualified name and absolute offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafField {
    /// Qualified path (`task.pid`, `args[1]`).
    pub path: String,
    /// Offset from the start of the root struct.
    pub offset: usize,
    pub size: usize,
    pub kind: FieldKind,
}

/// Resolved layout of a named struct, shared read-only by all decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    name: String,
    fields: Vec<FieldLayout>,
    size_bytes: usize,
    alignment: usize,
    data_extent: usize,
}

impl StructLayout {
    /// Struct name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level fields in declaration order (nested structs grouped).
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Field by top-level name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// ABI `sizeof`, including tail padding.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Offset just past the last field; the minimum frame length to decode.
    pub fn data_extent(&self) -> usize {
        self.data_extent
    }

    /// Flattened leaf fields in declaration order.
    pub fn leaves(&self) -> Vec<LeafField> {
        let mut out = Vec::new();
        self.collect_leaves("", 0, &mut out);
        out
    }

    /// Leaf by qualified path.
    pub fn leaf(&self, path: &str) -> Option<LeafField> {
        self.leaves().into_iter().find(|l| l.path == path)
    }

    fn collect_leaves(&self, prefix: &str, base: usize, out: &mut Vec<LeafField>) {
        for field in &self.fields {
            let path = if prefix.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", prefix, field.name)
            };
            match &field.kind {
                FieldKind::Struct(nested) => {
                    nested.collect_leaves(&path, base + field.offset, out);
                }
                kind => out.push(LeafField {
                    path,
                    offset: base + field.offset,
                    size: field.size,
                    kind: kind.clone(),
                }),
            }
        }
    }
}

/// Build the layout of a struct descriptor.
///
/// Fails with [`UnsupportedTypeError`] for pointers, unions, floats, integer
/// widths other than 1/2/4/8, a non-struct root, a struct larger than
/// [`MAX_TYPE_SIZE`], or a struct whose declared size disagrees with its
/// natural layout (packed or over-aligned).
pub fn build_layout(root: &TypeDescriptor) -> Result<StructLayout, UnsupportedTypeError> {
    match &root.kind {
        TypeKind::Struct(desc) => layout_struct(&root.name, root, desc),
        other => Err(UnsupportedTypeError::new(
            root.name.clone(),
            format!("layout root must be a struct, got {}", other.label()),
        )),
    }
}

fn layout_struct(
    path: &str,
    desc: &TypeDescriptor,
    st: &StructDescriptor,
) -> Result<StructLayout, UnsupportedTypeError> {
    let mut fields = Vec::with_capacity(st.members.len());
    let mut cursor = 0usize;

    for member in &st.members {
        let member_path = format!("{}.{}", path, member.name);
        let ty = &member.type_desc;
        // Alignment and size are only meaningful once every width is known good.
        check_kind(&member_path, ty)?;
        let size = ty
            .checked_size_bytes()
            .ok_or_else(|| too_large(&member_path))?;
        let offset = align_up(cursor, ty.alignment()).ok_or_else(|| too_large(path))?;
        cursor = offset
            .checked_add(size)
            .filter(|end| *end <= MAX_TYPE_SIZE)
            .ok_or_else(|| too_large(path))?;
        expand_member(&mut fields, member.name.clone(), offset, ty, &member_path)?;
    }

    let alignment = desc.alignment();
    let size_bytes = align_up(cursor, alignment)
        .filter(|size| *size <= MAX_TYPE_SIZE)
        .ok_or_else(|| too_large(path))?;

    if let Some(declared) = st.declared_size {
        if declared != size_bytes {
            return Err(UnsupportedTypeError::new(
                path,
                format!(
                    "declared size {} differs from natural layout size {} (packed or over-aligned struct)",
                    declared, size_bytes
                ),
            ));
        }
    }

    debug_assert!(fields
        .windows(2)
        .all(|w| w[0].offset + w[0].size <= w[1].offset));
    debug_assert!(fields.iter().all(|f| f.offset + f.size <= size_bytes));

    Ok(StructLayout {
        name: desc.name.clone(),
        fields,
        size_bytes,
        alignment,
        data_extent: cursor,
    })
}

/// Reject kinds and widths that have no layout, looking through arrays and
/// nested structs.
fn check_kind(path: &str, ty: &TypeDescriptor) -> Result<(), UnsupportedTypeError> {
    match &ty.kind {
        TypeKind::Integer { width, .. } => check_width(path, *width),
        TypeKind::Enum(e) => check_width(path, e.width),
        TypeKind::FixedCharArray { .. } => Ok(()),
        TypeKind::Array(arr) => {
            check_kind(&format!("{}[]", path), &arr.element_type)?;
            if arr.length > 0 && arr.element_type.checked_size_bytes() == Some(0) {
                return Err(UnsupportedTypeError::new(
                    path,
                    "arrays of zero-sized elements are not supported",
                ));
            }
            Ok(())
        }
        TypeKind::Struct(st) => st
            .members
            .iter()
            .try_for_each(|m| check_kind(&format!("{}.{}", path, m.name), &m.type_desc)),
        TypeKind::Pointer => Err(UnsupportedTypeError::new(
            path,
            "pointer members have no decodable value in a frame",
        )),
        TypeKind::Union(_) => Err(UnsupportedTypeError::new(
            path,
            "unions have no single layout to decode",
        )),
        TypeKind::Float { .. } => Err(UnsupportedTypeError::new(
            path,
            "floating point members are not supported",
        )),
    }
}

fn check_width(path: &str, width: usize) -> Result<(), UnsupportedTypeError> {
    if matches!(width, 1 | 2 | 4 | 8) {
        Ok(())
    } else {
        Err(UnsupportedTypeError::new(
            path,
            format!("{}-byte integers are not supported", width),
        ))
    }
}

fn too_large(path: &str) -> UnsupportedTypeError {
    UnsupportedTypeError::new(
        path,
        format!("type is larger than {} bytes", MAX_TYPE_SIZE),
    )
}

/// Push the fields for one member. `ty` has passed [`check_kind`] and fits
/// within [`MAX_TYPE_SIZE`] at `offset`.
fn expand_member(
    fields: &mut Vec<FieldLayout>,
    name: String,
    offset: usize,
    ty: &TypeDescriptor,
    path: &str,
) -> Result<(), UnsupportedTypeError> {
    let kind = match &ty.kind {
        TypeKind::Integer { width, signed } => FieldKind::Integer {
            width: *width,
            signed: *signed,
        },
        TypeKind::FixedCharArray { len } => FieldKind::CharArray { capacity: *len },
        TypeKind::Enum(e) => FieldKind::Enum(Arc::new(e.clone())),
        TypeKind::Struct(st) => FieldKind::Struct(Arc::new(layout_struct(path, ty, st)?)),
        TypeKind::Array(arr) => {
            let stride = arr.element_type.size_bytes();
            for index in 0..arr.length {
                expand_member(
                    fields,
                    format!("{}[{}]", name, index),
                    offset + index * stride,
                    &arr.element_type,
                    &format!("{}[{}]", path, index),
                )?;
            }
            return Ok(());
        }
        TypeKind::Pointer | TypeKind::Union(_) | TypeKind::Float { .. } => {
            return check_kind(path, ty);
        }
    };

    fields.push(FieldLayout {
        name,
        offset,
        size: ty.size_bytes(),
        kind,
    });
    Ok(())
}
