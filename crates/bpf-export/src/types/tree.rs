// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge between exported type metadata and [`TypeDescriptor`].
//!
//! The collaborator that extracts debug info from a compiled instrumentation
//! program hands over a [`TypeNode`] tree (usually JSON). Converting it
//! validates the tree's internal consistency; anything contradictory is a
//! [`MalformedTypeInfoError`].
//!
//! ## Type references
//!
//! A `{"kind": "ref", "name": "..."}` node points at a type that was
//! registered earlier. References are resolved through a [`TypeResolver`]
//! (normally the [`TypeCatalog`](crate::TypeCatalog) itself).
//!
//! ```json
//! {
//!   "kind": "struct", "name": "event", "size": 296,
//!   "members": [
//!     { "name": "ts",   "type": { "kind": "int", "name": "u64", "size": 8 } },
//!     { "name": "pid",  "type": { "kind": "int", "name": "int", "size": 4, "signed": true } },
//!     { "name": "comm", "type": { "kind": "char_array", "len": 16 } }
//!   ]
//! }
//! ```

use crate::error::MalformedTypeInfoError;
use crate::types::{
    ArrayDescriptor, EnumDescriptor, EnumVariant, MemberDescriptor, StructDescriptor,
    TypeDescriptor, TypeKind, MAX_TYPE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolves a type name to an already registered descriptor.
pub trait TypeResolver {
    /// Look up a descriptor by name. Returns `None` if the name is unknown.
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>>;
}

impl TypeResolver for HashMap<String, Arc<TypeDescriptor>> {
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.get(name).cloned()
    }
}

/// Resolver that knows no types; `ref` nodes always fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTypes;

impl TypeResolver for NoTypes {
    fn lookup(&self, _name: &str) -> Option<Arc<TypeDescriptor>> {
        None
    }
}

/// One node of an exported type tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    Int {
        #[serde(default)]
        name: String,
        size: usize,
        #[serde(default)]
        signed: bool,
    },
    CharArray {
        len: usize,
        /// Redundant with `len`; checked when present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<usize>,
    },
    Array {
        element: Box<TypeNode>,
        len: usize,
    },
    Struct {
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<usize>,
        members: Vec<MemberNode>,
    },
    Enum {
        #[serde(default)]
        name: String,
        #[serde(default = "default_enum_size")]
        size: usize,
        #[serde(default)]
        signed: bool,
        variants: Vec<VariantNode>,
    },
    Ref {
        name: String,
    },
    Pointer {
        #[serde(default)]
        name: String,
    },
    Union {
        #[serde(default)]
        name: String,
        members: Vec<MemberNode>,
    },
    Float {
        #[serde(default)]
        name: String,
        size: usize,
    },
}

fn default_enum_size() -> usize {
    4
}

/// Named struct/union member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberNode {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
}

impl MemberNode {
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Named enum value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantNode {
    pub name: String,
    pub value: i64,
}

impl TypeNode {
    /// Parse a tree from its JSON form.
    pub fn from_json(text: &str) -> Result<Self, MalformedTypeInfoError> {
        serde_json::from_str(text).map_err(|e| MalformedTypeInfoError::new("<json>", e.to_string()))
    }

    /// Name carried by the node itself, if any.
    pub fn name(&self) -> &str {
        match self {
            Self::Int { name, .. }
            | Self::Struct { name, .. }
            | Self::Enum { name, .. }
            | Self::Ref { name }
            | Self::Pointer { name }
            | Self::Union { name, .. }
            | Self::Float { name, .. } => name,
            Self::CharArray { .. } | Self::Array { .. } => "",
        }
    }
}

/// Convert a tree into a descriptor named `name`.
pub fn type_descriptor_from_tree(
    name: &str,
    node: &TypeNode,
    resolver: &dyn TypeResolver,
) -> Result<Arc<TypeDescriptor>, MalformedTypeInfoError> {
    if name.is_empty() {
        return Err(MalformedTypeInfoError::new("<root>", "empty type name"));
    }
    let desc = convert(name, node, resolver)?;
    // The registration name wins over whatever the root node called itself.
    if desc.name == name {
        Ok(desc)
    } else {
        let mut renamed = (*desc).clone();
        renamed.name = name.to_string();
        Ok(Arc::new(renamed))
    }
}

fn convert(
    path: &str,
    node: &TypeNode,
    resolver: &dyn TypeResolver,
) -> Result<Arc<TypeDescriptor>, MalformedTypeInfoError> {
    let desc = match node {
        TypeNode::Int { name, size, signed } => {
            check_int_width(path, *size)?;
            TypeDescriptor::integer(name.clone(), *size, *signed)
        }
        TypeNode::CharArray { len, size } => {
            if let Some(size) = size {
                if size != len {
                    return Err(MalformedTypeInfoError::new(
                        path,
                        format!("char array of length {} declares size {}", len, size),
                    ));
                }
            }
            TypeDescriptor::char_array(*len)
        }
        TypeNode::Array { element, len } => {
            let element_path = format!("{}[]", path);
            let element_type = convert(&element_path, element, resolver)?;
            if is_char(&element_type) {
                TypeDescriptor::char_array(*len)
            } else {
                let type_name = format!("{}[{}]", element_type.name, len);
                TypeDescriptor::new(
                    type_name,
                    TypeKind::Array(ArrayDescriptor::new(element_type, *len)),
                )
            }
        }
        TypeNode::Struct {
            name,
            size,
            members,
        } => {
            if members.is_empty() {
                return Err(MalformedTypeInfoError::new(path, "struct has no members"));
            }
            let members = convert_members(path, members, resolver)?;
            let mut desc = StructDescriptor::new(members);
            desc.declared_size = *size;
            TypeDescriptor::new(name.clone(), TypeKind::Struct(desc))
        }
        TypeNode::Enum {
            name,
            size,
            signed,
            variants,
        } => {
            check_int_width(path, *size)?;
            if variants.is_empty() {
                return Err(MalformedTypeInfoError::new(path, "enum has no variants"));
            }
            let mut seen = HashSet::new();
            let mut out = Vec::with_capacity(variants.len());
            for variant in variants {
                if variant.name.is_empty() {
                    return Err(MalformedTypeInfoError::new(path, "enum variant without a name"));
                }
                if !seen.insert(variant.name.as_str()) {
                    return Err(MalformedTypeInfoError::new(
                        path,
                        format!("duplicate enum variant `{}`", variant.name),
                    ));
                }
                if !value_fits(variant.value, *size, *signed) {
                    return Err(MalformedTypeInfoError::new(
                        path,
                        format!(
                            "enum variant `{}` = {} does not fit in {} bytes",
                            variant.name, variant.value, size
                        ),
                    ));
                }
                out.push(EnumVariant::new(variant.name.clone(), variant.value));
            }
            TypeDescriptor::new(
                name.clone(),
                TypeKind::Enum(EnumDescriptor::new(out).with_repr(*size, *signed)),
            )
        }
        TypeNode::Ref { name } => {
            return resolver.lookup(name).ok_or_else(|| {
                MalformedTypeInfoError::new(path, format!("unresolved type reference `{}`", name))
            });
        }
        TypeNode::Pointer { name } => TypeDescriptor::new(name.clone(), TypeKind::Pointer),
        TypeNode::Union { name, members } => {
            let members = convert_members(path, members, resolver)?;
            TypeDescriptor::new(name.clone(), TypeKind::Union(members))
        }
        TypeNode::Float { name, size } => {
            if !matches!(size, 4 | 8) {
                return Err(MalformedTypeInfoError::new(
                    path,
                    format!("invalid float size {}", size),
                ));
            }
            TypeDescriptor::new(name.clone(), TypeKind::Float { width: *size })
        }
    };
    match desc.checked_size_bytes() {
        Some(size) if size <= MAX_TYPE_SIZE => Ok(Arc::new(desc)),
        _ => Err(MalformedTypeInfoError::new(
            path,
            format!("type is larger than {} bytes", MAX_TYPE_SIZE),
        )),
    }
}

fn convert_members(
    path: &str,
    members: &[MemberNode],
    resolver: &dyn TypeResolver,
) -> Result<Vec<MemberDescriptor>, MalformedTypeInfoError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(members.len());
    for member in members {
        if member.name.is_empty() {
            return Err(MalformedTypeInfoError::new(path, "member without a name"));
        }
        if !seen.insert(member.name.as_str()) {
            return Err(MalformedTypeInfoError::new(
                path,
                format!("duplicate member `{}`", member.name),
            ));
        }
        let member_path = format!("{}.{}", path, member.name);
        let type_desc = convert(&member_path, &member.ty, resolver)?;
        out.push(MemberDescriptor::new(member.name.clone(), type_desc));
    }
    Ok(out)
}

fn check_int_width(path: &str, size: usize) -> Result<(), MalformedTypeInfoError> {
    if matches!(size, 1 | 2 | 4 | 8) {
        Ok(())
    } else {
        Err(MalformedTypeInfoError::new(
            path,
            format!("invalid integer size {} (expected 1, 2, 4 or 8)", size),
        ))
    }
}

fn is_char(desc: &TypeDescriptor) -> bool {
    matches!(desc.kind, TypeKind::Integer { width: 1, .. }) && desc.name.ends_with("char")
}

fn value_fits(value: i64, width: usize, signed: bool) -> bool {
    if width >= 8 {
        return signed || value >= 0;
    }
    let bits = (width * 8) as u32;
    if signed {
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        (min..=max).contains(&value)
    } else {
        (0..(1i64 << bits)).contains(&value)
    }
}
