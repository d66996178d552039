// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.

use std::sync::Arc;

/// Width of a pointer in the instrumentation target (BPF is always 64-bit).
pub const TARGET_POINTER_SIZE: usize = 8;

/// Largest type the engine lays out, in bytes. Also the largest frame a
/// capture file carries.
pub const MAX_TYPE_SIZE: usize = 1 << 20;

/// Round `offset` up to the next multiple of `align`.
///
/// `None` if `align` is not a power of two or the result overflows.
#[inline]
pub(crate) fn align_up(offset: usize, align: usize) -> Option<usize> {
    if !align.is_power_of_two() {
        return None;
    }
    offset.checked_add(align - 1).map(|end| end & !(align - 1))
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Integer of 1, 2, 4 or 8 bytes.
    Integer { width: usize, signed: bool },
    /// `char name[len]`, decoded as a NUL-terminated string.
    FixedCharArray { len: usize },
    /// Fixed array of a non-char element.
    Array(ArrayDescriptor),
    /// Struct with named members in declaration order.
    Struct(StructDescriptor),
    /// Enumeration backed by an integer.
    Enum(EnumDescriptor),
    /// Pointer. Carried by metadata, never laid out.
    Pointer,
    /// Union. Carried by metadata, never laid out.
    Union(Vec<MemberDescriptor>),
    /// Floating point. Carried by metadata, never laid out.
    Float { width: usize },
}

impl TypeKind {
    /// Short kind label, used in error messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Integer { .. } => "int",
            Self::FixedCharArray { .. } => "char_array",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Pointer => "pointer",
            Self::Union(_) => "union",
            Self::Float { .. } => "float",
        }
    }
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Type name (may be empty for anonymous member types).
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create an integer type descriptor.
    pub fn integer(name: impl Into<String>, width: usize, signed: bool) -> Self {
        Self::new(name, TypeKind::Integer { width, signed })
    }

    /// Create a `char[len]` type descriptor.
    pub fn char_array(len: usize) -> Self {
        Self::new(format!("char[{}]", len), TypeKind::FixedCharArray { len })
    }

    /// Create a struct type descriptor.
    pub fn struct_type(name: impl Into<String>, members: Vec<MemberDescriptor>) -> Self {
        Self::new(name, TypeKind::Struct(StructDescriptor::new(members)))
    }

    /// Check if this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    /// Signedness, for integer-backed kinds.
    pub fn signed(&self) -> Option<bool> {
        match &self.kind {
            TypeKind::Integer { signed, .. } => Some(*signed),
            TypeKind::Enum(e) => Some(e.signed),
            _ => None,
        }
    }

    /// Get members if this is a struct.
    pub fn members(&self) -> Option<&[MemberDescriptor]> {
        match &self.kind {
            TypeKind::Struct(s) => Some(&s.members),
            _ => None,
        }
    }

    /// Get member by name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members()?.iter().find(|m| m.name == name)
    }

    /// Natural size in bytes under the producer ABI.
    ///
    /// Saturates at `usize::MAX` when [`checked_size_bytes`](Self::checked_size_bytes)
    /// has no answer.
    pub fn size_bytes(&self) -> usize {
        self.checked_size_bytes().unwrap_or(usize::MAX)
    }

    /// Natural size in bytes, or `None` if it overflows `usize` or a member
    /// alignment is not a power of two.
    pub fn checked_size_bytes(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::Integer { width, .. } => Some(*width),
            TypeKind::FixedCharArray { len } => Some(*len),
            TypeKind::Array(arr) => arr.element_type.checked_size_bytes()?.checked_mul(arr.length),
            TypeKind::Struct(s) => {
                let mut size = 0usize;
                for member in &s.members {
                    size = align_up(size, member.type_desc.alignment())?
                        .checked_add(member.type_desc.checked_size_bytes()?)?;
                }
                align_up(size, self.alignment())
            }
            TypeKind::Enum(e) => Some(e.width),
            TypeKind::Pointer => Some(TARGET_POINTER_SIZE),
            TypeKind::Union(members) => {
                let mut widest = 0usize;
                for member in members {
                    widest = widest.max(member.type_desc.checked_size_bytes()?);
                }
                align_up(widest, self.alignment())
            }
            TypeKind::Float { width } => Some(*width),
        }
    }

    /// Get alignment requirement.
    pub fn alignment(&self) -> usize {
        match &self.kind {
            TypeKind::Integer { width, .. } => (*width).max(1),
            TypeKind::FixedCharArray { .. } => 1,
            TypeKind::Array(arr) => arr.element_type.alignment(),
            TypeKind::Struct(s) => s
                .members
                .iter()
                .map(|m| m.type_desc.alignment())
                .max()
                .unwrap_or(1),
            TypeKind::Enum(e) => e.width.max(1),
            TypeKind::Pointer => TARGET_POINTER_SIZE,
            TypeKind::Union(members) => members
                .iter()
                .map(|m| m.type_desc.alignment())
                .max()
                .unwrap_or(1),
            TypeKind::Float { width } => (*width).max(1),
        }
    }
}

/// A struct's member list plus the size the metadata declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    /// Members in declaration order.
    pub members: Vec<MemberDescriptor>,
    /// `sizeof` as recorded by the producer, if the metadata carried it.
    pub declared_size: Option<usize>,
}

impl StructDescriptor {
    pub fn new(members: Vec<MemberDescriptor>) -> Self {
        Self {
            members,
            declared_size: None,
        }
    }

    pub fn with_declared_size(mut self, size: usize) -> Self {
        self.declared_size = Some(size);
        self
    }
}

/// Member of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    /// Member name.
    pub name: String,
    /// Member type.
    pub type_desc: Arc<TypeDescriptor>,
}

impl MemberDescriptor {
    /// Create a new member descriptor.
    pub fn new(name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            type_desc,
        }
    }
}

/// Array type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDescriptor {
    /// Element type.
    pub element_type: Arc<TypeDescriptor>,
    /// Fixed length.
    pub length: usize,
}

impl ArrayDescriptor {
    pub fn new(element_type: Arc<TypeDescriptor>, length: usize) -> Self {
        Self {
            element_type,
            length,
        }
    }
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Width of the backing integer (C enums are 4 bytes).
    pub width: usize,
    /// Whether the backing integer is signed.
    pub signed: bool,
    /// Declared variants.
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    /// Create enum descriptor backed by an unsigned 32-bit integer.
    pub fn new(variants: Vec<EnumVariant>) -> Self {
        Self {
            width: 4,
            signed: false,
            variants,
        }
    }

    /// Set the backing integer.
    pub fn with_repr(mut self, width: usize, signed: bool) -> Self {
        self.width = width;
        self.signed = signed;
        self
    }

    /// Get variant by name.
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Get variant by value.
    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(width: usize, signed: bool) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::integer("", width, signed))
    }

    #[test]
    fn test_integer_size_and_alignment() {
        for width in [1, 2, 4, 8] {
            let desc = TypeDescriptor::integer("i", width, true);
            assert_eq!(desc.size_bytes(), width);
            assert_eq!(desc.alignment(), width);
        }
    }

    #[test]
    fn test_char_array_is_byte_aligned() {
        let desc = TypeDescriptor::char_array(255);
        assert_eq!(desc.size_bytes(), 255);
        assert_eq!(desc.alignment(), 1);
        assert_eq!(desc.name, "char[255]");
    }

    #[test]
    fn test_struct_padding_follows_widest_member() {
        // struct { u8 a; u64 b; u16 c; } -> a@0, b@8, c@16, sizeof 24
        let desc = TypeDescriptor::struct_type(
            "padded",
            vec![
                MemberDescriptor::new("a", int(1, false)),
                MemberDescriptor::new("b", int(8, false)),
                MemberDescriptor::new("c", int(2, false)),
            ],
        );
        assert_eq!(desc.alignment(), 8);
        assert_eq!(desc.size_bytes(), 24);
        assert!(desc.member("b").is_some());
        assert!(desc.member("z").is_none());
    }

    #[test]
    fn test_enum_lookup() {
        let e = EnumDescriptor::new(vec![
            EnumVariant::new("OPEN", 0),
            EnumVariant::new("CLOSE", 1),
        ]);
        assert_eq!(e.variant("CLOSE").map(|v| v.value), Some(1));
        assert_eq!(e.variant_by_value(0).map(|v| v.name.as_str()), Some("OPEN"));
        assert!(e.variant_by_value(7).is_none());
    }

    #[test]
    fn test_size_overflow_is_reported() {
        let huge = TypeDescriptor::new(
            "u64[]",
            TypeKind::Array(ArrayDescriptor::new(int(8, false), usize::MAX / 4)),
        );
        assert_eq!(huge.checked_size_bytes(), None);
        assert_eq!(huge.size_bytes(), usize::MAX);

        let tail = TypeDescriptor::struct_type(
            "s",
            vec![
                MemberDescriptor::new("a", int(8, false)),
                MemberDescriptor::new("b", Arc::new(TypeDescriptor::char_array(usize::MAX))),
            ],
        );
        assert_eq!(tail.checked_size_bytes(), None);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(5, 4), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(5, 3), None);
        assert_eq!(align_up(usize::MAX, 8), None);
    }

    #[test]
    fn test_signedness() {
        assert_eq!(TypeDescriptor::integer("i32", 4, true).signed(), Some(true));
        assert_eq!(TypeDescriptor::char_array(4).signed(), None);
    }
}
