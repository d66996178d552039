// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for TypeDescriptor.

use crate::types::{
    ArrayDescriptor, EnumDescriptor, EnumVariant, MemberDescriptor, StructDescriptor,
    TypeDescriptor, TypeKind,
};
use std::sync::Arc;

/// Builder for struct TypeDescriptor instances.
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    members: Vec<MemberDescriptor>,
    declared_size: Option<usize>,
}

impl TypeDescriptorBuilder {
    /// Create a new builder for a struct type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            declared_size: None,
        }
    }

    /// Add an integer field.
    pub fn int_field(mut self, name: impl Into<String>, width: usize, signed: bool) -> Self {
        let type_desc = Arc::new(TypeDescriptor::integer(
            integer_name(width, signed),
            width,
            signed,
        ));
        self.members.push(MemberDescriptor::new(name, type_desc));
        self
    }

    pub fn u64_field(self, name: impl Into<String>) -> Self {
        self.int_field(name, 8, false)
    }

    pub fn i32_field(self, name: impl Into<String>) -> Self {
        self.int_field(name, 4, true)
    }

    /// Add a `char name[len]` field.
    pub fn char_array_field(mut self, name: impl Into<String>, len: usize) -> Self {
        let type_desc = Arc::new(TypeDescriptor::char_array(len));
        self.members.push(MemberDescriptor::new(name, type_desc));
        self
    }

    /// Add a fixed array field of `length` elements.
    pub fn array_field(
        mut self,
        name: impl Into<String>,
        element_type: Arc<TypeDescriptor>,
        length: usize,
    ) -> Self {
        let type_name = format!("{}[{}]", element_type.name, length);
        let arr_desc = ArrayDescriptor::new(element_type, length);
        let type_desc = Arc::new(TypeDescriptor::new(type_name, TypeKind::Array(arr_desc)));
        self.members.push(MemberDescriptor::new(name, type_desc));
        self
    }

    /// Add a field with an arbitrary type descriptor (nested struct, enum, ...).
    pub fn field_with_type(
        mut self,
        name: impl Into<String>,
        type_desc: Arc<TypeDescriptor>,
    ) -> Self {
        self.members.push(MemberDescriptor::new(name, type_desc));
        self
    }

    /// Record the `sizeof` the producer reported for this struct.
    pub fn declared_size(mut self, size: usize) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Build the TypeDescriptor.
    pub fn build(self) -> TypeDescriptor {
        let mut desc = StructDescriptor::new(self.members);
        desc.declared_size = self.declared_size;
        TypeDescriptor::new(self.name, TypeKind::Struct(desc))
    }
}

/// Builder for enum types.
#[derive(Debug)]
pub struct EnumBuilder {
    name: String,
    variants: Vec<EnumVariant>,
    next_value: i64,
    width: usize,
    signed: bool,
}

impl EnumBuilder {
    /// Create a new enum builder (4-byte unsigned backing, like C).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
            next_value: 0,
            width: 4,
            signed: false,
        }
    }

    /// Add a variant with the next implicit value.
    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push(EnumVariant::new(name, self.next_value));
        self.next_value += 1;
        self
    }

    /// Add a variant with an explicit value.
    pub fn variant_with_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push(EnumVariant::new(name, value));
        self.next_value = value + 1;
        self
    }

    /// Set the backing integer.
    pub fn repr(mut self, width: usize, signed: bool) -> Self {
        self.width = width;
        self.signed = signed;
        self
    }

    /// Build the enum TypeDescriptor.
    pub fn build(self) -> TypeDescriptor {
        let desc = EnumDescriptor::new(self.variants).with_repr(self.width, self.signed);
        TypeDescriptor::new(self.name, TypeKind::Enum(desc))
    }
}

fn integer_name(width: usize, signed: bool) -> String {
    format!("{}{}", if signed { "i" } else { "u" }, width * 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_declaration_order() {
        let desc = TypeDescriptorBuilder::new("event")
            .u64_field("ts")
            .i32_field("pid")
            .char_array_field("comm", 16)
            .build();

        let names: Vec<_> = desc
            .members()
            .unwrap()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["ts", "pid", "comm"]);
        assert_eq!(desc.member("ts").unwrap().type_desc.name, "u64");
        assert_eq!(desc.member("pid").unwrap().type_desc.name, "i32");
    }

    #[test]
    fn test_enum_builder_values() {
        let desc = EnumBuilder::new("state")
            .variant("IDLE")
            .variant_with_value("RUNNING", 10)
            .variant("DONE")
            .build();

        match &desc.kind {
            TypeKind::Enum(e) => {
                assert_eq!(e.variant("IDLE").map(|v| v.value), Some(0));
                assert_eq!(e.variant("RUNNING").map(|v| v.value), Some(10));
                assert_eq!(e.variant("DONE").map(|v| v.value), Some(11));
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_array_field_name() {
        let u32_type = Arc::new(TypeDescriptor::integer("u32", 4, false));
        let desc = TypeDescriptorBuilder::new("s")
            .array_field("args", u32_type, 3)
            .build();
        assert_eq!(desc.member("args").unwrap().type_desc.name, "u32[3]");
        assert_eq!(desc.size_bytes(), 12);
    }
}
