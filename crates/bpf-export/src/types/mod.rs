// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type model: descriptors, builders, exported type trees and the catalog.

mod builder;
mod catalog;
pub(crate) mod descriptor;
mod tree;

pub use builder::{EnumBuilder, TypeDescriptorBuilder};
pub use catalog::TypeCatalog;
pub use descriptor::{
    ArrayDescriptor, EnumDescriptor, EnumVariant, MemberDescriptor, StructDescriptor,
    TypeDescriptor, TypeKind, MAX_TYPE_SIZE, TARGET_POINTER_SIZE,
};
pub use tree::{
    type_descriptor_from_tree, MemberNode, NoTypes, TypeNode, TypeResolver, VariantNode,
};
