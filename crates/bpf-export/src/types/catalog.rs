// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type catalog: registered descriptors and their layouts, keyed by name.
//!
//! Reads are lock-free: the catalog publishes an immutable snapshot through
//! `ArcSwap`, so a lookup is one atomic load. Registration takes a writer
//! mutex, clones the (small) maps, inserts, and swaps the new snapshot in.
//! Registration is expected once per struct at program load, before any
//! stream starts.

use crate::error::{ConflictingTypeError, RegistrationError};
use crate::layout::{build_layout, StructLayout};
use crate::types::tree::{type_descriptor_from_tree, TypeNode, TypeResolver};
use crate::types::TypeDescriptor;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct Snapshot {
    types: HashMap<String, Arc<TypeDescriptor>>,
    layouts: HashMap<String, Arc<StructLayout>>,
}

impl TypeResolver for Snapshot {
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }
}

/// Registry of resolved type descriptors and struct layouts.
///
/// Share it as `Arc<TypeCatalog>` between the decoder and every stream.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl TypeCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type tree under `name`.
    ///
    /// Registering the same shape twice is a no-op. A different shape under an
    /// existing name is rejected and the earlier entry is kept.
    pub fn register(&self, name: &str, tree: &TypeNode) -> Result<(), RegistrationError> {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        let desc = type_descriptor_from_tree(name, tree, current.as_ref())?;
        self.insert_locked(&current, desc, None)?;
        Ok(())
    }

    /// Register an already built descriptor under its own name.
    pub fn register_descriptor(&self, desc: TypeDescriptor) -> Result<(), RegistrationError> {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        self.insert_locked(&current, Arc::new(desc), None)?;
        Ok(())
    }

    /// Register a struct tree and build its layout in one step.
    ///
    /// Nothing is inserted unless the layout builds.
    pub fn register_struct(
        &self,
        name: &str,
        tree: &TypeNode,
    ) -> Result<Arc<StructLayout>, RegistrationError> {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        let desc = type_descriptor_from_tree(name, tree, current.as_ref())?;
        self.insert_struct_locked(&current, desc)
    }

    /// Register a built struct descriptor and its layout.
    pub fn register_struct_descriptor(
        &self,
        desc: TypeDescriptor,
    ) -> Result<Arc<StructLayout>, RegistrationError> {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        self.insert_struct_locked(&current, Arc::new(desc))
    }

    fn insert_struct_locked(
        &self,
        current: &Arc<Snapshot>,
        desc: Arc<TypeDescriptor>,
    ) -> Result<Arc<StructLayout>, RegistrationError> {
        if let Some(layout) = current.layouts.get(&desc.name) {
            check_same_shape(current, &desc)?;
            return Ok(layout.clone());
        }
        let layout = Arc::new(build_layout(&desc)?);
        self.insert_locked(current, desc, Some(layout.clone()))?;
        Ok(layout)
    }

    fn insert_locked(
        &self,
        current: &Arc<Snapshot>,
        desc: Arc<TypeDescriptor>,
        layout: Option<Arc<StructLayout>>,
    ) -> Result<(), RegistrationError> {
        let name = desc.name.clone();
        let already_known = check_same_shape(current, &desc)?;
        if already_known && layout.is_none() {
            tracing::debug!(type_name = %name, "type already registered with identical shape");
            return Ok(());
        }

        let mut next = (**current).clone();
        next.types.insert(name.clone(), desc);
        if let Some(layout) = layout {
            tracing::info!(
                type_name = %name,
                fields = layout.fields().len(),
                size = layout.size_bytes(),
                "registered struct layout"
            );
            next.layouts.insert(name, layout);
        } else {
            tracing::debug!(type_name = %name, "registered type");
        }
        self.snapshot.store(Arc::new(next));
        Ok(())
    }

    /// Look up a descriptor by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.snapshot.load().types.get(name).cloned()
    }

    /// Look up the layout registered for a struct name.
    pub fn layout(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.snapshot.load().layouts.get(name).cloned()
    }

    /// Remove a name (descriptor and layout). Layouts already handed out stay valid.
    pub fn unregister(&self, name: &str) -> bool {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        if !current.types.contains_key(name) {
            return false;
        }
        let mut next = (*current).clone();
        next.types.remove(name);
        next.layouts.remove(name);
        self.snapshot.store(Arc::new(next));
        tracing::info!(type_name = %name, "unregistered type");
        true
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.snapshot.load().types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.snapshot.load().types.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeResolver for TypeCatalog {
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.resolve(name)
    }
}

/// `Ok(true)` if `desc` is already registered with the same shape,
/// `Ok(false)` if the name is free.
fn check_same_shape(
    current: &Snapshot,
    desc: &TypeDescriptor,
) -> Result<bool, ConflictingTypeError> {
    match current.types.get(&desc.name) {
        None => Ok(false),
        Some(existing) if **existing == *desc => Ok(true),
        Some(_) => {
            tracing::warn!(type_name = %desc.name, "rejected conflicting re-registration");
            Err(ConflictingTypeError {
                name: desc.name.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tree::MemberNode;
    use crate::types::TypeDescriptorBuilder;
    use std::thread;

    fn int(size: usize, signed: bool) -> TypeNode {
        TypeNode::Int {
            name: String::new(),
            size,
            signed,
        }
    }

    fn point_tree(y_size: usize) -> TypeNode {
        TypeNode::Struct {
            name: "point".into(),
            size: None,
            members: vec![
                MemberNode::new("x", int(4, true)),
                MemberNode::new("y", int(y_size, true)),
            ],
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let catalog = TypeCatalog::new();
        assert!(catalog.is_empty());
        catalog.register("point", &point_tree(4)).unwrap();
        let desc = catalog.resolve("point").unwrap();
        assert_eq!(desc.name, "point");
        assert!(catalog.resolve("missing").is_none());
        // register() alone does not build a layout
        assert!(catalog.layout("point").is_none());
    }

    #[test]
    fn test_identical_reregistration_is_noop() {
        let catalog = TypeCatalog::new();
        catalog.register("point", &point_tree(4)).unwrap();
        catalog.register("point", &point_tree(4)).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_conflicting_reregistration_keeps_prior() {
        let catalog = TypeCatalog::new();
        let first = catalog.register_struct("point", &point_tree(4)).unwrap();
        let err = catalog.register_struct("point", &point_tree(8)).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Conflicting(ConflictingTypeError {
                name: "point".into()
            })
        );
        let kept = catalog.layout("point").unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
        assert_eq!(kept.size_bytes(), 8);
    }

    #[test]
    fn test_unsupported_struct_is_not_inserted() {
        let catalog = TypeCatalog::new();
        let tree = TypeNode::Struct {
            name: "linked".into(),
            size: None,
            members: vec![MemberNode::new(
                "next",
                TypeNode::Pointer {
                    name: "struct linked *".into(),
                },
            )],
        };
        let err = catalog.register_struct("linked", &tree).unwrap_err();
        assert!(matches!(err, RegistrationError::Unsupported(_)));
        assert!(catalog.resolve("linked").is_none());
    }

    #[test]
    fn test_malformed_tree_is_rejected() {
        let catalog = TypeCatalog::new();
        let err = catalog
            .register("bad", &TypeNode::Struct {
                name: "bad".into(),
                size: None,
                members: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Malformed(_)));
    }

    #[test]
    fn test_oversized_struct_is_rejected() {
        let catalog = TypeCatalog::new();
        let wide = TypeNode::from_json(
            r#"{ "kind": "struct", "name": "wide", "members": [
                { "name": "a", "type": { "kind": "int", "size": 8 } },
                { "name": "b", "type": { "kind": "char_array", "len": 18446744073709551615 } } ] }"#,
        )
        .unwrap();
        let err = catalog.register_struct("wide", &wide).unwrap_err();
        assert!(matches!(err, RegistrationError::Malformed(_)));

        let long = TypeNode::from_json(
            r#"{ "kind": "struct", "name": "long", "members": [
                { "name": "v", "type": { "kind": "array", "len": 2305843009213693952,
                                         "element": { "kind": "int", "size": 8 } } } ] }"#,
        )
        .unwrap();
        let err = catalog.register_struct("long", &long).unwrap_err();
        assert!(matches!(err, RegistrationError::Malformed(_)));

        // builder descriptors skip tree validation and are caught by the layout
        let built = TypeDescriptorBuilder::new("odd")
            .int_field("x", 3, false)
            .build();
        let err = catalog.register_struct_descriptor(built).unwrap_err();
        assert!(matches!(err, RegistrationError::Unsupported(_)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_reference_to_registered_type() {
        let catalog = TypeCatalog::new();
        catalog.register("point", &point_tree(4)).unwrap();
        let line = TypeNode::Struct {
            name: "line".into(),
            size: Some(16),
            members: vec![
                MemberNode::new("from", TypeNode::Ref { name: "point".into() }),
                MemberNode::new("to", TypeNode::Ref { name: "point".into() }),
            ],
        };
        let layout = catalog.register_struct("line", &line).unwrap();
        assert_eq!(layout.leaf("to.y").unwrap().offset, 12);
    }

    #[test]
    fn test_register_struct_descriptor_and_unregister() {
        let catalog = TypeCatalog::new();
        let desc = TypeDescriptorBuilder::new("exit").i32_field("code").build();
        let layout = catalog.register_struct_descriptor(desc).unwrap();
        assert_eq!(layout.size_bytes(), 4);
        assert_eq!(catalog.names(), ["exit"]);

        assert!(catalog.unregister("exit"));
        assert!(!catalog.unregister("exit"));
        assert!(catalog.layout("exit").is_none());
        // the handed-out layout is still usable
        assert_eq!(layout.fields().len(), 1);
    }

    #[test]
    fn test_concurrent_readers() {
        let catalog = Arc::new(TypeCatalog::new());
        catalog.register_struct("point", &point_tree(4)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let layout = catalog.layout("point").expect("layout registered");
                        assert_eq!(layout.size_bytes(), 8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("reader thread should succeed");
        }
    }
}
