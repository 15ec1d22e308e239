// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: `(namespace, name)` to shared message descriptor.
//!
//! Entries are built lazily on first [`TypeRegistry::resolve`], exactly once
//! per key. Concurrent first callers for the same key block on a per-key lock
//! until the winner finishes and then share its `Arc`; different keys never
//! contend. A failed build stores nothing, so a later call retries.
//!
//! Nested message types are linked at build time. A builder may resolve other
//! keys through the same registry (e.g. `Header` resolving `Time`).
//! Resolving the key being built from inside its own builder fails with
//! [`BuildError::RecursiveBuild`]. Two threads whose builders resolve each
//! other's key in a cycle will block each other; schemas are expected to be
//! acyclic apart from sequence self-reference, which needs no resolve.

use crate::descriptor::{MessageDescriptor, TypeKey};
use crate::error::{BuildError, IntrospectError};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Identifier reported by [`TypeSupportHandle`].
pub const TYPESUPPORT_IDENTIFIER: &str = "rosidl_typesupport_introspection_c";

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // (registry id, key) pairs currently being built on this thread.
    static BUILDING: RefCell<Vec<(u64, TypeKey)>> = const { RefCell::new(Vec::new()) };
}

/// Handle returned to typesupport callers.
#[derive(Debug, Clone)]
pub struct TypeSupportHandle {
    pub identifier: &'static str,
    pub descriptor: Arc<MessageDescriptor>,
}

#[derive(Debug, Default)]
struct Slot {
    cell: OnceLock<Arc<MessageDescriptor>>,
    build_lock: Mutex<()>,
}

/// Registry of message descriptors.
///
/// Owned by the composition root and shared by reference or `Arc`; there is
/// no global instance.
#[derive(Debug)]
pub struct TypeRegistry {
    id: u64,
    slots: DashMap<TypeKey, Arc<Slot>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            slots: DashMap::new(),
        }
    }

    /// Return the descriptor for `namespace::name`, building it with `builder`
    /// if it is not registered yet.
    pub fn resolve<F, E>(
        &self,
        namespace: &str,
        name: &str,
        builder: F,
    ) -> Result<Arc<MessageDescriptor>, IntrospectError>
    where
        F: FnOnce() -> Result<MessageDescriptor, E>,
        E: Into<IntrospectError>,
    {
        self.resolve_key(&TypeKey::new(namespace, name), builder)
    }

    /// [`resolve`](Self::resolve) with an existing key.
    pub fn resolve_key<F, E>(
        &self,
        key: &TypeKey,
        builder: F,
    ) -> Result<Arc<MessageDescriptor>, IntrospectError>
    where
        F: FnOnce() -> Result<MessageDescriptor, E>,
        E: Into<IntrospectError>,
    {
        let slot = self.slot(key);
        if let Some(desc) = slot.cell.get() {
            return Ok(Arc::clone(desc));
        }
        if self.is_building(key) {
            return Err(BuildError::RecursiveBuild { key: key.clone() }.into());
        }

        let _lock = slot.build_lock.lock();
        if let Some(desc) = slot.cell.get() {
            return Ok(Arc::clone(desc));
        }

        let built = {
            let _guard = BuildGuard::enter(self.id, key.clone());
            builder().map_err(Into::into).and_then(|desc| self.link(key, desc))
        };
        match built {
            Ok(desc) => {
                log::debug!(
                    "[registry] built {} ({} fields, {} bytes)",
                    key,
                    desc.field_count(),
                    desc.total_size()
                );
                Ok(Arc::clone(slot.cell.get_or_init(|| desc)))
            }
            Err(err) => {
                log::warn!("[registry] failed to build {}: {}", key, err);
                Err(err)
            }
        }
    }

    /// Register an already constructed descriptor.
    ///
    /// An existing entry for the same key wins and is returned unchanged.
    pub fn register(
        &self,
        descriptor: MessageDescriptor,
    ) -> Result<Arc<MessageDescriptor>, IntrospectError> {
        let key = descriptor.key();
        self.resolve_key(&key, || Ok::<_, BuildError>(descriptor))
    }

    /// Registered descriptor, if any. Never builds.
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<MessageDescriptor>> {
        self.get_key(&TypeKey::new(namespace, name))
    }

    pub fn get_key(&self, key: &TypeKey) -> Option<Arc<MessageDescriptor>> {
        self.slots.get(key).and_then(|slot| slot.cell.get().cloned())
    }

    /// Registered descriptor or `TypeNotFound`.
    pub fn lookup(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Arc<MessageDescriptor>, IntrospectError> {
        let key = TypeKey::new(namespace, name);
        self.get_key(&key).ok_or(IntrospectError::TypeNotFound(key))
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.get(namespace, name).is_some()
    }

    /// Number of built entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| entry.value().cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of built entries, sorted.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self
            .slots
            .iter()
            .filter(|entry| entry.value().cell.get().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Typesupport handle for a registered type.
    pub fn type_support(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<TypeSupportHandle, IntrospectError> {
        Ok(TypeSupportHandle {
            identifier: TYPESUPPORT_IDENTIFIER,
            descriptor: self.lookup(namespace, name)?,
        })
    }

    fn slot(&self, key: &TypeKey) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.slots.entry(key.clone()).or_default())
    }

    fn link(
        &self,
        key: &TypeKey,
        desc: MessageDescriptor,
    ) -> Result<Arc<MessageDescriptor>, IntrospectError> {
        let actual = desc.key();
        if actual != *key {
            return Err(BuildError::KeyMismatch {
                expected: key.clone(),
                actual,
            }
            .into());
        }
        Ok(desc.into_linked(|nested| self.get_key(nested))?)
    }

    fn is_building(&self, key: &TypeKey) -> bool {
        BUILDING.with(|stack| stack.borrow().iter().any(|(id, k)| *id == self.id && k == key))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct BuildGuard;

impl BuildGuard {
    fn enter(registry: u64, key: TypeKey) -> Self {
        BUILDING.with(|stack| stack.borrow_mut().push((registry, key)));
        BuildGuard
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldKind, MessageDescriptorBuilder};

    fn point() -> Result<MessageDescriptor, BuildError> {
        MessageDescriptorBuilder::new("geometry_msgs__msg", "Point")
            .field("x", FieldKind::F64)
            .field("y", FieldKind::F64)
            .field("z", FieldKind::F64)
            .build()
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let registry = TypeRegistry::new();
        let a = registry.resolve("geometry_msgs__msg", "Point", point).expect("first");
        let b = registry
            .resolve("geometry_msgs__msg", "Point", || -> Result<MessageDescriptor, BuildError> {
                panic!("builder must not run twice")
            })
            .expect("second");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_key_mismatch_is_build_failure() {
        let registry = TypeRegistry::new();
        let err = registry.resolve("geometry_msgs__msg", "Vector3", point).unwrap_err();
        assert!(matches!(err, IntrospectError::Build(BuildError::KeyMismatch { .. })));
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn test_lookup_unknown_is_not_found() {
        let registry = TypeRegistry::new();
        let err = registry.lookup("pkg__msg", "Missing").unwrap_err();
        assert!(err.is_not_found());
        assert!(registry.type_support("pkg__msg", "Missing").is_err());
    }

    #[test]
    fn test_recursive_build_detected() {
        let registry = TypeRegistry::new();
        let err = registry
            .resolve("pkg__msg", "Loop", || {
                registry.resolve("pkg__msg", "Loop", || {
                    MessageDescriptorBuilder::new("pkg__msg", "Loop").build()
                })?;
                MessageDescriptorBuilder::new("pkg__msg", "Loop")
                    .build()
                    .map_err(IntrospectError::from)
            })
            .unwrap_err();
        assert_eq!(
            err,
            IntrospectError::Build(BuildError::RecursiveBuild {
                key: TypeKey::new("pkg__msg", "Loop")
            })
        );
        assert!(!registry.contains("pkg__msg", "Loop"));
    }
}
