// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry integration tests: build-once semantics under contention,
//! failure retry, nested linking and self-referential sequences.

use hdds_introspect::{
    catalog, BuildError, FieldKind, IntrospectError, Introspector, MessageDescriptor,
    MessageDescriptorBuilder, TypeKey, TypeRegistry, TYPESUPPORT_IDENTIFIER,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn sensor() -> Result<MessageDescriptor, BuildError> {
    MessageDescriptorBuilder::new("test__msg", "Sensor")
        .field("id", FieldKind::U32)
        .field("reading", FieldKind::F64)
        .string_field("unit")
        .build()
}

#[test]
fn test_concurrent_first_resolve_builds_once() {
    const THREADS: usize = 8;

    let registry = Arc::new(TypeRegistry::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let builds = Arc::clone(&builds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .resolve("test__msg", "Sensor", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        sensor()
                    })
                    .expect("resolve")
            })
        })
        .collect();

    let descriptors: Vec<Arc<MessageDescriptor>> =
        handles.into_iter().map(|h| h.join().expect("thread panicked")).collect();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    for desc in &descriptors[1..] {
        assert!(Arc::ptr_eq(&descriptors[0], desc));
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_distinct_keys_do_not_share_entries() {
    let registry = TypeRegistry::new();
    let a = registry
        .resolve("test__msg", "Sensor", sensor)
        .expect("Sensor");
    let b = registry
        .resolve("test__msg", "Other", || {
            MessageDescriptorBuilder::new("test__msg", "Other")
                .field("flag", FieldKind::Bool)
                .build()
        })
        .expect("Other");

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(
        registry.keys(),
        vec![TypeKey::new("test__msg", "Other"), TypeKey::new("test__msg", "Sensor")]
    );
}

#[test]
fn test_second_resolve_skips_builder() {
    let registry = TypeRegistry::new();
    let first = registry.resolve("test__msg", "Sensor", sensor).expect("first");
    let second = registry
        .resolve("test__msg", "Sensor", || -> Result<MessageDescriptor, BuildError> {
            panic!("builder must not run for a registered type")
        })
        .expect("second");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_failed_build_is_retried() {
    let registry = TypeRegistry::new();
    let err = registry
        .resolve("test__msg", "Sensor", || {
            Err::<MessageDescriptor, _>(BuildError::Builder("generator unavailable".into()))
        })
        .unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::Builder(_))));
    assert!(!registry.contains("test__msg", "Sensor"));
    assert!(registry.is_empty());

    let desc = registry.resolve("test__msg", "Sensor", sensor).expect("retry");
    assert_eq!(desc.field_count(), 3);
    assert!(registry.contains("test__msg", "Sensor"));
}

#[test]
fn test_invalid_table_is_rejected_and_not_stored() {
    let registry = TypeRegistry::new();
    let err = registry
        .resolve("test__msg", "Dup", || {
            MessageDescriptorBuilder::new("test__msg", "Dup")
                .field("x", FieldKind::U8)
                .field("x", FieldKind::U8)
                .build()
        })
        .unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::DuplicateField { .. })));
    assert!(registry.get("test__msg", "Dup").is_none());
}

#[test]
fn test_key_mismatch() {
    let registry = TypeRegistry::new();
    let err = registry.resolve("test__msg", "Expected", sensor).unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::KeyMismatch { .. })));
    assert!(registry.is_empty());
}

#[test]
fn test_recursive_resolve_of_same_key_fails() {
    let registry = TypeRegistry::new();
    let err = registry
        .resolve("test__msg", "Loop", || {
            let inner = registry.resolve("test__msg", "Loop", sensor)?;
            MessageDescriptorBuilder::new("test__msg", "Loop")
                .message_field("inner", &inner)
                .build()
                .map_err(IntrospectError::from)
        })
        .unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::RecursiveBuild { .. })));
    assert!(!registry.contains("test__msg", "Loop"));
}

#[test]
fn test_self_referential_sequence_links_to_itself() {
    let registry = TypeRegistry::new();
    let node = registry
        .resolve("test__msg", "Node", || {
            MessageDescriptorBuilder::new("test__msg", "Node")
                .field("value", FieldKind::I32)
                .message_sequence_field("children", TypeKey::new("test__msg", "Node"))
                .build()
        })
        .expect("Node");

    let children = node.get_field("children").expect("children");
    let linked = children.nested_descriptor().expect("linked");
    assert!(Arc::ptr_eq(&node, &linked));
}

#[test]
fn test_unregistered_nested_sequence_target_fails() {
    let registry = TypeRegistry::new();
    let err = registry
        .resolve("test__msg", "Holder", || {
            MessageDescriptorBuilder::new("test__msg", "Holder")
                .message_sequence_field("items", TypeKey::new("test__msg", "Missing"))
                .build()
        })
        .unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::UnresolvedNested { .. })));
}

#[test]
fn test_nested_inline_type_must_be_registered() {
    let registry = TypeRegistry::new();
    let outer = |inner: &Arc<MessageDescriptor>| {
        MessageDescriptorBuilder::new("test__msg", "Reading")
            .field("seq", FieldKind::U16)
            .message_field("sensor", inner)
            .build()
    };

    let local = sensor().expect("sensor").into_shared().expect("shared");
    let err = registry.resolve("test__msg", "Reading", || outer(&local)).unwrap_err();
    assert!(matches!(
        err,
        IntrospectError::Build(BuildError::UnresolvedNested { ref field, .. }) if field == "sensor"
    ));
    assert!(!registry.contains("test__msg", "Reading"));

    let registered = registry.resolve("test__msg", "Sensor", sensor).expect("Sensor");
    let desc = registry.resolve("test__msg", "Reading", || outer(&local)).expect("Reading");
    drop(local);

    let linked = desc.get_field("sensor").expect("field").nested_descriptor().expect("live link");
    assert!(Arc::ptr_eq(&linked, &registered));
    let engine = Introspector::new();
    let buffer = engine.create(&desc).expect("create after local drop");
    assert_eq!(buffer.len(), desc.total_size());
}

#[test]
fn test_nested_layout_must_match_registered_type() {
    let registry = TypeRegistry::new();
    registry.resolve("test__msg", "Sensor", sensor).expect("Sensor");
    let other = MessageDescriptorBuilder::new("test__msg", "Sensor")
        .field("id", FieldKind::U8)
        .build()
        .expect("other layout")
        .into_shared()
        .expect("shared");
    let err = registry
        .resolve("test__msg", "Wrapper", || {
            MessageDescriptorBuilder::new("test__msg", "Wrapper")
                .message_field("sensor", &other)
                .build()
        })
        .unwrap_err();
    assert!(matches!(err, IntrospectError::Build(BuildError::UnresolvedNested { .. })));
}

#[test]
fn test_lookup_and_type_support() {
    let registry = TypeRegistry::new();
    assert!(registry.lookup("bluerov2_msgs__msg", "SetDepth").unwrap_err().is_not_found());

    catalog::resolve_ros2(&registry, "bluerov2_msgs/msg/SetDepth").expect("SetDepth");
    let handle = registry.type_support("bluerov2_msgs__msg", "SetDepth").expect("handle");
    assert_eq!(handle.identifier, TYPESUPPORT_IDENTIFIER);
    assert_eq!(handle.descriptor.type_name(), "bluerov2_msgs__msg::SetDepth");
    assert_eq!(handle.descriptor.total_size(), 16);
}

#[test]
fn test_register_keeps_existing_entry() {
    let registry = TypeRegistry::new();
    let first = registry.register(sensor().expect("sensor")).expect("register");
    let again = registry.register(sensor().expect("sensor")).expect("register again");
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn test_catalog_resolution_is_shared_across_threads() {
    let registry = Arc::new(TypeRegistry::new());
    let handles: Vec<_> = ["std_msgs/msg/Header", "std_msgs/Header", "std_msgs::msg::Header"]
        .into_iter()
        .map(|name| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || catalog::resolve_ros2(&registry, name).expect("Header"))
        })
        .collect();
    let headers: Vec<_> = handles.into_iter().map(|h| h.join().expect("thread panicked")).collect();
    assert!(Arc::ptr_eq(&headers[0], &headers[1]));
    assert!(Arc::ptr_eq(&headers[1], &headers[2]));
    assert_eq!(registry.len(), 2);
}
