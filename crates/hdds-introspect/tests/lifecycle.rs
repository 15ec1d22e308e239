// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Init/fini behavior: initialization modes, ownership release, misuse
//! detection and custom per-type lifecycles.

use hdds_introspect::{
    BufferState, DefaultLifecycle, FieldKind, InitMode, IntrospectError, Introspector,
    MessageBuffer, MessageDescriptor, MessageDescriptorBuilder, MessageLifecycle, MessageMut,
    MessageRef, MessageRegion, TypeRegistry, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn config_descriptor() -> Arc<MessageDescriptor> {
    MessageDescriptorBuilder::new("test__msg", "Config")
        .field("enabled", FieldKind::Bool)
        .with_default(true)
        .field("limit", FieldKind::U16)
        .with_default(1500u16)
        .field("gain", FieldKind::U32)
        .string_field("name")
        .with_default("pump")
        .sequence_field("history", FieldKind::F32)
        .build()
        .expect("build")
        .into_shared()
        .expect("link")
}

fn read(
    engine: &Introspector,
    buffer: &MessageBuffer,
    desc: &Arc<MessageDescriptor>,
    name: &str,
) -> Value {
    let msg = MessageRef::new(buffer, desc).expect("view");
    match engine.get(&msg, name).expect("get").into_scalar() {
        Some(value) => value,
        None => Value::Sequence(Vec::new()),
    }
}

#[test]
fn test_init_applies_defaults() {
    let desc = config_descriptor();
    let engine = Introspector::new();
    let buffer = engine.create(&desc).expect("create");
    assert_eq!(buffer.state(), BufferState::Ready);
    assert_eq!(read(&engine, &buffer, &desc, "enabled"), Value::Bool(true));
    assert_eq!(read(&engine, &buffer, &desc, "limit"), Value::U16(1500));
    assert_eq!(read(&engine, &buffer, &desc, "gain"), Value::U32(0));
    assert_eq!(read(&engine, &buffer, &desc, "name"), Value::from("pump"));
}

#[test]
fn test_init_modes() {
    let desc = config_descriptor();
    let engine = Introspector::new();
    let mut buffer = engine.create(&desc).expect("create");
    {
        let mut msg = MessageMut::new(&mut buffer, &desc).expect("view");
        engine.set(&mut msg, "limit", 7u16).expect("limit");
        engine.set(&mut msg, "gain", 99u32).expect("gain");
    }

    desc.init_with(&mut buffer, InitMode::Skip).expect("skip");
    assert_eq!(read(&engine, &buffer, &desc, "limit"), Value::U16(7));

    desc.init_with(&mut buffer, InitMode::DefaultsOnly).expect("defaults only");
    assert_eq!(read(&engine, &buffer, &desc, "limit"), Value::U16(1500));
    assert_eq!(read(&engine, &buffer, &desc, "gain"), Value::U32(99));

    desc.init_with(&mut buffer, InitMode::Zero).expect("zero");
    assert_eq!(read(&engine, &buffer, &desc, "enabled"), Value::Bool(false));
    assert_eq!(read(&engine, &buffer, &desc, "gain"), Value::U32(0));
    assert_eq!(read(&engine, &buffer, &desc, "name"), Value::from(""));
}

#[test]
fn test_reinit_releases_owned_data() {
    let desc = config_descriptor();
    let engine = Introspector::new();
    let mut buffer = engine.create(&desc).expect("create");
    {
        let mut msg = MessageMut::new(&mut buffer, &desc).expect("view");
        engine.set(&mut msg, "name", "thruster").expect("name");
        engine.set(&mut msg, "history", vec![1.0f32, 2.0, 3.0]).expect("history");
    }
    engine.init(&mut buffer, &desc).expect("re-init");
    assert_eq!(buffer, engine.create(&desc).expect("create"));
}

#[test]
fn test_fini_then_use_is_rejected() {
    let desc = config_descriptor();
    let engine = Introspector::new();
    let mut buffer = engine.create(&desc).expect("create");
    desc.fini(&mut buffer).expect("fini");
    assert_eq!(buffer.state(), BufferState::Finalized);
    assert_eq!(buffer.len(), desc.total_size());

    assert!(matches!(MessageRef::new(&buffer, &desc), Err(IntrospectError::Lifecycle(_))));
    assert!(matches!(MessageMut::new(&mut buffer, &desc), Err(IntrospectError::Lifecycle(_))));
    assert!(matches!(desc.fini(&mut buffer), Err(IntrospectError::Lifecycle(_))));

    // Decoding into a finalized buffer re-initializes it.
    let bytes = engine
        .serialize(&MessageRef::new(&engine.create(&desc).expect("create"), &desc).expect("view"))
        .expect("serialize");
    engine.deserialize(&bytes, &desc, &mut buffer).expect("deserialize");
    assert_eq!(buffer.state(), BufferState::Ready);
}

#[test]
fn test_undersized_buffer() {
    let desc = config_descriptor();
    let mut buffer = MessageBuffer::with_size(desc.total_size() - 1);
    assert!(matches!(desc.init(&mut buffer), Err(IntrospectError::BufferTooSmall { .. })));
    assert!(matches!(
        Introspector::new().deserialize(&[], &desc, &mut buffer),
        Err(IntrospectError::BufferTooSmall { .. })
    ));
}

/// Default behavior plus a marker value and call counters.
#[derive(Debug, Default)]
struct Stamped {
    inits: AtomicUsize,
    finis: AtomicUsize,
}

impl MessageLifecycle for Stamped {
    fn initialize(
        &self,
        descriptor: &MessageDescriptor,
        region: &mut MessageRegion<'_>,
        mode: InitMode,
    ) -> Result<(), IntrospectError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        DefaultLifecycle.initialize(descriptor, region, mode)?;
        let magic = descriptor.get_field("magic")?;
        region.store(magic, &Value::U16(0xBEEF))
    }

    fn finalize(&self, descriptor: &MessageDescriptor, region: &mut MessageRegion<'_>) {
        self.finis.fetch_add(1, Ordering::SeqCst);
        DefaultLifecycle.finalize(descriptor, region);
    }
}

#[test]
fn test_custom_lifecycle_runs_for_nested_fields() {
    let stamped = Arc::new(Stamped::default());
    let registry = TypeRegistry::new();
    let inner = registry
        .resolve("test__msg", "Tagged", || {
            MessageDescriptorBuilder::new("test__msg", "Tagged")
                .field("magic", FieldKind::U16)
                .lifecycle(stamped.clone())
                .build()
        })
        .expect("Tagged");
    let outer = registry
        .resolve("test__msg", "Pair", || {
            MessageDescriptorBuilder::new("test__msg", "Pair")
                .message_field("left", &inner)
                .message_array_field("rest", &inner, 2)
                .build()
        })
        .expect("Pair");

    let engine = Introspector::new();
    let mut buffer = engine.create(&outer).expect("create");
    assert_eq!(stamped.inits.load(Ordering::SeqCst), 3);
    assert_eq!(buffer.as_bytes(), &[0xEF, 0xBE, 0xEF, 0xBE, 0xEF, 0xBE]);

    outer.fini(&mut buffer).expect("fini");
    assert_eq!(stamped.finis.load(Ordering::SeqCst), 3);
}
