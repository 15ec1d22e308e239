// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Golden byte layouts and malformed-input rejection for the wire codec.
//!
//! Layout: little-endian, primitives aligned to their size from the stream
//! start, strings and sequences prefixed by an aligned `u32`, no header.

use hdds_introspect::{
    catalog, DecodeError, DecodeErrorKind, FieldKind, IntrospectConfig, IntrospectError,
    Introspector, MessageDescriptor, MessageDescriptorBuilder, MessageMut, MessageRef, TypeRegistry,
    Value,
};
use std::sync::Arc;

fn builtin(registry: &TypeRegistry, name: &str) -> Arc<MessageDescriptor> {
    catalog::resolve_ros2(registry, name).expect("builtin type")
}

fn local(builder: MessageDescriptorBuilder) -> Arc<MessageDescriptor> {
    builder.build().expect("build").into_shared().expect("link")
}

fn encode_with<F>(engine: &Introspector, desc: &Arc<MessageDescriptor>, fill: F) -> Vec<u8>
where
    F: FnOnce(&mut MessageMut<'_>),
{
    let mut buffer = engine.create(desc).expect("create");
    {
        let mut msg = MessageMut::new(&mut buffer, desc).expect("view");
        fill(&mut msg);
    }
    engine
        .serialize(&MessageRef::new(&buffer, desc).expect("view"))
        .expect("serialize")
}

fn decode_error(result: Result<hdds_introspect::MessageBuffer, IntrospectError>) -> DecodeError {
    match result {
        Err(IntrospectError::Decode(err)) => err,
        Err(other) => panic!("expected decode error, got {other}"),
        Ok(_) => panic!("expected decode error, got success"),
    }
}

// Golden layouts

#[test]
fn test_set_depth_default_is_sixteen_zero_bytes() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "bluerov2_msgs/msg/SetDepth");
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |_| {});
    assert_eq!(bytes, vec![0u8; 16]);

    let decoded = engine.decode(&bytes, &desc).expect("decode");
    assert_eq!(decoded, engine.create(&desc).expect("create"));
    assert!(desc.get_field("does_not_exist").unwrap_err().is_not_found());
}

#[test]
fn test_set_depth_populated() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "bluerov2_msgs/msg/SetDepth");
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        engine.set(msg, "enable_depth_ctrl", true).expect("enable");
        engine.set(msg, "pwm_max", 1500u16).expect("pwm_max");
        engine.set(msg, "ki", 1u32).expect("ki");
        engine.set(msg, "kp", 2u32).expect("kp");
        engine.set(msg, "kd", 3u32).expect("kd");
    });
    assert_eq!(
        bytes,
        vec![
            0x01, 0x00, 0xDC, 0x05, // enable_depth_ctrl, pad, pwm_max
            0x01, 0x00, 0x00, 0x00, // ki
            0x02, 0x00, 0x00, 0x00, // kp
            0x03, 0x00, 0x00, 0x00, // kd
        ]
    );

    let decoded = engine.decode(&bytes, &desc).expect("decode");
    let msg = MessageRef::new(&decoded, &desc).expect("view");
    assert_eq!(engine.get(&msg, "pwm_max").expect("get").into_scalar(), Some(Value::U16(1500)));
    assert_eq!(engine.get(&msg, "kd").expect("get").into_scalar(), Some(Value::U32(3)));
}

#[test]
fn test_string_layout() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "std_msgs/msg/String");
    let engine = Introspector::new();

    let empty = encode_with(&engine, &desc, |_| {});
    assert_eq!(empty, vec![0x01, 0x00, 0x00, 0x00, 0x00]);

    let hi = encode_with(&engine, &desc, |msg| engine.set(msg, "data", "hi").expect("data"));
    assert_eq!(hi, vec![0x03, 0x00, 0x00, 0x00, b'h', b'i', 0x00]);
}

#[test]
fn test_nested_message_is_inline() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "std_msgs/msg/Header");
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        let stamp = Value::Message(vec![
            ("sec".into(), Value::I32(1)),
            ("nanosec".into(), Value::U32(2)),
        ]);
        engine.set(msg, "stamp", stamp).expect("stamp");
        engine.set(msg, "frame_id", "map").expect("frame_id");
    });
    assert_eq!(
        bytes,
        vec![
            0x01, 0x00, 0x00, 0x00, // stamp.sec
            0x02, 0x00, 0x00, 0x00, // stamp.nanosec
            0x04, 0x00, 0x00, 0x00, b'm', b'a', b'p', 0x00, // frame_id
        ]
    );
}

#[test]
fn test_alignment_is_relative_to_stream_start() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Padded")
            .field("flag", FieldKind::Bool)
            .field("value", FieldKind::F64)
            .field("tail", FieldKind::U8)
            .field("count", FieldKind::U16),
    );
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        engine.set(msg, "flag", true).expect("flag");
        engine.set(msg, "value", 1.0f64).expect("value");
        engine.set(msg, "tail", 0xAAu8).expect("tail");
        engine.set(msg, "count", 0x0102u16).expect("count");
    });
    let mut expected = vec![0x01, 0, 0, 0, 0, 0, 0, 0];
    expected.extend_from_slice(&1.0f64.to_le_bytes());
    expected.extend_from_slice(&[0xAA, 0x00, 0x02, 0x01]);
    assert_eq!(bytes, expected);
}

#[test]
fn test_string_after_byte_is_padded() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Tagged")
            .field("id", FieldKind::U8)
            .string_field("tag"),
    );
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        engine.set(msg, "id", 7u8).expect("id");
        engine.set(msg, "tag", "a").expect("tag");
    });
    assert_eq!(bytes, vec![0x07, 0, 0, 0, 0x02, 0, 0, 0, b'a', 0x00]);
}

#[test]
fn test_fixed_array_has_no_length_prefix() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Gains")
            .field("mode", FieldKind::U8)
            .array_field("gains", FieldKind::U16, 3),
    );
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        engine.set(msg, "mode", 9u8).expect("mode");
        engine.set(msg, "gains", vec![1u16, 2, 3]).expect("gains");
    });
    assert_eq!(bytes, vec![0x09, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);
}

#[test]
fn test_sequence_layout() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "std_msgs/msg/Int32MultiArray");
    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |msg| {
        engine.set(msg, "data", vec![1i32, -1]).expect("data");
    });
    assert_eq!(
        bytes,
        vec![
            0x00, 0x00, 0x00, 0x00, // layout.dim count
            0x00, 0x00, 0x00, 0x00, // layout.data_offset
            0x02, 0x00, 0x00, 0x00, // data count
            0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        ]
    );
}

#[test]
fn test_zero_field_message() {
    let desc = local(MessageDescriptorBuilder::new("test__msg", "Empty"));
    assert_eq!(desc.total_size(), 0);

    let engine = Introspector::new();
    let bytes = encode_with(&engine, &desc, |_| {});
    assert!(bytes.is_empty());
    engine.decode(&[], &desc).expect("empty input");

    let err = decode_error(engine.decode(&[0], &desc));
    assert_eq!(err.kind, DecodeErrorKind::TrailingBytes { remaining: 1 });
}

// Malformed input

#[test]
fn test_truncated_input() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "bluerov2_msgs/msg/SetDepth");
    let engine = Introspector::new();
    let err = decode_error(engine.decode(&[0u8; 15], &desc));
    assert_eq!(err.offset, 12);
    assert_eq!(err.kind, DecodeErrorKind::Truncated { need: 4, have: 3 });
}

#[test]
fn test_trailing_bytes() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "bluerov2_msgs/msg/SetDepth");
    let engine = Introspector::new();
    let err = decode_error(engine.decode(&[0u8; 17], &desc));
    assert_eq!(err.offset, 16);
    assert_eq!(err.kind, DecodeErrorKind::TrailingBytes { remaining: 1 });
}

#[test]
fn test_invalid_bool() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "bluerov2_msgs/msg/SetDepth");
    let engine = Introspector::new();
    let mut bytes = vec![0u8; 16];
    bytes[0] = 2;
    let err = decode_error(engine.decode(&bytes, &desc));
    assert_eq!(err.offset, 0);
    assert_eq!(err.kind, DecodeErrorKind::InvalidBool(2));
}

#[test]
fn test_string_errors() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "std_msgs/msg/String");
    let engine = Introspector::new();

    let err = decode_error(engine.decode(&[0x03, 0, 0, 0, b'h', b'i', b'!'], &desc));
    assert!(matches!(err.kind, DecodeErrorKind::InvalidString(_)));
    assert_eq!(err.offset, 6);

    let err = decode_error(engine.decode(&[0, 0, 0, 0], &desc));
    assert!(matches!(err.kind, DecodeErrorKind::InvalidString(_)));

    let err = decode_error(engine.decode(&[0x03, 0, 0, 0, 0xFF, b'A', 0], &desc));
    assert_eq!(err.kind, DecodeErrorKind::InvalidUtf8);
    assert_eq!(err.offset, 4);

    let err = decode_error(engine.decode(&[0x09, 0, 0, 0, b'a'], &desc));
    assert!(matches!(err.kind, DecodeErrorKind::Truncated { need: 9, have: 1 }));
}

#[test]
fn test_bounds_enforced_on_decode() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Bounded")
            .bounded_string_field("tag", 2)
            .bounded_sequence_field("values", FieldKind::U8, 2),
    );
    let engine = Introspector::new();

    let err = decode_error(engine.decode(&[0x04, 0, 0, 0, b'a', b'b', b'c', 0, 0, 0, 0, 0], &desc));
    assert!(matches!(err.kind, DecodeErrorKind::BoundExceeded { len: 3, bound: 2, .. }));

    let bytes = [0x01, 0, 0, 0, 0, 0, 0, 0, 0x03, 0, 0, 0, 1, 2, 3];
    let err = decode_error(engine.decode(&bytes, &desc));
    assert!(matches!(err.kind, DecodeErrorKind::BoundExceeded { len: 3, bound: 2, .. }));
    assert_eq!(err.offset, 8);

    let ok = engine
        .decode(&[0x03, 0, 0, 0, b'a', b'b', 0, 0, 0x02, 0, 0, 0, 1, 2], &desc)
        .expect("within bounds");
    let msg = MessageRef::new(&ok, &desc).expect("view");
    assert_eq!(engine.get(&msg, "tag").expect("tag").into_scalar(), Some(Value::from("ab")));
}

#[test]
fn test_sequence_count_limit() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Blob").sequence_field("data", FieldKind::U8),
    );

    let config = IntrospectConfig {
        max_sequence_len: 4,
        ..IntrospectConfig::default()
    };
    let engine = Introspector::with_config(&config);
    let err = decode_error(engine.decode(&[0x05, 0, 0, 0, 1, 2, 3, 4, 5], &desc));
    assert_eq!(err.kind, DecodeErrorKind::SequenceTooLong { len: 5, max: 4 });

    // A huge count is rejected before any allocation.
    let engine = Introspector::new();
    let err = decode_error(engine.decode(&[0xFF, 0xFF, 0xFF, 0xFF], &desc));
    assert!(matches!(err.kind, DecodeErrorKind::SequenceTooLong { len: 0xFFFF_FFFF, .. }));
}

#[test]
fn test_sequence_count_checked_against_remaining_input() {
    let desc = local(
        MessageDescriptorBuilder::new("test__msg", "Samples")
            .sequence_field("data", FieldKind::U32),
    );
    let engine = Introspector::new();
    let err = decode_error(engine.decode(&[0xE8, 0x03, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0], &desc));
    assert_eq!(err.kind, DecodeErrorKind::Truncated { need: 4000, have: 8 });
    assert_eq!(err.offset, 4);

    // Elements that encode to nothing get a small fixed limit.
    let empty = local(MessageDescriptorBuilder::new("test__msg", "Empty"));
    let holder = local(
        MessageDescriptorBuilder::new("test__msg", "Holder").message_sequence_of("items", &empty),
    );
    engine.decode(&[0x03, 0, 0, 0], &holder).expect("three empty items");
    let err = decode_error(engine.decode(&[0x01, 0x10, 0, 0], &holder));
    assert_eq!(err.kind, DecodeErrorKind::SequenceTooLong { len: 4097, max: 4096 });
}

#[test]
fn test_reencode_is_byte_identical() {
    let registry = TypeRegistry::new();
    let desc = builtin(&registry, "std_msgs/msg/Header");
    let engine = Introspector::new();
    let bytes = vec![
        0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, b'b', b'a', b's',
        b'e', 0x00,
    ];
    let decoded = engine.decode(&bytes, &desc).expect("decode");
    let again = engine
        .serialize(&MessageRef::new(&decoded, &desc).expect("view"))
        .expect("serialize");
    assert_eq!(again, bytes);
}
