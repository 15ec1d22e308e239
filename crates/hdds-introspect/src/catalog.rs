// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in type builders.
//!
//! A small set of well-known ROS 2 message types, resolvable by their ROS
//! name (`"pkg/msg/Type"`, `"pkg/Type"` or `"pkg::msg::Type"`). Nested types
//! are resolved through the same registry before the outer type is built.

use crate::descriptor::{
    FieldKind, MessageDescriptor, MessageDescriptorBuilder, RosidlMember, TypeKey, ROS_TYPE_BOOLEAN,
    ROS_TYPE_UINT16, ROS_TYPE_UINT32,
};
use crate::error::IntrospectError;
use crate::registry::TypeRegistry;
use std::sync::Arc;

/// Builder signature used by the catalog.
pub type CatalogBuilder = fn(&TypeRegistry) -> Result<MessageDescriptor, IntrospectError>;

/// Every built-in type with its builder.
pub const BUILTIN_TYPES: &[(&str, CatalogBuilder)] = &[
    ("bluerov2_msgs/msg/SetDepth", bluerov2_set_depth),
    ("builtin_interfaces/msg/Time", builtin_time),
    ("std_msgs/msg/Bool", std_msgs_bool),
    ("std_msgs/msg/Int8", std_msgs_int8),
    ("std_msgs/msg/Int16", std_msgs_int16),
    ("std_msgs/msg/Int32", std_msgs_int32),
    ("std_msgs/msg/Int64", std_msgs_int64),
    ("std_msgs/msg/UInt8", std_msgs_uint8),
    ("std_msgs/msg/UInt16", std_msgs_uint16),
    ("std_msgs/msg/UInt32", std_msgs_uint32),
    ("std_msgs/msg/UInt64", std_msgs_uint64),
    ("std_msgs/msg/Float32", std_msgs_float32),
    ("std_msgs/msg/Float64", std_msgs_float64),
    ("std_msgs/msg/String", std_msgs_string),
    ("std_msgs/msg/Header", std_msgs_header),
    ("std_msgs/msg/MultiArrayDimension", std_msgs_multi_array_dimension),
    ("std_msgs/msg/MultiArrayLayout", std_msgs_multi_array_layout),
    ("std_msgs/msg/Int32MultiArray", std_msgs_int32_multi_array),
    ("geometry_msgs/msg/Point", geometry_msgs_point),
    ("geometry_msgs/msg/Point32", geometry_msgs_point32),
    ("geometry_msgs/msg/Vector3", geometry_msgs_vector3),
    ("geometry_msgs/msg/Quaternion", geometry_msgs_quaternion),
    ("geometry_msgs/msg/Pose", geometry_msgs_pose),
    ("geometry_msgs/msg/Twist", geometry_msgs_twist),
];

/// Builder for a ROS type name, if it is built in.
pub fn builder_for(type_name: &str) -> Option<CatalogBuilder> {
    let key = TypeKey::parse_ros2(type_name)?;
    builder_for_key(&key)
}

fn builder_for_key(key: &TypeKey) -> Option<CatalogBuilder> {
    BUILTIN_TYPES
        .iter()
        .find(|(name, _)| TypeKey::parse_ros2(name).as_ref() == Some(key))
        .map(|(_, builder)| *builder)
}

/// Resolve a built-in (or already registered) type by ROS name.
pub fn resolve_ros2(
    registry: &TypeRegistry,
    type_name: &str,
) -> Result<Arc<MessageDescriptor>, IntrospectError> {
    let key = TypeKey::parse_ros2(type_name)
        .ok_or_else(|| IntrospectError::TypeNotFound(TypeKey::new("", type_name)))?;
    if let Some(desc) = registry.get_key(&key) {
        return Ok(desc);
    }
    let builder = builder_for_key(&key).ok_or_else(|| IntrospectError::TypeNotFound(key.clone()))?;
    registry.resolve_key(&key, || builder(registry))
}

/// Resolve every built-in type; returns how many are registered afterwards.
pub fn register_builtin(registry: &TypeRegistry) -> Result<usize, IntrospectError> {
    for (name, _) in BUILTIN_TYPES {
        resolve_ros2(registry, name)?;
    }
    Ok(registry.len())
}

// bluerov2_msgs

/// Generated member table of `bluerov2_msgs/msg/SetDepth`.
pub const SET_DEPTH_MEMBERS: [RosidlMember; 5] = [
    RosidlMember::scalar("enable_depth_ctrl", ROS_TYPE_BOOLEAN, 0),
    RosidlMember::scalar("pwm_max", ROS_TYPE_UINT16, 2),
    RosidlMember::scalar("ki", ROS_TYPE_UINT32, 4),
    RosidlMember::scalar("kp", ROS_TYPE_UINT32, 8),
    RosidlMember::scalar("kd", ROS_TYPE_UINT32, 12),
];

/// `sizeof(bluerov2_msgs__msg__SetDepth)`.
pub const SET_DEPTH_SIZE: usize = 16;

fn bluerov2_set_depth(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(MessageDescriptor::from_rosidl_members(
        "bluerov2_msgs__msg",
        "SetDepth",
        SET_DEPTH_SIZE,
        &SET_DEPTH_MEMBERS,
        None,
    )?)
}

// builtin_interfaces

fn builtin_time(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(MessageDescriptorBuilder::new("builtin_interfaces__msg", "Time")
        .field("sec", FieldKind::I32)
        .field("nanosec", FieldKind::U32)
        .build()?)
}

// std_msgs

fn std_msgs_primitive(name: &str, kind: FieldKind) -> Result<MessageDescriptor, IntrospectError> {
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", name).field("data", kind).build()?)
}

macro_rules! std_msgs_primitive_builders {
    ($($func:ident => $name:literal, $kind:expr;)*) => {
        $(
            fn $func(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
                std_msgs_primitive($name, $kind)
            }
        )*
    };
}

std_msgs_primitive_builders! {
    std_msgs_bool => "Bool", FieldKind::Bool;
    std_msgs_int8 => "Int8", FieldKind::I8;
    std_msgs_int16 => "Int16", FieldKind::I16;
    std_msgs_int32 => "Int32", FieldKind::I32;
    std_msgs_int64 => "Int64", FieldKind::I64;
    std_msgs_uint8 => "UInt8", FieldKind::U8;
    std_msgs_uint16 => "UInt16", FieldKind::U16;
    std_msgs_uint32 => "UInt32", FieldKind::U32;
    std_msgs_uint64 => "UInt64", FieldKind::U64;
    std_msgs_float32 => "Float32", FieldKind::F32;
    std_msgs_float64 => "Float64", FieldKind::F64;
}

fn std_msgs_string(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", "String").string_field("data").build()?)
}

fn std_msgs_header(registry: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    let stamp = resolve_ros2(registry, "builtin_interfaces/msg/Time")?;
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", "Header")
        .message_field("stamp", &stamp)
        .string_field("frame_id")
        .build()?)
}

fn std_msgs_multi_array_dimension(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", "MultiArrayDimension")
        .string_field("label")
        .field("size", FieldKind::U32)
        .field("stride", FieldKind::U32)
        .build()?)
}

fn std_msgs_multi_array_layout(
    registry: &TypeRegistry,
) -> Result<MessageDescriptor, IntrospectError> {
    let dim = resolve_ros2(registry, "std_msgs/msg/MultiArrayDimension")?;
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", "MultiArrayLayout")
        .message_sequence_of("dim", &dim)
        .field("data_offset", FieldKind::U32)
        .build()?)
}

fn std_msgs_int32_multi_array(
    registry: &TypeRegistry,
) -> Result<MessageDescriptor, IntrospectError> {
    let layout = resolve_ros2(registry, "std_msgs/msg/MultiArrayLayout")?;
    Ok(MessageDescriptorBuilder::new("std_msgs__msg", "Int32MultiArray")
        .message_field("layout", &layout)
        .sequence_field("data", FieldKind::I32)
        .build()?)
}

// geometry_msgs

fn xyz(name: &str, kind: FieldKind) -> MessageDescriptorBuilder {
    MessageDescriptorBuilder::new("geometry_msgs__msg", name)
        .field("x", kind.clone())
        .field("y", kind.clone())
        .field("z", kind)
}

fn geometry_msgs_point(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(xyz("Point", FieldKind::F64).build()?)
}

fn geometry_msgs_point32(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(xyz("Point32", FieldKind::F32).build()?)
}

fn geometry_msgs_vector3(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    Ok(xyz("Vector3", FieldKind::F64).build()?)
}

fn geometry_msgs_quaternion(_: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    // Identity rotation by default.
    Ok(xyz("Quaternion", FieldKind::F64)
        .field("w", FieldKind::F64)
        .with_default(1.0f64)
        .build()?)
}

fn geometry_msgs_pose(registry: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    let position = resolve_ros2(registry, "geometry_msgs/msg/Point")?;
    let orientation = resolve_ros2(registry, "geometry_msgs/msg/Quaternion")?;
    Ok(MessageDescriptorBuilder::new("geometry_msgs__msg", "Pose")
        .message_field("position", &position)
        .message_field("orientation", &orientation)
        .build()?)
}

fn geometry_msgs_twist(registry: &TypeRegistry) -> Result<MessageDescriptor, IntrospectError> {
    let vector3 = resolve_ros2(registry, "geometry_msgs/msg/Vector3")?;
    Ok(MessageDescriptorBuilder::new("geometry_msgs__msg", "Twist")
        .message_field("linear", &vector3)
        .message_field("angular", &vector3)
        .build()?)
}
