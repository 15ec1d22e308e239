// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message and field descriptors.
//!
//! A [`MessageDescriptor`] is the runtime form of a generated introspection
//! table: ordered fields with kinds, offsets and cardinality, the instance
//! size, and the lifecycle hooks used to init/fini an instance.
//!
//! Descriptors come from three places:
//! - [`MessageDescriptorBuilder`] computes C-layout offsets,
//! - [`MessageDescriptor::from_table`] takes pre-computed offsets,
//! - [`MessageDescriptor::from_rosidl_members`] reads a rosidl member table.

mod builder;
mod field;
mod kind;
mod message;
mod rosidl;

pub use builder::MessageDescriptorBuilder;
pub use field::FieldDescriptor;
pub use kind::{
    Cardinality, FieldKind, TypeKey, ROS_TYPE_BOOLEAN, ROS_TYPE_CHAR, ROS_TYPE_DOUBLE,
    ROS_TYPE_FLOAT, ROS_TYPE_INT16, ROS_TYPE_INT32, ROS_TYPE_INT64, ROS_TYPE_INT8,
    ROS_TYPE_LONG_DOUBLE, ROS_TYPE_MESSAGE, ROS_TYPE_OCTET, ROS_TYPE_STRING, ROS_TYPE_UINT16,
    ROS_TYPE_UINT32, ROS_TYPE_UINT64, ROS_TYPE_UINT8, ROS_TYPE_WCHAR, ROS_TYPE_WSTRING, SLOT_ALIGN,
    SLOT_SIZE,
};
pub use message::MessageDescriptor;
pub use rosidl::RosidlMember;
