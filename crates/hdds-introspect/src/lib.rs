// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-introspect - generic message introspection
//!
//! The runtime half of rosidl introspection typesupport: per-type member
//! tables (as emitted by a code generator) become [`MessageDescriptor`]s that
//! a single engine uses to init, read, write, serialize and deserialize any
//! message without per-type code.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_introspect::{catalog, Introspector, MessageMut, MessageRef, TypeRegistry, Value};
//!
//! let registry = TypeRegistry::new();
//! let desc = catalog::resolve_ros2(&registry, "bluerov2_msgs/msg/SetDepth")?;
//!
//! let engine = Introspector::new();
//! let mut buffer = engine.create(&desc)?;
//! {
//!     let mut msg = MessageMut::new(&mut buffer, &desc)?;
//!     engine.set(&mut msg, "enable_depth_ctrl", true)?;
//!     engine.set(&mut msg, "pwm_max", 1500u16)?;
//! }
//!
//! let msg = MessageRef::new(&buffer, &desc)?;
//! let bytes = engine.serialize(&msg)?;
//! assert_eq!(bytes.len(), 16);
//! assert_eq!(engine.get(&msg, "pwm_max")?.into_scalar(), Some(Value::U16(1500)));
//! # Ok::<(), hdds_introspect::IntrospectError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  generated member tables / builders (external input)         |
//! +--------------------------------------------------------------+
//! |  TypeRegistry     (namespace, name) -> Arc<MessageDescriptor> |
//! |                   built once per key, concurrency-safe       |
//! +--------------------------------------------------------------+
//! |  Introspector     get / set / serialize / deserialize        |
//! +--------------------------------------------------------------+
//! |  MessageBuffer    raw bytes + owned strings and sequences    |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`descriptor`] - field and message descriptors, builders, rosidl tables
//! - [`registry`] - lazily built, shared descriptors
//! - [`engine`] - field access and the wire codec
//! - [`lifecycle`] - init/fini capability
//! - [`catalog`] - built-in `std_msgs`, `geometry_msgs` and `bluerov2_msgs` types
//! - [`config`] - engine limits from TOML or environment

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod value;

pub use buffer::{BufferState, MessageBuffer, MessageRegion};
pub use config::{ConfigError, IntrospectConfig};
pub use descriptor::{
    Cardinality, FieldDescriptor, FieldKind, MessageDescriptor, MessageDescriptorBuilder, TypeKey,
};
pub use engine::{ArrayRef, FieldValue, Introspector, MessageMut, MessageRef};
pub use error::{BuildError, DecodeError, DecodeErrorKind, IntrospectError};
pub use lifecycle::{DefaultLifecycle, InitMode, MessageLifecycle};
pub use registry::{TypeRegistry, TypeSupportHandle, TYPESUPPORT_IDENTIFIER};
pub use value::{FromValue, Value};
