// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rosidl introspection member tables.
//!
//! Mirrors `rosidl_typesupport_introspection_c__MessageMember` so generated
//! tables can be written as `const` arrays and turned into descriptors.

use super::field::FieldDescriptor;
use super::kind::{Cardinality, FieldKind, TypeKey};
use super::MessageDescriptor;
use crate::error::BuildError;
use crate::lifecycle::MessageLifecycle;
use std::sync::Arc;

/// One row of a generated member table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosidlMember {
    pub name: &'static str,
    /// `ROS_TYPE_*` id.
    pub type_id: u8,
    /// 0 for unbounded strings.
    pub string_upper_bound: usize,
    /// `(namespace, name)` of the nested type for `ROS_TYPE_MESSAGE`.
    pub members: Option<(&'static str, &'static str)>,
    pub is_array: bool,
    pub array_size: usize,
    pub is_upper_bound: bool,
    pub offset: usize,
}

impl RosidlMember {
    /// Scalar member at `offset`.
    pub const fn scalar(name: &'static str, type_id: u8, offset: usize) -> Self {
        Self {
            name,
            type_id,
            string_upper_bound: 0,
            members: None,
            is_array: false,
            array_size: 0,
            is_upper_bound: false,
            offset,
        }
    }

    /// Nested message member at `offset`.
    pub const fn message(
        name: &'static str,
        nested: (&'static str, &'static str),
        offset: usize,
    ) -> Self {
        Self {
            members: Some(nested),
            ..Self::scalar(name, super::kind::ROS_TYPE_MESSAGE, offset)
        }
    }

    fn to_field(self) -> Result<FieldDescriptor, BuildError> {
        let nested = self.members.map(|(ns, name)| TypeKey::new(ns, name));
        let kind = FieldKind::from_ros_type_id(self.type_id, self.string_upper_bound, nested)?;
        let cardinality =
            Cardinality::from_rosidl(self.is_array, self.array_size, self.is_upper_bound);
        Ok(FieldDescriptor::new(self.name, kind, self.offset).with_cardinality(cardinality))
    }
}

impl MessageDescriptor {
    /// Build a descriptor from a generated member table.
    ///
    /// Nested message members stay unlinked until the descriptor is resolved
    /// through a registry.
    pub fn from_rosidl_members(
        namespace: &str,
        name: &str,
        size_of: usize,
        members: &[RosidlMember],
        lifecycle: Option<Arc<dyn MessageLifecycle>>,
    ) -> Result<Self, BuildError> {
        let fields = members
            .iter()
            .map(|m| m.to_field())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_table(namespace, name, size_of, fields, lifecycle)
    }
}
