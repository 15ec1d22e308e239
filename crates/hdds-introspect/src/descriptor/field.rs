// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field descriptor for message members.

use super::kind::{Cardinality, FieldKind, SLOT_ALIGN, SLOT_SIZE};
use super::MessageDescriptor;
use crate::value::Value;
use std::sync::{Arc, Weak};

/// Describes one member of a message type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name, unique within the owning message.
    pub name: String,
    /// Element kind.
    pub kind: FieldKind,
    /// Scalar, fixed array or sequence.
    pub cardinality: Cardinality,
    /// Byte offset inside the owning message layout.
    pub offset: usize,
    /// Value applied by the default lifecycle on init (if any).
    pub default: Option<Value>,
    /// Link to the nested descriptor when `kind` is a message.
    pub(crate) nested: Option<Weak<MessageDescriptor>>,
}

impl FieldDescriptor {
    /// Create a scalar field at `offset`.
    pub fn new(name: impl Into<String>, kind: FieldKind, offset: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            cardinality: Cardinality::Single,
            offset,
            default: None,
            nested: None,
        }
    }

    /// Create a nested message field linked to an already built descriptor.
    pub fn message(
        name: impl Into<String>,
        nested: &Arc<MessageDescriptor>,
        offset: usize,
    ) -> Self {
        let mut field = Self::new(name, FieldKind::Message(nested.key()), offset);
        field.nested = Some(Arc::downgrade(nested));
        field
    }

    /// Set cardinality.
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Set default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_array(&self) -> bool {
        self.cardinality.is_array()
    }

    pub fn array_length(&self) -> i64 {
        self.cardinality.array_length()
    }

    /// Nested descriptor, if this is a message field and the link is live.
    pub fn nested_descriptor(&self) -> Option<Arc<MessageDescriptor>> {
        self.nested.as_ref().and_then(Weak::upgrade)
    }

    /// Size and alignment of one element as laid out in memory.
    ///
    /// `None` for message elements whose descriptor is not linked yet.
    pub fn element_layout(&self) -> Option<(usize, usize)> {
        match &self.kind {
            FieldKind::String { .. } => Some((SLOT_SIZE, SLOT_ALIGN)),
            FieldKind::Message(_) => self
                .nested_descriptor()
                .map(|d| (d.total_size(), d.alignment())),
            scalar => scalar.scalar_layout(),
        }
    }

    /// Size and alignment of the whole field in the owning layout.
    pub fn layout(&self) -> Option<(usize, usize)> {
        match self.cardinality {
            Cardinality::Sequence | Cardinality::BoundedSequence(_) => {
                Some((SLOT_SIZE, SLOT_ALIGN))
            }
            Cardinality::Single => self.element_layout(),
            Cardinality::Array(n) => self
                .element_layout()
                .map(|(size, align)| (size.saturating_mul(n), align)),
        }
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.cardinality == other.cardinality
            && self.offset == other.offset
            && self.default == other.default
    }
}
