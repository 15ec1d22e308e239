// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for MessageDescriptor.
//!
//! Offsets follow C struct layout rules: each field is placed at the next
//! multiple of its alignment and the total size is rounded up to the largest
//! field alignment.

use super::field::FieldDescriptor;
use super::kind::{Cardinality, FieldKind, TypeKey};
use super::MessageDescriptor;
use crate::error::BuildError;
use crate::lifecycle::MessageLifecycle;
use crate::value::Value;
use std::sync::Arc;

/// Builder for creating MessageDescriptor instances.
#[derive(Debug)]
pub struct MessageDescriptorBuilder {
    namespace: String,
    name: String,
    fields: Vec<FieldDescriptor>,
    cursor: usize,
    alignment: usize,
    lifecycle: Option<Arc<dyn MessageLifecycle>>,
    error: Option<BuildError>,
}

impl MessageDescriptorBuilder {
    /// Create a new builder for `namespace::name`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            fields: Vec::new(),
            cursor: 0,
            alignment: 1,
            lifecycle: None,
            error: None,
        }
    }

    /// Add a scalar or string field.
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(FieldDescriptor::new(name, kind, 0))
    }

    /// Add a fixed-length array field.
    pub fn array_field(self, name: impl Into<String>, kind: FieldKind, len: usize) -> Self {
        self.push(FieldDescriptor::new(name, kind, 0).with_cardinality(Cardinality::Array(len)))
    }

    /// Add an unbounded sequence field.
    pub fn sequence_field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(FieldDescriptor::new(name, kind, 0).with_cardinality(Cardinality::Sequence))
    }

    pub fn bounded_sequence_field(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        bound: usize,
    ) -> Self {
        self.push(
            FieldDescriptor::new(name, kind, 0)
                .with_cardinality(Cardinality::BoundedSequence(bound)),
        )
    }

    /// Add a string field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::String { max_length: None })
    }

    pub fn bounded_string_field(self, name: impl Into<String>, max_length: usize) -> Self {
        self.field(
            name,
            FieldKind::String {
                max_length: Some(max_length),
            },
        )
    }

    /// Embed a message inline.
    pub fn message_field(self, name: impl Into<String>, nested: &Arc<MessageDescriptor>) -> Self {
        self.push(FieldDescriptor::message(name, nested, 0))
    }

    /// Embed a fixed array of messages inline.
    pub fn message_array_field(
        self,
        name: impl Into<String>,
        nested: &Arc<MessageDescriptor>,
        len: usize,
    ) -> Self {
        self.push(
            FieldDescriptor::message(name, nested, 0).with_cardinality(Cardinality::Array(len)),
        )
    }

    /// Add a sequence of messages referenced by key.
    ///
    /// The key may name the type being built; the link is resolved when the
    /// descriptor is registered or shared.
    pub fn message_sequence_field(self, name: impl Into<String>, target: TypeKey) -> Self {
        self.push(
            FieldDescriptor::new(name, FieldKind::Message(target), 0)
                .with_cardinality(Cardinality::Sequence),
        )
    }

    /// Add a sequence of an already built message type.
    pub fn message_sequence_of(
        self,
        name: impl Into<String>,
        nested: &Arc<MessageDescriptor>,
    ) -> Self {
        self.push(FieldDescriptor::message(name, nested, 0).with_cardinality(Cardinality::Sequence))
    }

    /// Set the default value of the most recently added field.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.default = Some(default.into()),
            None => self.fail(BuildError::Builder("with_default called before any field".into())),
        }
        self
    }

    /// Replace the descriptor-driven lifecycle.
    pub fn lifecycle(mut self, lifecycle: Arc<dyn MessageLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Build the descriptor.
    pub fn build(self) -> Result<MessageDescriptor, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let total_size = align_up(self.cursor, self.alignment)
            .ok_or_else(|| BuildError::Builder("message size overflows usize".into()))?;
        MessageDescriptor::from_table(
            self.namespace,
            self.name,
            total_size,
            self.fields,
            self.lifecycle,
        )
    }

    fn push(mut self, mut field: FieldDescriptor) -> Self {
        let Some((size, align)) = field.layout() else {
            let target = field.kind.message_key().cloned().unwrap_or_else(|| TypeKey::new("", ""));
            self.fail(BuildError::UnresolvedNested {
                field: field.name,
                target,
            });
            return self;
        };
        let placed = align_up(self.cursor, align)
            .and_then(|offset| offset.checked_add(size).map(|end| (offset, end)));
        let Some((offset, end)) = placed else {
            self.fail(BuildError::FieldOverrun {
                name: field.name,
                offset: self.cursor,
                size,
                total_size: usize::MAX,
            });
            return self;
        };
        field.offset = offset;
        self.cursor = end;
        self.alignment = self.alignment.max(align);
        self.fields.push(field);
        self
    }

    fn fail(&mut self, err: BuildError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

fn align_up(offset: usize, align: usize) -> Option<usize> {
    if align <= 1 {
        Some(offset)
    } else {
        offset.div_ceil(align).checked_mul(align)
    }
}
