// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message descriptor: ordered fields, layout size and lifecycle hooks.

use super::field::FieldDescriptor;
use super::kind::{Cardinality, FieldKind, TypeKey};
use crate::buffer::{BufferState, MessageBuffer};
use crate::error::{BuildError, IntrospectError};
use crate::lifecycle::{DefaultLifecycle, InitMode, MessageLifecycle};
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

/// Immutable description of one message type.
///
/// Shared as `Arc<MessageDescriptor>`; nothing in it changes after
/// construction.
#[derive(Debug)]
pub struct MessageDescriptor {
    namespace: String,
    name: String,
    fields: Vec<FieldDescriptor>,
    total_size: usize,
    alignment: usize,
    lifecycle: Arc<dyn MessageLifecycle>,
}

impl MessageDescriptor {
    /// Build a descriptor from a pre-computed member table.
    ///
    /// Offsets are taken as given and checked against `total_size`.
    pub fn from_table(
        namespace: impl Into<String>,
        name: impl Into<String>,
        total_size: usize,
        fields: Vec<FieldDescriptor>,
        lifecycle: Option<Arc<dyn MessageLifecycle>>,
    ) -> Result<Self, BuildError> {
        let desc = Self {
            namespace: namespace.into(),
            name: name.into(),
            fields,
            total_size,
            alignment: 1,
            lifecycle: lifecycle.unwrap_or_else(|| Arc::new(DefaultLifecycle)),
        };
        desc.validated()
    }

    fn validated(mut self) -> Result<Self, BuildError> {
        let mut names = HashSet::with_capacity(self.fields.len());
        let mut ranges = Vec::with_capacity(self.fields.len());
        let mut alignment = 1;

        for (index, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(BuildError::EmptyFieldName { index });
            }
            if !names.insert(field.name.as_str()) {
                return Err(BuildError::DuplicateField {
                    name: field.name.clone(),
                });
            }
            if let Some(default) = &field.default {
                check_default(field, default)?;
            }

            // Unlinked inline message fields are checked again once linked.
            let Some((size, align)) = field.layout() else {
                continue;
            };
            if field.offset % align != 0 {
                return Err(BuildError::MisalignedField {
                    name: field.name.clone(),
                    offset: field.offset,
                    alignment: align,
                });
            }
            let end = match field.offset.checked_add(size) {
                Some(end) if end <= self.total_size => end,
                _ => {
                    return Err(BuildError::FieldOverrun {
                        name: field.name.clone(),
                        offset: field.offset,
                        size,
                        total_size: self.total_size,
                    })
                }
            };
            alignment = alignment.max(align);
            if size > 0 {
                ranges.push((field.offset, end, index));
            }
        }

        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            let (_, end, first) = pair[0];
            let (start, _, second) = pair[1];
            if end > start {
                return Err(BuildError::OverlappingFields {
                    first: self.fields[first].name.clone(),
                    second: self.fields[second].name.clone(),
                });
            }
        }

        self.alignment = alignment;
        Ok(self)
    }

    /// Resolve nested message links and freeze the descriptor.
    ///
    /// Every nested type is looked up through `resolve` and relinked to the
    /// returned `Arc`; a field already linked to a different layout of the
    /// same key is rejected. A reference to the type itself is linked to the
    /// returned `Arc` and is only legal through a sequence, where it adds no
    /// inline size.
    pub(crate) fn into_linked<F>(self, resolve: F) -> Result<Arc<Self>, BuildError>
    where
        F: Fn(&TypeKey) -> Option<Arc<MessageDescriptor>>,
    {
        let self_key = self.key();
        let Self {
            namespace,
            name,
            mut fields,
            total_size,
            lifecycle,
            ..
        } = self;

        let mut self_refs = Vec::new();
        for (index, field) in fields.iter_mut().enumerate() {
            let Some(target) = field.kind.message_key().cloned() else {
                continue;
            };
            if target == self_key {
                if !field.cardinality.is_dynamic() {
                    return Err(BuildError::InlineSelfReference {
                        field: field.name.clone(),
                        target,
                    });
                }
                self_refs.push(index);
                continue;
            }
            let resolved = resolve(&target).filter(|nested| {
                field
                    .nested_descriptor()
                    .map_or(true, |linked| Arc::ptr_eq(&linked, nested) || *linked == **nested)
            });
            let Some(nested) = resolved else {
                return Err(BuildError::UnresolvedNested {
                    field: field.name.clone(),
                    target,
                });
            };
            field.nested = Some(Arc::downgrade(&nested));
        }

        let desc = Self::from_table(namespace, name, total_size, fields, Some(lifecycle))?;
        Ok(Arc::new_cyclic(move |weak: &Weak<Self>| {
            let mut desc = desc;
            for index in self_refs {
                desc.fields[index].nested = Some(weak.clone());
            }
            desc
        }))
    }

    /// Freeze a standalone descriptor, linking self-referencing sequences.
    ///
    /// Nested types other than itself must already be linked (built with
    /// [`FieldDescriptor::message`]); use a registry otherwise.
    pub fn into_shared(self) -> Result<Arc<Self>, BuildError> {
        let linked: HashMap<TypeKey, Arc<MessageDescriptor>> = self
            .fields
            .iter()
            .filter_map(|f| Some((f.kind.message_key()?.clone(), f.nested_descriptor()?)))
            .collect();
        self.into_linked(|key| linked.get(key).cloned())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry key of this type.
    pub fn key(&self) -> TypeKey {
        TypeKey::new(self.namespace.clone(), self.name.clone())
    }

    /// `namespace::name`.
    pub fn type_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// Fields in declaration (and wire) order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Byte size of one instance.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Largest field alignment (1 for empty messages).
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn lifecycle(&self) -> &Arc<dyn MessageLifecycle> {
        &self.lifecycle
    }

    /// Field by name, without error context.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|index| &self.fields[index])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field by name; unknown names are `FieldNotFound`.
    pub fn get_field(&self, name: &str) -> Result<&FieldDescriptor, IntrospectError> {
        self.field(name).ok_or_else(|| IntrospectError::FieldNotFound {
            message: self.type_name(),
            field: name.to_string(),
        })
    }

    /// Bring `buffer` to the type's default state (zero + defaults).
    pub fn init(&self, buffer: &mut MessageBuffer) -> Result<(), IntrospectError> {
        self.init_with(buffer, InitMode::All)
    }

    /// Initialize with an explicit rosidl initialization mode.
    pub fn init_with(
        &self,
        buffer: &mut MessageBuffer,
        mode: InitMode,
    ) -> Result<(), IntrospectError> {
        self.check_size(buffer)?;
        self.lifecycle.initialize(self, &mut buffer.region(0), mode)?;
        buffer.set_state(BufferState::Ready);
        Ok(())
    }

    /// Release owned sub-resources (strings, sequences). The buffer itself
    /// stays allocated; it must be re-initialized before further use.
    pub fn fini(&self, buffer: &mut MessageBuffer) -> Result<(), IntrospectError> {
        self.check_size(buffer)?;
        match buffer.state() {
            BufferState::Ready => {}
            BufferState::Finalized => {
                return Err(IntrospectError::Lifecycle("fini called twice without init"))
            }
            BufferState::Uninitialized => {
                return Err(IntrospectError::Lifecycle("fini called before init"))
            }
        }
        self.lifecycle.finalize(self, &mut buffer.region(0));
        buffer.set_state(BufferState::Finalized);
        Ok(())
    }

    fn check_size(&self, buffer: &MessageBuffer) -> Result<(), IntrospectError> {
        if buffer.len() < self.total_size {
            return Err(IntrospectError::BufferTooSmall {
                need: self.total_size,
                have: buffer.len(),
            });
        }
        Ok(())
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.total_size == other.total_size
            && self.fields == other.fields
    }
}

fn check_default(field: &FieldDescriptor, default: &Value) -> Result<(), BuildError> {
    let invalid = |reason: String| BuildError::InvalidDefault {
        name: field.name.clone(),
        reason,
    };
    if field.kind.is_message() {
        return Err(invalid("message fields take no default".into()));
    }
    let check_element = |value: &Value| {
        if !field.kind.accepts(value) {
            return Err(invalid(format!("expected {}, got {}", field.kind, value.kind_name())));
        }
        match (&field.kind, value) {
            (FieldKind::String { max_length: Some(bound) }, Value::String(s))
                if s.len() > *bound =>
            {
                Err(invalid(format!("{} bytes exceed string bound {}", s.len(), bound)))
            }
            _ => Ok(()),
        }
    };
    match field.cardinality {
        Cardinality::Single => check_element(default),
        cardinality => {
            let Value::Sequence(items) = default else {
                return Err(invalid(format!("expected sequence, got {}", default.kind_name())));
            };
            let fits = match cardinality {
                Cardinality::Array(n) => items.len() == n,
                Cardinality::BoundedSequence(bound) => items.len() <= bound,
                _ => true,
            };
            if !fits {
                return Err(invalid(format!("{} elements do not fit {}", items.len(), cardinality)));
            }
            items.iter().try_for_each(check_element)
        }
    }
}
