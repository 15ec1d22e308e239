// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-level get/set over message views.
//!
//! Every write validates the complete value first (kind, bounds, nested
//! field names) and only then touches the buffer, so a rejected `set` leaves
//! the message unchanged.

use super::view::{ArrayRef, ArrayStorage, FieldValue, MessageMut, MessageRef};
use super::Introspector;
use crate::buffer::MessageBuffer;
use crate::descriptor::{Cardinality, FieldDescriptor, FieldKind, MessageDescriptor};
use crate::error::IntrospectError;
use crate::value::Value;
use std::sync::Arc;

impl Introspector {
    /// Read field `name` of `msg`.
    pub fn get<'a>(
        &self,
        msg: &MessageRef<'a>,
        name: &str,
    ) -> Result<FieldValue<'a>, IntrospectError> {
        let field = msg.descriptor.get_field(name)?;
        read_field(msg.buffer, msg.base, field)
    }

    /// Assign field `name` of `msg`.
    ///
    /// Arrays and sequences take a `Value::Sequence`; fixed arrays need the
    /// exact length. Nested messages take a `Value::Message` naming a subset
    /// of their fields; unnamed fields keep their current value.
    pub fn set(
        &self,
        msg: &mut MessageMut<'_>,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), IntrospectError> {
        let value = value.into();
        let descriptor = Arc::clone(&msg.descriptor);
        let field = descriptor.get_field(name)?;
        self.check_value(field, &value, 0)?;
        self.write_value(msg.buffer, msg.base, field, &value, 0)
    }

    /// Mutable view of a single nested message field.
    pub fn message_mut<'m>(
        &self,
        msg: &'m mut MessageMut<'_>,
        name: &str,
    ) -> Result<MessageMut<'m>, IntrospectError> {
        let field = msg.descriptor.get_field(name)?;
        if !field.kind.is_message() || field.cardinality != Cardinality::Single {
            return Err(IntrospectError::mismatch(name, "message", describe(field)));
        }
        let nested = nested_of(field)?;
        let base = msg.base + field.offset;
        Ok(MessageMut {
            buffer: &mut *msg.buffer,
            base,
            descriptor: nested,
        })
    }

    /// Change the length of a sequence field.
    ///
    /// New elements are zero values (or freshly initialized messages);
    /// removed elements are dropped.
    pub fn resize(
        &self,
        msg: &mut MessageMut<'_>,
        name: &str,
        len: usize,
    ) -> Result<(), IntrospectError> {
        let descriptor = Arc::clone(&msg.descriptor);
        let field = descriptor.get_field(name)?;
        if !field.cardinality.is_dynamic() {
            return Err(IntrospectError::mismatch(name, "sequence", describe(field)));
        }
        self.check_sequence_len(field, len)?;

        let slot = msg.base + field.offset;
        if field.kind.is_message() {
            let nested = nested_of(field)?;
            let mut items = msg.buffer.take_messages(slot);
            if len <= items.len() {
                items.truncate(len);
            } else {
                items.reserve(len - items.len());
                while items.len() < len {
                    items.push(fresh(&nested)?);
                }
            }
            msg.buffer.region(msg.base).put_messages(field.offset, items);
        } else {
            let zero = field
                .kind
                .zero_value()
                .ok_or_else(|| IntrospectError::mismatch(name, "scalar", field.kind.to_string()))?;
            let mut items = msg.buffer.take_values(slot);
            items.resize(len, zero);
            msg.buffer.region(msg.base).put_values(field.offset, items);
        }
        Ok(())
    }

    /// Assign one element of an array or sequence field.
    pub fn set_element(
        &self,
        msg: &mut MessageMut<'_>,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), IntrospectError> {
        let value = value.into();
        let descriptor = Arc::clone(&msg.descriptor);
        let field = descriptor.get_field(name)?;
        let len = self.element_count(msg.buffer, msg.base, field)?;
        if index >= len {
            return Err(IntrospectError::IndexOutOfBounds {
                field: name.to_string(),
                index,
                len,
            });
        }
        self.check_element(field, &value, 0)?;

        let slot = msg.base + field.offset;
        match field.cardinality {
            Cardinality::Array(_) => {
                let at = slot + index * stride(field)?;
                self.write_element(msg.buffer, at, field, &value, 0)
            }
            _ if field.kind.is_message() => {
                let nested = nested_of(field)?;
                let Value::Message(pairs) = &value else {
                    return Err(IntrospectError::mismatch(name, "message", value.kind_name()));
                };
                let element = msg
                    .buffer
                    .messages_at_mut(slot)
                    .and_then(|items| items.get_mut(index))
                    .ok_or_else(|| out_of_bounds(name, index, len))?;
                self.write_message(element, 0, &nested, pairs, 1)
            }
            _ => {
                let element = msg
                    .buffer
                    .values_at_mut(slot)
                    .and_then(|items| items.get_mut(index))
                    .ok_or_else(|| out_of_bounds(name, index, len))?;
                *element = value;
                Ok(())
            }
        }
    }

    /// Mutable view of one message element of an array or sequence field.
    pub fn element_mut<'m>(
        &self,
        msg: &'m mut MessageMut<'_>,
        name: &str,
        index: usize,
    ) -> Result<MessageMut<'m>, IntrospectError> {
        let field = msg.descriptor.get_field(name)?;
        if !field.kind.is_message() || field.cardinality == Cardinality::Single {
            return Err(IntrospectError::mismatch(
                name,
                "message array or sequence",
                describe(field),
            ));
        }
        let nested = nested_of(field)?;
        let slot = msg.base + field.offset;
        match field.cardinality {
            Cardinality::Array(len) => {
                if index >= len {
                    return Err(out_of_bounds(name, index, len));
                }
                Ok(MessageMut {
                    buffer: &mut *msg.buffer,
                    base: slot + index * nested.total_size(),
                    descriptor: nested,
                })
            }
            _ => {
                let len = msg.buffer.messages_at(slot).len();
                let element = msg
                    .buffer
                    .messages_at_mut(slot)
                    .and_then(|items| items.get_mut(index))
                    .ok_or_else(|| out_of_bounds(name, index, len))?;
                Ok(MessageMut {
                    buffer: element,
                    base: 0,
                    descriptor: nested,
                })
            }
        }
    }

    /// Render the whole message as a `Value::Message` tree.
    pub fn to_value(&self, msg: &MessageRef<'_>) -> Result<Value, IntrospectError> {
        self.message_value(msg, 0)
    }

    fn message_value(&self, msg: &MessageRef<'_>, depth: usize) -> Result<Value, IntrospectError> {
        self.enter(depth)?;
        let mut fields = Vec::with_capacity(msg.descriptor.field_count());
        for field in msg.descriptor.fields() {
            let value = match read_field(msg.buffer, msg.base, field)? {
                FieldValue::Scalar(v) => v,
                FieldValue::Message(nested) => self.message_value(&nested, depth + 1)?,
                FieldValue::Array(array) => {
                    let mut items = Vec::with_capacity(array.len());
                    for i in 0..array.len() {
                        items.push(match array.get(i)? {
                            FieldValue::Message(nested) => self.message_value(&nested, depth + 1)?,
                            FieldValue::Scalar(v) => v,
                            FieldValue::Array(_) => {
                                return Err(IntrospectError::mismatch(
                                    &field.name,
                                    "element",
                                    "array",
                                ))
                            }
                        });
                    }
                    Value::Sequence(items)
                }
            };
            fields.push((field.name.clone(), value));
        }
        Ok(Value::Message(fields))
    }

    // Validation

    fn check_value(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        if field.cardinality == Cardinality::Single {
            return self.check_element(field, value, depth);
        }
        let Value::Sequence(items) = value else {
            return Err(IntrospectError::mismatch(&field.name, describe(field), value.kind_name()));
        };
        match field.cardinality {
            Cardinality::Array(n) if items.len() != n => {
                return Err(IntrospectError::mismatch(
                    &field.name,
                    describe(field),
                    format!("sequence of {}", items.len()),
                ))
            }
            Cardinality::Array(_) => {}
            _ => self.check_sequence_len(field, items.len())?,
        }
        items.iter().try_for_each(|item| self.check_element(field, item, depth))
    }

    fn check_element(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        match (&field.kind, value) {
            (FieldKind::Message(_), Value::Message(pairs)) => {
                self.enter(depth + 1)?;
                let nested = nested_of(field)?;
                for (name, v) in pairs {
                    let nested_field = nested.get_field(name)?;
                    self.check_value(nested_field, v, depth + 1)?;
                }
                Ok(())
            }
            (FieldKind::String { max_length: Some(bound) }, Value::String(s))
                if s.len() > *bound =>
            {
                Err(IntrospectError::BoundExceeded {
                    field: field.name.clone(),
                    len: s.len(),
                    bound: *bound,
                })
            }
            (kind, v) if kind.accepts(v) => Ok(()),
            (kind, v) => Err(IntrospectError::mismatch(
                &field.name,
                kind.to_string(),
                v.kind_name(),
            )),
        }
    }

    pub(crate) fn check_sequence_len(
        &self,
        field: &FieldDescriptor,
        len: usize,
    ) -> Result<(), IntrospectError> {
        let bound = match field.cardinality.upper_bound() {
            Some(bound) => bound.min(self.max_sequence_len),
            None => self.max_sequence_len,
        };
        if len > bound {
            return Err(IntrospectError::BoundExceeded {
                field: field.name.clone(),
                len,
                bound,
            });
        }
        Ok(())
    }

    // Writes (values already validated)

    fn write_value(
        &self,
        buffer: &mut MessageBuffer,
        base: usize,
        field: &FieldDescriptor,
        value: &Value,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        let at = base + field.offset;
        match (field.cardinality, value) {
            (Cardinality::Single, _) => self.write_element(buffer, at, field, value, depth),
            (Cardinality::Array(_), Value::Sequence(items)) => {
                let stride = stride(field)?;
                for (i, item) in items.iter().enumerate() {
                    self.write_element(buffer, at + i * stride, field, item, depth)?;
                }
                Ok(())
            }
            (_, Value::Sequence(items)) if field.kind.is_message() => {
                let nested = nested_of(field)?;
                let mut messages = Vec::with_capacity(items.len());
                for item in items {
                    let mut element = fresh(&nested)?;
                    if let Value::Message(pairs) = item {
                        self.write_message(&mut element, 0, &nested, pairs, depth + 1)?;
                    }
                    messages.push(element);
                }
                buffer.region(base).put_messages(field.offset, messages);
                Ok(())
            }
            (_, Value::Sequence(items)) => {
                buffer.region(base).put_values(field.offset, items.clone());
                Ok(())
            }
            (_, other) => Err(IntrospectError::mismatch(
                &field.name,
                describe(field),
                other.kind_name(),
            )),
        }
    }

    fn write_element(
        &self,
        buffer: &mut MessageBuffer,
        at: usize,
        field: &FieldDescriptor,
        value: &Value,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        match value {
            Value::Message(pairs) => {
                let nested = nested_of(field)?;
                self.write_message(buffer, at, &nested, pairs, depth + 1)
            }
            Value::String(s) => {
                buffer.region(at).put_string(0, s.clone());
                Ok(())
            }
            scalar => buffer.region(at).write_scalar(0, scalar),
        }
    }

    fn write_message(
        &self,
        buffer: &mut MessageBuffer,
        base: usize,
        descriptor: &MessageDescriptor,
        pairs: &[(String, Value)],
        depth: usize,
    ) -> Result<(), IntrospectError> {
        self.enter(depth)?;
        for (name, value) in pairs {
            let field = descriptor.get_field(name)?;
            self.write_value(buffer, base, field, value, depth)?;
        }
        Ok(())
    }

    fn element_count(
        &self,
        buffer: &MessageBuffer,
        base: usize,
        field: &FieldDescriptor,
    ) -> Result<usize, IntrospectError> {
        let slot = base + field.offset;
        match field.cardinality {
            Cardinality::Single => Err(IntrospectError::mismatch(
                &field.name,
                "array or sequence",
                describe(field),
            )),
            Cardinality::Array(n) => Ok(n),
            _ if field.kind.is_message() => Ok(buffer.messages_at(slot).len()),
            _ => Ok(buffer.values_at(slot).len()),
        }
    }
}

/// Read one field at message base `base`.
pub(crate) fn read_field<'a>(
    buffer: &'a MessageBuffer,
    base: usize,
    field: &FieldDescriptor,
) -> Result<FieldValue<'a>, IntrospectError> {
    let at = base + field.offset;
    let value = match (field.cardinality, &field.kind) {
        (Cardinality::Single, FieldKind::Message(_)) => FieldValue::Message(MessageRef {
            buffer,
            base: at,
            descriptor: nested_of(field)?,
        }),
        (Cardinality::Single, FieldKind::String { .. }) => {
            FieldValue::Scalar(Value::String(buffer.string_at(at).to_owned()))
        }
        (Cardinality::Single, kind) => FieldValue::Scalar(buffer.read_scalar(at, kind)?),
        (Cardinality::Array(len), _) => FieldValue::Array(ArrayRef {
            field: field.name.clone(),
            kind: field.kind.clone(),
            nested: field.nested_descriptor(),
            buffer,
            storage: ArrayStorage::Inline {
                base: at,
                len,
                stride: stride(field)?,
            },
        }),
        (_, kind) => FieldValue::Array(ArrayRef {
            field: field.name.clone(),
            kind: kind.clone(),
            nested: field.nested_descriptor(),
            buffer,
            storage: if kind.is_message() {
                ArrayStorage::Messages(buffer.messages_at(at))
            } else {
                ArrayStorage::Values(buffer.values_at(at))
            },
        }),
    };
    Ok(value)
}

pub(crate) fn nested_of(
    field: &FieldDescriptor,
) -> Result<Arc<MessageDescriptor>, IntrospectError> {
    field.nested_descriptor().ok_or_else(|| match field.kind.message_key() {
        Some(key) => IntrospectError::TypeNotFound(key.clone()),
        None => IntrospectError::mismatch(&field.name, "message", field.kind.to_string()),
    })
}

/// Distance between consecutive inline elements of an array field.
pub(crate) fn stride(field: &FieldDescriptor) -> Result<usize, IntrospectError> {
    field
        .element_layout()
        .map(|(size, _)| size)
        .ok_or_else(|| {
            nested_of(field)
                .err()
                .unwrap_or(IntrospectError::Lifecycle("unlinked field"))
        })
}

/// Freshly initialized buffer for a nested element.
pub(crate) fn fresh(descriptor: &MessageDescriptor) -> Result<MessageBuffer, IntrospectError> {
    let mut buffer = MessageBuffer::for_descriptor(descriptor);
    descriptor.init(&mut buffer)?;
    Ok(buffer)
}

fn describe(field: &FieldDescriptor) -> String {
    format!("{}{}", field.kind, field.cardinality)
}

fn out_of_bounds(name: &str, index: usize, len: usize) -> IntrospectError {
    IntrospectError::IndexOutOfBounds {
        field: name.to_string(),
        index,
        len,
    }
}
