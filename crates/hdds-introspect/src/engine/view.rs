// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed views pairing a buffer region with its descriptor.

use crate::buffer::{BufferState, MessageBuffer};
use crate::descriptor::{FieldKind, MessageDescriptor};
use crate::error::IntrospectError;
use crate::value::Value;
use std::sync::Arc;

/// Read-only view of a message (or a nested message inside one).
#[derive(Debug, Clone)]
pub struct MessageRef<'a> {
    pub(crate) buffer: &'a MessageBuffer,
    pub(crate) base: usize,
    pub(crate) descriptor: Arc<MessageDescriptor>,
}

impl<'a> MessageRef<'a> {
    /// View an initialized buffer as an instance of `descriptor`.
    pub fn new(
        buffer: &'a MessageBuffer,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<Self, IntrospectError> {
        check_usable(buffer, descriptor)?;
        Ok(Self {
            buffer,
            base: 0,
            descriptor: Arc::clone(descriptor),
        })
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }
}

/// Mutable view of a message (or a nested message inside one).
#[derive(Debug)]
pub struct MessageMut<'a> {
    pub(crate) buffer: &'a mut MessageBuffer,
    pub(crate) base: usize,
    pub(crate) descriptor: Arc<MessageDescriptor>,
}

impl<'a> MessageMut<'a> {
    pub fn new(
        buffer: &'a mut MessageBuffer,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<Self, IntrospectError> {
        check_usable(buffer, descriptor)?;
        Ok(Self {
            buffer,
            base: 0,
            descriptor: Arc::clone(descriptor),
        })
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Read-only view of the same message.
    pub fn view(&self) -> MessageRef<'_> {
        MessageRef {
            buffer: &*self.buffer,
            base: self.base,
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

fn check_usable(
    buffer: &MessageBuffer,
    descriptor: &MessageDescriptor,
) -> Result<(), IntrospectError> {
    match buffer.state() {
        BufferState::Ready => {}
        BufferState::Uninitialized => {
            return Err(IntrospectError::Lifecycle("buffer used before init"))
        }
        BufferState::Finalized => {
            return Err(IntrospectError::Lifecycle("buffer used after fini"))
        }
    }
    if buffer.len() < descriptor.total_size() {
        return Err(IntrospectError::BufferTooSmall {
            need: descriptor.total_size(),
            have: buffer.len(),
        });
    }
    Ok(())
}

/// Result of reading one field.
#[derive(Debug, Clone)]
pub enum FieldValue<'a> {
    /// Single scalar or string.
    Scalar(Value),
    /// Fixed array or sequence.
    Array(ArrayRef<'a>),
    /// Nested message.
    Message(MessageRef<'a>),
}

impl<'a> FieldValue<'a> {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Option<Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef<'a>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<MessageRef<'a>> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ArrayStorage<'a> {
    /// Elements laid out inside the owning buffer.
    Inline { base: usize, len: usize, stride: usize },
    Values(&'a [Value]),
    Messages(&'a [MessageBuffer]),
}

/// Indexed accessor over an array or sequence field.
#[derive(Debug, Clone)]
pub struct ArrayRef<'a> {
    pub(crate) field: String,
    pub(crate) kind: FieldKind,
    pub(crate) nested: Option<Arc<MessageDescriptor>>,
    pub(crate) buffer: &'a MessageBuffer,
    pub(crate) storage: ArrayStorage<'a>,
}

impl<'a> ArrayRef<'a> {
    pub fn len(&self) -> usize {
        match &self.storage {
            ArrayStorage::Inline { len, .. } => *len,
            ArrayStorage::Values(v) => v.len(),
            ArrayStorage::Messages(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Result<FieldValue<'a>, IntrospectError> {
        let len = self.len();
        if index >= len {
            return Err(IntrospectError::IndexOutOfBounds {
                field: self.field.clone(),
                index,
                len,
            });
        }
        match self.storage {
            ArrayStorage::Inline { base, stride, .. } => {
                let at = base + index * stride;
                match &self.kind {
                    FieldKind::Message(_) => Ok(FieldValue::Message(MessageRef {
                        buffer: self.buffer,
                        base: at,
                        descriptor: self.nested_descriptor()?,
                    })),
                    FieldKind::String { .. } => Ok(FieldValue::Scalar(Value::String(
                        self.buffer.string_at(at).to_owned(),
                    ))),
                    kind => Ok(FieldValue::Scalar(self.buffer.read_scalar(at, kind)?)),
                }
            }
            ArrayStorage::Values(values) => Ok(FieldValue::Scalar(values[index].clone())),
            ArrayStorage::Messages(messages) => Ok(FieldValue::Message(MessageRef {
                buffer: &messages[index],
                base: 0,
                descriptor: self.nested_descriptor()?,
            })),
        }
    }

    /// All elements as values; message elements are rejected.
    pub fn to_values(&self) -> Result<Vec<Value>, IntrospectError> {
        if self.kind.is_message() {
            return Err(IntrospectError::mismatch(
                &self.field,
                "scalar elements",
                self.kind.to_string(),
            ));
        }
        (0..self.len())
            .map(|i| {
                self.get(i)?
                    .into_scalar()
                    .ok_or_else(|| IntrospectError::mismatch(&self.field, "scalar", "message"))
            })
            .collect()
    }

    fn nested_descriptor(&self) -> Result<Arc<MessageDescriptor>, IntrospectError> {
        self.nested.clone().ok_or_else(|| match self.kind.message_key() {
            Some(key) => IntrospectError::TypeNotFound(key.clone()),
            None => IntrospectError::mismatch(&self.field, "message", self.kind.to_string()),
        })
    }
}
