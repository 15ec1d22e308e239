// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message memory.
//!
//! A [`MessageBuffer`] is the raw instance memory a descriptor's offsets point
//! into. Scalars are stored little-endian at their field offset. String and
//! sequence fields occupy a fixed-size slot in the byte layout; their payload
//! is kept in owned side storage keyed by the slot's absolute offset, so all
//! access stays in safe code.
//!
//! Empty strings and sequences are never stored: an absent entry reads as
//! empty, which keeps `==` on buffers equal to field-by-field equality.

use crate::descriptor::{Cardinality, FieldDescriptor, FieldKind};
use crate::error::IntrospectError;
use crate::value::Value;
use std::collections::BTreeMap;

/// Lifecycle state of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Allocated, not yet initialized.
    Uninitialized,
    /// Initialized and usable.
    Ready,
    /// Owned resources released by `fini`.
    Finalized,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Owned {
    String(String),
    Values(Vec<Value>),
    Messages(Vec<MessageBuffer>),
}

/// Raw memory of one message instance plus its owned sub-resources.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBuffer {
    bytes: Vec<u8>,
    owned: BTreeMap<usize, Owned>,
    state: BufferState,
}

impl MessageBuffer {
    /// Allocate `size` zeroed bytes. The buffer must be initialized before use.
    pub fn with_size(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            owned: BTreeMap::new(),
            state: BufferState::Uninitialized,
        }
    }

    /// Allocate exactly `descriptor.total_size()` bytes.
    pub fn for_descriptor(descriptor: &crate::descriptor::MessageDescriptor) -> Self {
        Self::with_size(descriptor.total_size())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Raw instance bytes (string/sequence slots read as zero).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn set_state(&mut self, state: BufferState) {
        self.state = state;
    }

    pub(crate) fn region(&mut self, base: usize) -> MessageRegion<'_> {
        MessageRegion { buffer: self, base }
    }

    /// Number of owned entries (non-empty strings and sequences).
    #[cfg(test)]
    pub(crate) fn owned_len(&self) -> usize {
        self.owned.len()
    }

    pub(crate) fn read_scalar(
        &self,
        offset: usize,
        kind: &FieldKind,
    ) -> Result<Value, IntrospectError> {
        let (size, _) = kind
            .scalar_layout()
            .ok_or_else(|| IntrospectError::mismatch("<scalar>", "scalar kind", kind.to_string()))?;
        let bytes = self
            .bytes
            .get(offset..offset + size)
            .ok_or(IntrospectError::BufferTooSmall {
                need: offset + size,
                have: self.bytes.len(),
            })?;
        scalar_from_le(kind, bytes)
            .ok_or_else(|| IntrospectError::mismatch("<scalar>", kind.to_string(), "raw bytes"))
    }

    pub(crate) fn string_at(&self, slot: usize) -> &str {
        match self.owned.get(&slot) {
            Some(Owned::String(s)) => s,
            _ => "",
        }
    }

    pub(crate) fn values_at(&self, slot: usize) -> &[Value] {
        match self.owned.get(&slot) {
            Some(Owned::Values(v)) => v,
            _ => &[],
        }
    }

    pub(crate) fn messages_at(&self, slot: usize) -> &[MessageBuffer] {
        match self.owned.get(&slot) {
            Some(Owned::Messages(v)) => v,
            _ => &[],
        }
    }

    pub(crate) fn values_at_mut(&mut self, slot: usize) -> Option<&mut Vec<Value>> {
        match self.owned.get_mut(&slot) {
            Some(Owned::Values(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn messages_at_mut(&mut self, slot: usize) -> Option<&mut Vec<MessageBuffer>> {
        match self.owned.get_mut(&slot) {
            Some(Owned::Messages(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn take_values(&mut self, slot: usize) -> Vec<Value> {
        match self.owned.remove(&slot) {
            Some(Owned::Values(v)) => v,
            _ => Vec::new(),
        }
    }

    pub(crate) fn take_messages(&mut self, slot: usize) -> Vec<MessageBuffer> {
        match self.owned.remove(&slot) {
            Some(Owned::Messages(v)) => v,
            _ => Vec::new(),
        }
    }

    fn put(&mut self, slot: usize, owned: Owned) {
        let empty = match &owned {
            Owned::String(s) => s.is_empty(),
            Owned::Values(v) => v.is_empty(),
            Owned::Messages(v) => v.is_empty(),
        };
        if empty {
            self.owned.remove(&slot);
        } else {
            self.owned.insert(slot, owned);
        }
    }
}

/// Mutable window on a buffer starting at `base` (a message or a nested
/// message embedded in it). Offsets passed to its methods are relative.
#[derive(Debug)]
pub struct MessageRegion<'a> {
    buffer: &'a mut MessageBuffer,
    base: usize,
}

impl<'a> MessageRegion<'a> {
    /// Region of a nested message at relative `offset`.
    pub fn sub(&mut self, offset: usize) -> MessageRegion<'_> {
        MessageRegion {
            buffer: &mut *self.buffer,
            base: self.base + offset,
        }
    }

    /// Zero `len` bytes of the region.
    pub fn zero(&mut self, len: usize) {
        let end = (self.base + len).min(self.buffer.bytes.len());
        if let Some(bytes) = self.buffer.bytes.get_mut(self.base..end) {
            bytes.fill(0);
        }
    }

    /// Drop owned strings/sequences whose slots fall inside the region.
    pub fn release(&mut self, len: usize) {
        let owned = &mut self.buffer.owned;
        let mut inside = owned.split_off(&self.base);
        let mut after = inside.split_off(&(self.base + len));
        owned.append(&mut after);
    }

    /// Write a scalar value at relative `offset`.
    pub fn write_scalar(&mut self, offset: usize, value: &Value) -> Result<(), IntrospectError> {
        let (raw, size) = scalar_to_le(value)
            .ok_or_else(|| IntrospectError::mismatch("<scalar>", "scalar", value.kind_name()))?;
        let start = self.base + offset;
        let have = self.buffer.bytes.len();
        let dst = self
            .buffer
            .bytes
            .get_mut(start..start + size)
            .ok_or(IntrospectError::BufferTooSmall {
                need: start + size,
                have,
            })?;
        dst.copy_from_slice(&raw[..size]);
        Ok(())
    }

    /// Read a scalar at relative `offset`.
    pub fn read_scalar(&self, offset: usize, kind: &FieldKind) -> Result<Value, IntrospectError> {
        self.buffer.read_scalar(self.base + offset, kind)
    }

    pub fn put_string(&mut self, offset: usize, value: String) {
        self.buffer.put(self.base + offset, Owned::String(value));
    }

    pub fn put_values(&mut self, offset: usize, values: Vec<Value>) {
        self.buffer.put(self.base + offset, Owned::Values(values));
    }

    pub fn put_messages(&mut self, offset: usize, messages: Vec<MessageBuffer>) {
        self.buffer.put(self.base + offset, Owned::Messages(messages));
    }

    /// Store a scalar, string, array or scalar-sequence value into `field`.
    ///
    /// Nested message fields are not handled here; the engine recurses into
    /// them. The value must already match the field's kind.
    pub fn store(&mut self, field: &FieldDescriptor, value: &Value) -> Result<(), IntrospectError> {
        let mismatch = |got: &Value| {
            let expected = format!("{}{}", field.kind, field.cardinality);
            IntrospectError::mismatch(&field.name, expected, got.kind_name())
        };
        if field.kind.is_message() {
            return Err(mismatch(value));
        }
        match field.cardinality {
            Cardinality::Single => self.store_element(field, field.offset, value),
            Cardinality::Array(n) => {
                let Value::Sequence(items) = value else {
                    return Err(mismatch(value));
                };
                if items.len() != n {
                    return Err(mismatch(value));
                }
                let stride = field.element_layout().map_or(0, |(size, _)| size);
                for (i, item) in items.iter().enumerate() {
                    self.store_element(field, field.offset + i * stride, item)?;
                }
                Ok(())
            }
            Cardinality::BoundedSequence(_) | Cardinality::Sequence => {
                let Value::Sequence(items) = value else {
                    return Err(mismatch(value));
                };
                if let Some(bad) = items.iter().find(|v| !field.kind.accepts(v)) {
                    return Err(mismatch(bad));
                }
                self.put_values(field.offset, items.clone());
                Ok(())
            }
        }
    }

    fn store_element(
        &mut self,
        field: &FieldDescriptor,
        offset: usize,
        value: &Value,
    ) -> Result<(), IntrospectError> {
        if !field.kind.accepts(value) {
            return Err(IntrospectError::mismatch(
                &field.name,
                field.kind.to_string(),
                value.kind_name(),
            ));
        }
        match value {
            Value::String(s) => {
                self.put_string(offset, s.clone());
                Ok(())
            }
            scalar => self.write_scalar(offset, scalar),
        }
    }
}

/// Little-endian bytes of a scalar value (`None` for strings/composites).
pub(crate) fn scalar_to_le(value: &Value) -> Option<([u8; 8], usize)> {
    fn pack<const N: usize>(src: [u8; N]) -> ([u8; 8], usize) {
        let mut out = [0u8; 8];
        out[..N].copy_from_slice(&src);
        (out, N)
    }
    let packed = match value {
        Value::Bool(v) => pack([u8::from(*v)]),
        Value::I8(v) => pack(v.to_le_bytes()),
        Value::U8(v) => pack(v.to_le_bytes()),
        Value::I16(v) => pack(v.to_le_bytes()),
        Value::U16(v) => pack(v.to_le_bytes()),
        Value::I32(v) => pack(v.to_le_bytes()),
        Value::U32(v) => pack(v.to_le_bytes()),
        Value::I64(v) => pack(v.to_le_bytes()),
        Value::U64(v) => pack(v.to_le_bytes()),
        Value::F32(v) => pack(v.to_le_bytes()),
        Value::F64(v) => pack(v.to_le_bytes()),
        Value::String(_) | Value::Sequence(_) | Value::Message(_) => return None,
    };
    Some(packed)
}

/// Decode a scalar of `kind` from exactly its size in little-endian bytes.
pub(crate) fn scalar_from_le(kind: &FieldKind, bytes: &[u8]) -> Option<Value> {
    let value = match kind {
        FieldKind::Bool => Value::Bool(*bytes.first()? != 0),
        FieldKind::I8 => Value::I8(i8::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::U8 => Value::U8(u8::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::I16 => Value::I16(i16::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::I32 => Value::I32(i32::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::I64 => Value::I64(i64::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::F32 => Value::F32(f32::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::F64 => Value::F64(f64::from_le_bytes(bytes.try_into().ok()?)),
        FieldKind::String { .. } | FieldKind::Message(_) => return None,
    };
    Some(value)
}
