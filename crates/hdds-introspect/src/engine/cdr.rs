// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire encoding of message buffers.
//!
//! Layout (little-endian, no encapsulation header):
//! - fields in declaration order, nested messages inline;
//! - every primitive aligned to its own size relative to the stream start,
//!   padding bytes are zero;
//! - bool: one byte, 0 or 1;
//! - string: align 4, `u32` length including the NUL terminator, bytes, NUL;
//! - fixed array: elements back to back;
//! - sequence: align 4, `u32` element count, elements.

use super::access::{fresh, nested_of, stride};
use super::Introspector;
use crate::buffer::{scalar_from_le, scalar_to_le, MessageBuffer};
use crate::descriptor::{Cardinality, FieldDescriptor, FieldKind, MessageDescriptor};
use crate::error::{DecodeError, DecodeErrorKind, IntrospectError};
use crate::value::Value;

/// Count limit for sequences whose elements encode to zero bytes.
const ZERO_SIZED_SEQUENCE_MAX: usize = 4096;

pub(crate) struct CdrEncoder<'e> {
    engine: &'e Introspector,
    out: Vec<u8>,
}

impl<'e> CdrEncoder<'e> {
    pub(crate) fn new(engine: &'e Introspector, capacity: usize) -> Self {
        Self {
            engine,
            out: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    fn align(&mut self, alignment: usize) {
        let padding = (alignment - (self.out.len() % alignment)) % alignment;
        self.out.resize(self.out.len() + padding, 0);
    }

    pub(crate) fn encode_message(
        &mut self,
        buffer: &MessageBuffer,
        base: usize,
        descriptor: &MessageDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        self.engine.enter(depth)?;
        for field in descriptor.fields() {
            self.encode_field(buffer, base, field, depth)?;
        }
        Ok(())
    }

    fn encode_field(
        &mut self,
        buffer: &MessageBuffer,
        base: usize,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        let at = base + field.offset;
        match field.cardinality {
            Cardinality::Single => self.encode_element(buffer, at, field, depth),
            Cardinality::Array(len) => {
                let stride = stride(field)?;
                for i in 0..len {
                    self.encode_element(buffer, at + i * stride, field, depth)?;
                }
                Ok(())
            }
            Cardinality::BoundedSequence(_) | Cardinality::Sequence => {
                if field.kind.is_message() {
                    let nested = nested_of(field)?;
                    let items = buffer.messages_at(at);
                    self.engine.check_sequence_len(field, items.len())?;
                    self.write_count(items.len());
                    for item in items {
                        self.encode_message(item, 0, &nested, depth + 1)?;
                    }
                } else {
                    let items = buffer.values_at(at);
                    self.engine.check_sequence_len(field, items.len())?;
                    self.write_count(items.len());
                    for item in items {
                        self.encode_value(field, item)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn encode_element(
        &mut self,
        buffer: &MessageBuffer,
        at: usize,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        match &field.kind {
            FieldKind::Message(_) => {
                let nested = nested_of(field)?;
                self.encode_message(buffer, at, &nested, depth + 1)
            }
            FieldKind::String { max_length } => {
                self.write_string(&field.name, buffer.string_at(at), *max_length)
            }
            kind => {
                let value = buffer.read_scalar(at, kind)?;
                self.write_scalar(&field.name, &value)
            }
        }
    }

    fn encode_value(
        &mut self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<(), IntrospectError> {
        match (&field.kind, value) {
            (FieldKind::String { max_length }, Value::String(s)) => {
                self.write_string(&field.name, s, *max_length)
            }
            (kind, v) if kind.accepts(v) => self.write_scalar(&field.name, v),
            (kind, v) => Err(IntrospectError::mismatch(
                &field.name,
                kind.to_string(),
                v.kind_name(),
            )),
        }
    }

    fn write_scalar(&mut self, field: &str, value: &Value) -> Result<(), IntrospectError> {
        let (raw, size) = scalar_to_le(value)
            .ok_or_else(|| IntrospectError::mismatch(field, "scalar", value.kind_name()))?;
        self.align(size);
        self.out.extend_from_slice(&raw[..size]);
        Ok(())
    }

    fn write_string(
        &mut self,
        field: &str,
        s: &str,
        max_length: Option<usize>,
    ) -> Result<(), IntrospectError> {
        if let Some(bound) = max_length {
            if s.len() > bound {
                return Err(IntrospectError::BoundExceeded {
                    field: field.to_string(),
                    len: s.len(),
                    bound,
                });
            }
        }
        self.write_count(s.len() + 1);
        self.out.extend_from_slice(s.as_bytes());
        self.out.push(0);
        Ok(())
    }

    fn write_count(&mut self, count: usize) {
        self.align(4);
        self.out.extend_from_slice(&(count as u32).to_le_bytes());
    }
}

pub(crate) struct CdrDecoder<'a, 'e> {
    engine: &'e Introspector,
    input: &'a [u8],
    pos: usize,
}

impl<'a, 'e> CdrDecoder<'a, 'e> {
    pub(crate) fn new(engine: &'e Introspector, input: &'a [u8]) -> Self {
        Self { engine, input, pos: 0 }
    }

    fn error(&self, kind: DecodeErrorKind) -> IntrospectError {
        DecodeError { offset: self.pos, kind }.into()
    }

    /// Fail unless the whole input was consumed.
    pub(crate) fn finish(&self) -> Result<(), IntrospectError> {
        let remaining = self.input.len().saturating_sub(self.pos);
        if remaining > 0 {
            return Err(self.error(DecodeErrorKind::TrailingBytes { remaining }));
        }
        Ok(())
    }

    fn align(&mut self, alignment: usize) {
        self.pos = self.pos.div_ceil(alignment) * alignment;
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], IntrospectError> {
        let have = self.input.len().saturating_sub(self.pos);
        if count > have {
            return Err(self.error(DecodeErrorKind::Truncated { need: count, have }));
        }
        let bytes = &self.input[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub(crate) fn decode_message(
        &mut self,
        buffer: &mut MessageBuffer,
        base: usize,
        descriptor: &MessageDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        self.engine.enter(depth)?;
        for field in descriptor.fields() {
            self.decode_field(buffer, base, field, depth)?;
        }
        Ok(())
    }

    fn decode_field(
        &mut self,
        buffer: &mut MessageBuffer,
        base: usize,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        let at = base + field.offset;
        match field.cardinality {
            Cardinality::Single => self.decode_element(buffer, at, field, depth),
            Cardinality::Array(len) => {
                let stride = stride(field)?;
                for i in 0..len {
                    self.decode_element(buffer, at + i * stride, field, depth)?;
                }
                Ok(())
            }
            Cardinality::BoundedSequence(_) | Cardinality::Sequence => {
                let count = self.read_count(field)?;
                if field.kind.is_message() {
                    let nested = nested_of(field)?;
                    let mut items = Vec::with_capacity(count.min(self.input.len()));
                    for _ in 0..count {
                        let mut item = fresh(&nested)?;
                        self.decode_message(&mut item, 0, &nested, depth + 1)?;
                        items.push(item);
                    }
                    buffer.region(base).put_messages(field.offset, items);
                } else {
                    let mut items = Vec::with_capacity(count.min(self.input.len()));
                    for _ in 0..count {
                        items.push(self.decode_value(field)?);
                    }
                    buffer.region(base).put_values(field.offset, items);
                }
                Ok(())
            }
        }
    }

    fn decode_element(
        &mut self,
        buffer: &mut MessageBuffer,
        at: usize,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<(), IntrospectError> {
        if field.kind.is_message() {
            let nested = nested_of(field)?;
            return self.decode_message(buffer, at, &nested, depth + 1);
        }
        match self.decode_value(field)? {
            Value::String(s) => buffer.region(at).put_string(0, s),
            scalar => buffer.region(at).write_scalar(0, &scalar)?,
        }
        Ok(())
    }

    fn decode_value(&mut self, field: &FieldDescriptor) -> Result<Value, IntrospectError> {
        match &field.kind {
            FieldKind::String { max_length } => {
                self.read_string(field, *max_length).map(Value::String)
            }
            FieldKind::Bool => {
                let start = self.pos;
                let byte = self.read_bytes(1)?[0];
                match byte {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    other => {
                        self.pos = start;
                        Err(self.error(DecodeErrorKind::InvalidBool(other)))
                    }
                }
            }
            FieldKind::Message(_) => {
                Err(IntrospectError::mismatch(&field.name, "scalar", "message"))
            }
            kind => {
                let (size, align) = kind.scalar_layout().ok_or_else(|| {
                    IntrospectError::mismatch(&field.name, "scalar", kind.to_string())
                })?;
                self.align(align);
                let bytes = self.read_bytes(size)?;
                scalar_from_le(kind, bytes).ok_or_else(|| {
                    IntrospectError::mismatch(&field.name, kind.to_string(), "raw bytes")
                })
            }
        }
    }

    fn read_u32(&mut self) -> Result<u32, IntrospectError> {
        self.align(4);
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_count(&mut self, field: &FieldDescriptor) -> Result<usize, IntrospectError> {
        self.align(4);
        let start = self.pos;
        let count = self.read_u32()? as usize;
        if let Some(bound) = field.cardinality.upper_bound() {
            if count > bound {
                self.pos = start;
                return Err(self.error(DecodeErrorKind::BoundExceeded {
                    field: field.name.clone(),
                    len: count,
                    bound,
                }));
            }
        }
        let min_len = min_element_len(field);
        let max = match min_len {
            0 => self.engine.max_sequence_len.min(ZERO_SIZED_SEQUENCE_MAX),
            _ => self.engine.max_sequence_len,
        };
        if count > max {
            self.pos = start;
            return Err(self.error(DecodeErrorKind::SequenceTooLong { len: count, max }));
        }
        let have = self.input.len().saturating_sub(self.pos);
        let need = count.saturating_mul(min_len);
        if need > have {
            return Err(self.error(DecodeErrorKind::Truncated { need, have }));
        }
        Ok(count)
    }

    fn read_string(
        &mut self,
        field: &FieldDescriptor,
        max_length: Option<usize>,
    ) -> Result<String, IntrospectError> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Err(self.error(DecodeErrorKind::InvalidString("zero length prefix")));
        }
        if let Some(bound) = max_length {
            if len - 1 > bound {
                return Err(self.error(DecodeErrorKind::BoundExceeded {
                    field: field.name.clone(),
                    len: len - 1,
                    bound,
                }));
            }
        }
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        let text = &bytes[..len - 1];
        if bytes[len - 1] != 0 {
            self.pos = start + len - 1;
            return Err(self.error(DecodeErrorKind::InvalidString("missing NUL terminator")));
        }
        match std::str::from_utf8(text) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => {
                self.pos = start + e.valid_up_to();
                Err(self.error(DecodeErrorKind::InvalidUtf8))
            }
        }
    }
}

/// Fewest bytes one element of `field` can occupy on the wire, padding aside.
fn min_element_len(field: &FieldDescriptor) -> usize {
    match &field.kind {
        FieldKind::String { .. } => 5,
        FieldKind::Message(_) => field.nested_descriptor().map_or(0, |d| min_message_len(&d)),
        scalar => scalar.scalar_layout().map_or(0, |(size, _)| size),
    }
}

fn min_message_len(desc: &MessageDescriptor) -> usize {
    desc.fields()
        .iter()
        .map(|field| match field.cardinality {
            Cardinality::Single => min_element_len(field),
            Cardinality::Array(n) => min_element_len(field).saturating_mul(n),
            Cardinality::BoundedSequence(_) | Cardinality::Sequence => 4,
        })
        .fold(0, usize::saturating_add)
}
