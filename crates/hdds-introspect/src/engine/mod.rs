// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Introspection engine: descriptor-driven field access and wire codec.
//!
//! # Example
//!
//! ```
//! use hdds_introspect::{
//!     FieldKind, Introspector, MessageDescriptorBuilder, MessageMut, MessageRef,
//! };
//! use std::sync::Arc;
//!
//! let desc = Arc::new(
//!     MessageDescriptorBuilder::new("demo__msg", "Ping")
//!         .field("seq", FieldKind::U32)
//!         .string_field("note")
//!         .build()?,
//! );
//! let engine = Introspector::new();
//! let mut buffer = engine.create(&desc)?;
//! engine.set(&mut MessageMut::new(&mut buffer, &desc)?, "seq", 7u32)?;
//!
//! let bytes = engine.serialize(&MessageRef::new(&buffer, &desc)?)?;
//! let decoded = engine.decode(&bytes, &desc)?;
//! assert_eq!(decoded, buffer);
//! # Ok::<(), hdds_introspect::IntrospectError>(())
//! ```

mod access;
mod cdr;
mod view;

pub use view::{ArrayRef, FieldValue, MessageMut, MessageRef};

use crate::buffer::MessageBuffer;
use crate::config::IntrospectConfig;
use crate::descriptor::MessageDescriptor;
use crate::error::IntrospectError;
use cdr::{CdrDecoder, CdrEncoder};
use std::sync::Arc;

/// Default nesting limit for traversal.
pub const DEFAULT_MAX_DEPTH: usize = 32;
/// Default upper limit on decoded sequence element counts.
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 16 * 1024 * 1024;

/// Stateless engine; holds traversal limits only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Introspector {
    pub(crate) max_depth: usize,
    pub(crate) max_sequence_len: usize,
}

impl Default for Introspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspector {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }

    /// Engine using the limits of `config`.
    pub fn with_config(config: &IntrospectConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_sequence_len: config.max_sequence_len,
        }
    }

    /// Override the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_sequence_len(&self) -> usize {
        self.max_sequence_len
    }

    pub(crate) fn enter(&self, depth: usize) -> Result<(), IntrospectError> {
        if depth > self.max_depth {
            return Err(IntrospectError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    /// Initialize `buffer` as a default instance of `descriptor`.
    pub fn init(
        &self,
        buffer: &mut MessageBuffer,
        descriptor: &MessageDescriptor,
    ) -> Result<(), IntrospectError> {
        descriptor.init(buffer)
    }

    /// Allocate and initialize a default instance.
    pub fn create(&self, descriptor: &MessageDescriptor) -> Result<MessageBuffer, IntrospectError> {
        let mut buffer = MessageBuffer::for_descriptor(descriptor);
        descriptor.init(&mut buffer)?;
        Ok(buffer)
    }

    /// Encode `msg` to wire bytes.
    pub fn serialize(&self, msg: &MessageRef<'_>) -> Result<Vec<u8>, IntrospectError> {
        let mut encoder = CdrEncoder::new(self, msg.descriptor.total_size());
        encoder.encode_message(msg.buffer, msg.base, &msg.descriptor, 0)?;
        let bytes = encoder.into_bytes();
        log::trace!("[codec] encoded {} ({} bytes)", msg.descriptor.type_name(), bytes.len());
        Ok(bytes)
    }

    /// Decode `bytes` into `buffer`.
    ///
    /// The input must match the descriptor exactly, with no trailing bytes.
    /// On error `buffer` is left as it was.
    pub fn deserialize(
        &self,
        bytes: &[u8],
        descriptor: &Arc<MessageDescriptor>,
        buffer: &mut MessageBuffer,
    ) -> Result<(), IntrospectError> {
        if buffer.len() < descriptor.total_size() {
            return Err(IntrospectError::BufferTooSmall {
                need: descriptor.total_size(),
                have: buffer.len(),
            });
        }
        let mut decoded = MessageBuffer::with_size(buffer.len());
        descriptor.init(&mut decoded)?;

        let mut decoder = CdrDecoder::new(self, bytes);
        decoder.decode_message(&mut decoded, 0, descriptor, 0)?;
        decoder.finish()?;
        log::trace!("[codec] decoded {} ({} bytes)", descriptor.type_name(), bytes.len());

        *buffer = decoded;
        Ok(())
    }

    /// Decode `bytes` into a new buffer.
    pub fn decode(
        &self,
        bytes: &[u8],
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<MessageBuffer, IntrospectError> {
        let mut buffer = MessageBuffer::for_descriptor(descriptor);
        self.deserialize(bytes, descriptor, &mut buffer)?;
        Ok(buffer)
    }
}
