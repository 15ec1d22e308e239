// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Init/fini capability attached to every message descriptor.

use crate::buffer::MessageRegion;
use crate::descriptor::{Cardinality, MessageDescriptor};
use crate::error::IntrospectError;
use std::fmt;

/// Initialization policy, mirroring `rosidl_runtime_c__message_initialization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMode {
    /// Zero everything, then apply field defaults.
    #[default]
    All,
    /// Zero everything, ignore defaults.
    Zero,
    /// Apply defaults only; other bytes are left as they are.
    DefaultsOnly,
    /// Leave memory untouched.
    Skip,
}

/// Per-type initialize/finalize behavior.
///
/// `initialize` must leave every field in a valid state (strings empty,
/// arrays sized, sequences empty unless defaulted). `finalize` releases owned
/// sub-resources without touching the buffer allocation.
pub trait MessageLifecycle: Send + Sync + fmt::Debug {
    fn initialize(
        &self,
        descriptor: &MessageDescriptor,
        region: &mut MessageRegion<'_>,
        mode: InitMode,
    ) -> Result<(), IntrospectError>;

    fn finalize(&self, descriptor: &MessageDescriptor, region: &mut MessageRegion<'_>);
}

/// Descriptor-driven lifecycle used when a type supplies none.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLifecycle;

impl MessageLifecycle for DefaultLifecycle {
    fn initialize(
        &self,
        descriptor: &MessageDescriptor,
        region: &mut MessageRegion<'_>,
        mode: InitMode,
    ) -> Result<(), IntrospectError> {
        if mode == InitMode::Skip {
            return Ok(());
        }
        if mode != InitMode::DefaultsOnly {
            region.release(descriptor.total_size());
            region.zero(descriptor.total_size());
        }

        for field in descriptor.fields() {
            let count = match field.cardinality {
                Cardinality::Single => 1,
                Cardinality::Array(n) => n,
                Cardinality::BoundedSequence(_) | Cardinality::Sequence => 0,
            };
            if field.kind.is_message() && count > 0 {
                let nested = field
                    .nested_descriptor()
                    .ok_or_else(|| unresolved(field.kind.message_key()))?;
                for i in 0..count {
                    let mut sub = region.sub(field.offset + i * nested.total_size());
                    nested.lifecycle().initialize(&nested, &mut sub, mode)?;
                }
            }
        }

        if matches!(mode, InitMode::All | InitMode::DefaultsOnly) {
            for field in descriptor.fields() {
                if let Some(default) = &field.default {
                    region.store(field, default)?;
                }
            }
        }
        Ok(())
    }

    fn finalize(&self, descriptor: &MessageDescriptor, region: &mut MessageRegion<'_>) {
        for field in descriptor.fields() {
            let (Cardinality::Single | Cardinality::Array(_)) = field.cardinality else {
                continue;
            };
            if let Some(nested) = field.nested_descriptor() {
                let count = match field.cardinality {
                    Cardinality::Array(n) => n,
                    _ => 1,
                };
                for i in 0..count {
                    let mut sub = region.sub(field.offset + i * nested.total_size());
                    nested.lifecycle().finalize(&nested, &mut sub);
                }
            }
        }
        region.release(descriptor.total_size());
    }
}

fn unresolved(key: Option<&crate::descriptor::TypeKey>) -> IntrospectError {
    match key {
        Some(key) => IntrospectError::TypeNotFound(key.clone()),
        None => IntrospectError::Lifecycle("message field without type key"),
    }
}
