// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for descriptor construction, registry builds, field access and
//! the wire codec.
//!
//! Every failure is surfaced as a typed result. Nothing in this crate aborts
//! the process or leaves a registry/buffer half-written.

use crate::descriptor::TypeKey;
use thiserror::Error;

/// Failures while constructing or registering a message descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A field was declared without a name.
    #[error("field #{index} has an empty name")]
    EmptyFieldName { index: usize },

    /// Two fields share the same name.
    #[error("duplicate field name `{name}`")]
    DuplicateField { name: String },

    /// Field offset does not honour the field's alignment.
    #[error("field `{name}` at offset {offset} is not {alignment}-byte aligned")]
    MisalignedField {
        name: String,
        offset: usize,
        alignment: usize,
    },

    /// `offset + size` runs past the message's total size.
    #[error("field `{name}` ({offset}+{size}) overruns message size {total_size}")]
    FieldOverrun {
        name: String,
        offset: usize,
        size: usize,
        total_size: usize,
    },

    /// Two fields claim overlapping byte ranges.
    #[error("fields `{first}` and `{second}` overlap")]
    OverlappingFields { first: String, second: String },

    /// Default value disagrees with the field's kind or cardinality.
    #[error("default value for `{name}` does not match its kind ({reason})")]
    InvalidDefault { name: String, reason: String },

    /// The builder produced a descriptor for a different key.
    #[error("builder for {expected} produced {actual}")]
    KeyMismatch { expected: TypeKey, actual: TypeKey },

    /// Nested message type is neither the type itself nor already registered.
    #[error("field `{field}` references unregistered type {target}")]
    UnresolvedNested { field: String, target: TypeKey },

    /// A type embeds itself inline, which has no finite layout.
    #[error("field `{field}` embeds {target} inline; self-reference requires a sequence")]
    InlineSelfReference { field: String, target: TypeKey },

    /// Building a type re-entered the registry for the same type on the same thread.
    #[error("recursive build of {key}")]
    RecursiveBuild { key: TypeKey },

    /// rosidl type id outside the supported scalar set.
    #[error("unsupported rosidl type id {0}")]
    UnsupportedType(u8),

    /// Failure reported by the type's builder itself.
    #[error("builder failed: {0}")]
    Builder(String),
}

/// What went wrong while decoding a byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Input ended before the structure was complete.
    Truncated { need: usize, have: usize },
    /// Bytes remained after the last field.
    TrailingBytes { remaining: usize },
    /// Boolean byte other than 0 or 1.
    InvalidBool(u8),
    /// String length prefix of zero or missing NUL terminator.
    InvalidString(&'static str),
    /// String payload is not UTF-8.
    InvalidUtf8,
    /// String or sequence exceeds its declared upper bound.
    BoundExceeded { field: String, len: usize, bound: usize },
    /// Sequence count larger than the configured limit.
    SequenceTooLong { len: usize, max: usize },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { need, have } => {
                write!(f, "truncated input: need {} bytes, have {}", need, have)
            }
            Self::TrailingBytes { remaining } => write!(f, "{} trailing bytes", remaining),
            Self::InvalidBool(b) => write!(f, "invalid boolean byte 0x{:02x}", b),
            Self::InvalidString(why) => write!(f, "invalid string: {}", why),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::BoundExceeded { field, len, bound } => {
                write!(f, "`{}` length {} exceeds bound {}", field, len, bound)
            }
            Self::SequenceTooLong { len, max } => {
                write!(f, "sequence length {} exceeds limit {}", len, max)
            }
        }
    }
}

/// Decode failure with the byte position at which it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode error at byte {offset}: {kind}")]
pub struct DecodeError {
    pub offset: usize,
    pub kind: DecodeErrorKind,
}

/// Top-level error for registry lookups, field access and (de)serialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntrospectError {
    #[error("field `{field}` not found in {message}")]
    FieldNotFound { message: String, field: String },

    #[error("type {0} is not registered")]
    TypeNotFound(TypeKey),

    #[error("type mismatch on `{field}`: expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("`{field}` length {len} exceeds bound {bound}")]
    BoundExceeded {
        field: String,
        len: usize,
        bound: usize,
    },

    #[error("index {index} out of bounds for `{field}` (length {len})")]
    IndexOutOfBounds {
        field: String,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("build failure: {0}")]
    Build(#[from] BuildError),

    #[error("buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// init/fini contract violated (e.g. double fini, access after fini).
    #[error("lifecycle misuse: {0}")]
    Lifecycle(&'static str),

    #[error("nesting depth limit {0} exceeded")]
    DepthExceeded(usize),
}

impl IntrospectError {
    pub(crate) fn mismatch(
        field: &str,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// True for the "not found" class (unknown field or unregistered type).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FieldNotFound { .. } | Self::TypeNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display_has_offset() {
        let err = DecodeError {
            offset: 12,
            kind: DecodeErrorKind::Truncated { need: 4, have: 1 },
        };
        let msg = err.to_string();
        assert!(msg.contains("byte 12"));
        assert!(msg.contains("need 4"));
    }

    #[test]
    fn test_not_found_class() {
        let err = IntrospectError::FieldNotFound {
            message: "pkg::T".into(),
            field: "x".into(),
        };
        assert!(err.is_not_found());
        assert!(!IntrospectError::DepthExceeded(4).is_not_found());
    }
}
