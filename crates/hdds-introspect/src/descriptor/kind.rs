// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field kinds, cardinality and type keys.

use crate::error::BuildError;
use crate::value::Value;
use std::fmt;

/// In-memory slot reserved for a string or sequence field.
///
/// Mirrors the `{data, size, capacity}` triple of the rosidl C runtime; the
/// payload itself lives in the owning buffer's side storage.
pub const SLOT_SIZE: usize = 24;
/// Alignment of a string/sequence slot.
pub const SLOT_ALIGN: usize = 8;

pub const ROS_TYPE_FLOAT: u8 = 1;
pub const ROS_TYPE_DOUBLE: u8 = 2;
pub const ROS_TYPE_LONG_DOUBLE: u8 = 3;
pub const ROS_TYPE_CHAR: u8 = 4;
pub const ROS_TYPE_WCHAR: u8 = 5;
pub const ROS_TYPE_BOOLEAN: u8 = 6;
pub const ROS_TYPE_OCTET: u8 = 7;
pub const ROS_TYPE_UINT8: u8 = 8;
pub const ROS_TYPE_INT8: u8 = 9;
pub const ROS_TYPE_UINT16: u8 = 10;
pub const ROS_TYPE_INT16: u8 = 11;
pub const ROS_TYPE_UINT32: u8 = 12;
pub const ROS_TYPE_INT32: u8 = 13;
pub const ROS_TYPE_UINT64: u8 = 14;
pub const ROS_TYPE_INT64: u8 = 15;
pub const ROS_TYPE_STRING: u8 = 16;
pub const ROS_TYPE_WSTRING: u8 = 17;
pub const ROS_TYPE_MESSAGE: u8 = 18;

/// Registry key of a message type: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub namespace: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a ROS 2 type name into its rosidl key.
    ///
    /// `"pkg/msg/Type"`, `"pkg/Type"` and `"pkg::msg::Type"` all map to
    /// `("pkg__msg", "Type")`.
    pub fn parse_ros2(type_name: &str) -> Option<Self> {
        let normalized = type_name.replace("::", "/");
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [pkg, "msg", name] | [pkg, name] => Some(Self::new(format!("{}__msg", pkg), *name)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.name)
    }
}

/// Element kind of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String { max_length: Option<usize> },
    /// Nested message, referenced by key.
    Message(TypeKey),
}

impl FieldKind {
    /// Map a rosidl `ROS_TYPE_*` id to a field kind.
    ///
    /// `string_upper_bound` of 0 means unbounded. `nested` is required for
    /// `ROS_TYPE_MESSAGE`.
    pub fn from_ros_type_id(
        type_id: u8,
        string_upper_bound: usize,
        nested: Option<TypeKey>,
    ) -> Result<Self, BuildError> {
        let kind = match type_id {
            ROS_TYPE_FLOAT => Self::F32,
            ROS_TYPE_DOUBLE => Self::F64,
            ROS_TYPE_BOOLEAN => Self::Bool,
            ROS_TYPE_OCTET | ROS_TYPE_UINT8 => Self::U8,
            ROS_TYPE_INT8 => Self::I8,
            ROS_TYPE_UINT16 => Self::U16,
            ROS_TYPE_INT16 => Self::I16,
            ROS_TYPE_UINT32 => Self::U32,
            ROS_TYPE_INT32 => Self::I32,
            ROS_TYPE_UINT64 => Self::U64,
            ROS_TYPE_INT64 => Self::I64,
            ROS_TYPE_STRING => Self::String {
                max_length: (string_upper_bound > 0).then_some(string_upper_bound),
            },
            ROS_TYPE_MESSAGE => match nested {
                Some(key) => Self::Message(key),
                None => {
                    return Err(BuildError::Builder(
                        "message member without nested type".into(),
                    ))
                }
            },
            other => return Err(BuildError::UnsupportedType(other)),
        };
        Ok(kind)
    }

    /// Size and alignment of a scalar (non-string, non-message) element.
    pub fn scalar_layout(&self) -> Option<(usize, usize)> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some((1, 1)),
            Self::I16 | Self::U16 => Some((2, 2)),
            Self::I32 | Self::U32 | Self::F32 => Some((4, 4)),
            Self::I64 | Self::U64 | Self::F64 => Some((8, 8)),
            Self::String { .. } | Self::Message(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String { .. })
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message(_))
    }

    /// Nested type key, if this is a message kind.
    pub fn message_key(&self) -> Option<&TypeKey> {
        match self {
            Self::Message(key) => Some(key),
            _ => None,
        }
    }

    /// Whether `value` is a scalar/string of exactly this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::I8, Value::I8(_))
                | (Self::U8, Value::U8(_))
                | (Self::I16, Value::I16(_))
                | (Self::U16, Value::U16(_))
                | (Self::I32, Value::I32(_))
                | (Self::U32, Value::U32(_))
                | (Self::I64, Value::I64(_))
                | (Self::U64, Value::U64(_))
                | (Self::F32, Value::F32(_))
                | (Self::F64, Value::F64(_))
                | (Self::String { .. }, Value::String(_))
        )
    }

    /// Default (zero) value of a scalar or string kind.
    pub fn zero_value(&self) -> Option<Value> {
        let v = match self {
            Self::Bool => Value::Bool(false),
            Self::I8 => Value::I8(0),
            Self::U8 => Value::U8(0),
            Self::I16 => Value::I16(0),
            Self::U16 => Value::U16(0),
            Self::I32 => Value::I32(0),
            Self::U32 => Value::U32(0),
            Self::I64 => Value::I64(0),
            Self::U64 => Value::U64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
            Self::String { .. } => Value::String(String::new()),
            Self::Message(_) => return None,
        };
        Some(v)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::I8 => write!(f, "int8"),
            Self::U8 => write!(f, "uint8"),
            Self::I16 => write!(f, "int16"),
            Self::U16 => write!(f, "uint16"),
            Self::I32 => write!(f, "int32"),
            Self::U32 => write!(f, "uint32"),
            Self::I64 => write!(f, "int64"),
            Self::U64 => write!(f, "uint64"),
            Self::F32 => write!(f, "float32"),
            Self::F64 => write!(f, "float64"),
            Self::String { max_length: None } => write!(f, "string"),
            Self::String {
                max_length: Some(n),
            } => write!(f, "string<={}", n),
            Self::Message(key) => write!(f, "{}", key),
        }
    }
}

/// How many elements a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    /// Scalar field.
    #[default]
    Single,
    /// Fixed-length array stored inline.
    Array(usize),
    /// Dynamic sequence with an upper bound.
    BoundedSequence(usize),
    /// Unbounded dynamic sequence.
    Sequence,
}

impl Cardinality {
    /// Map the rosidl `(is_array, array_size, is_upper_bound)` member triple.
    pub fn from_rosidl(is_array: bool, array_size: usize, is_upper_bound: bool) -> Self {
        if !is_array {
            Self::Single
        } else if is_upper_bound {
            Self::BoundedSequence(array_size)
        } else if array_size > 0 {
            Self::Array(array_size)
        } else {
            Self::Sequence
        }
    }

    pub fn is_array(self) -> bool {
        !matches!(self, Self::Single)
    }

    /// `0` for scalars, the length of fixed arrays, `-1` for sequences.
    pub fn array_length(self) -> i64 {
        match self {
            Self::Single => 0,
            Self::Array(n) => n as i64,
            Self::BoundedSequence(_) | Self::Sequence => -1,
        }
    }

    /// True for variable-length storage.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::BoundedSequence(_) | Self::Sequence)
    }

    pub fn upper_bound(self) -> Option<usize> {
        match self {
            Self::BoundedSequence(bound) => Some(bound),
            _ => None,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => Ok(()),
            Self::Array(n) => write!(f, "[{}]", n),
            Self::BoundedSequence(n) => write!(f, "[<={}]", n),
            Self::Sequence => write!(f, "[]"),
        }
    }
}
