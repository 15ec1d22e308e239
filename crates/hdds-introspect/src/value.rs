// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged field values exchanged with the introspection engine.

use crate::error::IntrospectError;

/// A field value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Scalars
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),

    // Composites
    /// Elements of a fixed array or a sequence.
    Sequence(Vec<Value>),
    /// Nested message fields in declaration order.
    Message(Vec<(String, Value)>),
}

impl Value {
    /// Short kind name used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "int8",
            Self::U8(_) => "uint8",
            Self::I16(_) => "int16",
            Self::U16(_) => "uint16",
            Self::I32(_) => "int32",
            Self::U32(_) => "uint32",
            Self::I64(_) => "int64",
            Self::U64(_) => "uint64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Message(_) => "message",
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as sequence elements.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a nested message field by name.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Message(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Message(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Extraction of a concrete Rust type from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, IntrospectError>;
}

macro_rules! impl_value_conversions {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, IntrospectError> {
                match value {
                    Value::$variant(v) => Ok(*v),
                    other => Err(IntrospectError::mismatch("<value>", $name, other.kind_name())),
                }
            }
        }
    };
}

impl_value_conversions!(bool, Bool, "bool");
impl_value_conversions!(i8, I8, "int8");
impl_value_conversions!(u8, U8, "uint8");
impl_value_conversions!(i16, I16, "int16");
impl_value_conversions!(u16, U16, "uint16");
impl_value_conversions!(i32, I32, "int32");
impl_value_conversions!(u32, U32, "uint32");
impl_value_conversions!(i64, I64, "int64");
impl_value_conversions!(u64, U64, "uint64");
impl_value_conversions!(f32, F32, "float32");
impl_value_conversions!(f64, F64, "float64");

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, IntrospectError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| IntrospectError::mismatch("<value>", "string", value.kind_name()))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, IntrospectError> {
        let items = value
            .as_sequence()
            .ok_or_else(|| IntrospectError::mismatch("<value>", "sequence", value.kind_name()))?;
        items.iter().map(T::from_value).collect()
    }
}
