//! Typed scalar values.
//!
//! `Value` is the unit of data carried through samples, edge buffers and
//! stateful variables. Numeric variants are stored inline; strings share one
//! allocation through `Arc<str>`, so cloning a value never copies payload.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declared data type of a channel, parameter or stateful variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// UTF-8 string
    String,
    /// No value; also used for types the front end could not resolve
    Unit,
}

impl DataType {
    /// Zero value for this type, `None` for unit
    #[must_use]
    pub fn zero_value(&self) -> Option<Value> {
        let zero = match self {
            Self::U8 => Value::U8(0),
            Self::U16 => Value::U16(0),
            Self::U32 => Value::U32(0),
            Self::U64 => Value::U64(0),
            Self::I8 => Value::I8(0),
            Self::I16 => Value::I16(0),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
            Self::String => Value::String(Arc::from("")),
            Self::Unit => return None,
        };
        Some(zero)
    }

    /// Whether the type is an integer or float
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::String | Self::Unit)
    }

    /// Whether the type is a float
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Lowercase type name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Unit => "unit",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Signed 8-bit integer
    I8(i8),
    /// Signed 16-bit integer
    I16(i16),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// UTF-8 string
    String(Arc<str>),
}

impl Value {
    /// Data type of this value
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::U8(_) => DataType::U8,
            Self::U16(_) => DataType::U16,
            Self::U32(_) => DataType::U32,
            Self::U64(_) => DataType::U64,
            Self::I8(_) => DataType::I8,
            Self::I16(_) => DataType::I16,
            Self::I32(_) => DataType::I32,
            Self::I64(_) => DataType::I64,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::String(_) => DataType::String,
        }
    }

    /// Numeric value widened to f64
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::U8(v) => Some(f64::from(v)),
            Self::U16(v) => Some(f64::from(v)),
            Self::U32(v) => Some(f64::from(v)),
            Self::U64(v) => Some(v as f64),
            Self::I8(v) => Some(f64::from(v)),
            Self::I16(v) => Some(f64::from(v)),
            Self::I32(v) => Some(f64::from(v)),
            Self::I64(v) => Some(v as f64),
            Self::F32(v) => Some(f64::from(v)),
            Self::F64(v) => Some(v),
            Self::String(_) => None,
        }
    }

    /// Integer value widened to i64 (u64 values above `i64::MAX` return `None`)
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::U8(v) => Some(i64::from(v)),
            Self::U16(v) => Some(i64::from(v)),
            Self::U32(v) => Some(i64::from(v)),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I8(v) => Some(i64::from(v)),
            Self::I16(v) => Some(i64::from(v)),
            Self::I32(v) => Some(i64::from(v)),
            Self::I64(v) => Some(v),
            Self::F32(_) | Self::F64(_) | Self::String(_) => None,
        }
    }

    /// String contents
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read a bare JSON literal as a value of the given type
    ///
    /// # Errors
    ///
    /// Returns error if the literal is out of range or of the wrong kind
    pub fn from_json(data_type: DataType, literal: &serde_json::Value) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidLiteral {
            data_type,
            literal: literal.to_string(),
        };
        let unsigned = || literal.as_u64().ok_or_else(invalid);
        let signed = || literal.as_i64().ok_or_else(invalid);

        let value = match data_type {
            DataType::U8 => Self::U8(u8::try_from(unsigned()?).map_err(|_| invalid())?),
            DataType::U16 => Self::U16(u16::try_from(unsigned()?).map_err(|_| invalid())?),
            DataType::U32 => Self::U32(u32::try_from(unsigned()?).map_err(|_| invalid())?),
            DataType::U64 => Self::U64(unsigned()?),
            DataType::I8 => Self::I8(i8::try_from(signed()?).map_err(|_| invalid())?),
            DataType::I16 => Self::I16(i16::try_from(signed()?).map_err(|_| invalid())?),
            DataType::I32 => Self::I32(i32::try_from(signed()?).map_err(|_| invalid())?),
            DataType::I64 => Self::I64(signed()?),
            DataType::F32 => Self::F32(literal.as_f64().ok_or_else(invalid)? as f32),
            DataType::F64 => Self::F64(literal.as_f64().ok_or_else(invalid)?),
            DataType::String => Self::String(Arc::from(literal.as_str().ok_or_else(invalid)?)),
            DataType::Unit => return Err(invalid()),
        };
        Ok(value)
    }

    /// Bare JSON literal for this value (the inverse of [`Value::from_json`])
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::U8(v) => (*v).into(),
            Self::U16(v) => (*v).into(),
            Self::U32(v) => (*v).into(),
            Self::U64(v) => (*v).into(),
            Self::I8(v) => (*v).into(),
            Self::I16(v) => (*v).into(),
            Self::I32(v) => (*v).into(),
            Self::I64(v) => (*v).into(),
            Self::F32(v) => f64::from(*v).into(),
            Self::F64(v) => (*v).into(),
            Self::String(s) => serde_json::Value::String(s.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Arc::from(value))
    }
}
