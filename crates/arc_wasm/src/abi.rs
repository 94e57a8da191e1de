//! Value encoding across the host/guest boundary.
//!
//! Stage values travel as core WASM numbers: integers up to 32 bits as
//! `i32`, 64-bit integers as `i64`, and floats as themselves. Unsigned
//! values are reinterpreted bit for bit. Strings and unit have no encoding.

use arc_core::{DataType, Value};
use serde::{Deserialize, Serialize};
use wasmtime::{Val, ValType};

/// Core WASM number type carrying a stage value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasmType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl WasmType {
    /// Encoding used for `data_type`, `None` if it cannot cross the boundary
    #[must_use]
    pub const fn of(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::U8
            | DataType::U16
            | DataType::U32
            | DataType::I8
            | DataType::I16
            | DataType::I32 => Some(Self::I32),
            DataType::U64 | DataType::I64 => Some(Self::I64),
            DataType::F32 => Some(Self::F32),
            DataType::F64 => Some(Self::F64),
            DataType::String | DataType::Unit => None,
        }
    }

    /// Map a wasmtime value type, `None` for vectors and references
    #[must_use]
    pub fn from_val_type(ty: &ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(Self::I32),
            ValType::I64 => Some(Self::I64),
            ValType::F32 => Some(Self::F32),
            ValType::F64 => Some(Self::F64),
            _ => None,
        }
    }

    /// Type of a runtime value, `None` for vectors and references
    #[must_use]
    pub fn of_val(val: &Val) -> Option<Self> {
        match val {
            Val::I32(_) => Some(Self::I32),
            Val::I64(_) => Some(Self::I64),
            Val::F32(_) => Some(Self::F32),
            Val::F64(_) => Some(Self::F64),
            _ => None,
        }
    }

    /// Suffix used in host import names
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Zeroed value, used to size result buffers
    #[must_use]
    pub fn zero(&self) -> Val {
        match self {
            Self::I32 => Val::I32(0),
            Self::I64 => Val::I64(0),
            Self::F32 => Val::F32(0),
            Self::F64 => Val::F64(0),
        }
    }
}

impl std::fmt::Display for WasmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a function signature, e.g. `(f64, f64) -> (f64)`
#[must_use]
pub fn signature(params: &[WasmType], results: &[WasmType]) -> String {
    let join = |types: &[WasmType]| {
        types
            .iter()
            .map(WasmType::name)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("({}) -> ({})", join(params), join(results))
}

/// Encode a stage value as a WASM value
#[must_use]
pub fn encode(value: &Value) -> Option<Val> {
    let val = match value {
        Value::U8(v) => Val::I32(i32::from(*v)),
        Value::U16(v) => Val::I32(i32::from(*v)),
        Value::U32(v) => Val::I32(*v as i32),
        Value::I8(v) => Val::I32(i32::from(*v)),
        Value::I16(v) => Val::I32(i32::from(*v)),
        Value::I32(v) => Val::I32(*v),
        Value::U64(v) => Val::I64(*v as i64),
        Value::I64(v) => Val::I64(*v),
        Value::F32(v) => Val::from(*v),
        Value::F64(v) => Val::from(*v),
        Value::String(_) => return None,
    };
    Some(val)
}

/// Decode a WASM value into `data_type`, truncating narrow integers
#[must_use]
pub fn decode(data_type: DataType, val: &Val) -> Option<Value> {
    let value = match (data_type, val) {
        (DataType::U8, Val::I32(v)) => Value::U8(*v as u8),
        (DataType::U16, Val::I32(v)) => Value::U16(*v as u16),
        (DataType::U32, Val::I32(v)) => Value::U32(*v as u32),
        (DataType::I8, Val::I32(v)) => Value::I8(*v as i8),
        (DataType::I16, Val::I32(v)) => Value::I16(*v as i16),
        (DataType::I32, Val::I32(v)) => Value::I32(*v),
        (DataType::U64, Val::I64(v)) => Value::U64(*v as u64),
        (DataType::I64, Val::I64(v)) => Value::I64(*v),
        (DataType::F32, Val::F32(bits)) => Value::F32(f32::from_bits(*bits)),
        (DataType::F64, Val::F64(bits)) => Value::F64(f64::from_bits(*bits)),
        _ => return None,
    };
    Some(value)
}
