//! Values returned by the acquisition layer and their scalar type tags.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Dynamically typed value read from the robot memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Key exists but holds nothing
    Null,
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Bytes(Bytes),
}

impl Value {
    /// Short kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{v}"),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Scalar type used to wire dynamic memory channels
///
/// Numeric codes follow the operator-facing convention
/// `0 - None, 1 - Float, 2 - Int, 3 - String, 4 - Bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Unspecified: infer from the probed value
    #[default]
    None,
    Float,
    Int,
    String,
    Bool,
}

impl DataType {
    /// Parse the numeric operator code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DataType::None),
            1 => Some(DataType::Float),
            2 => Some(DataType::Int),
            3 => Some(DataType::String),
            4 => Some(DataType::Bool),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DataType::None => 0,
            DataType::Float => 1,
            DataType::Int => 2,
            DataType::String => 3,
            DataType::Bool => 4,
        }
    }

    /// Infer the scalar type of a probed value
    ///
    /// Returns `None` for values with no scalar mapping (lists, bytes, null).
    pub fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Float(_) => Some(DataType::Float),
            Value::Int(_) => Some(DataType::Int),
            Value::Str(_) => Some(DataType::String),
            Value::Bool(_) => Some(DataType::Bool),
            Value::Null | Value::List(_) | Value::Bytes(_) => None,
        }
    }

    /// Human-readable list of valid codes, used in error messages
    pub fn available() -> &'static str {
        "0 - None, 1 - Float, 2 - Int, 3 - String, 4 - Bool"
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::None => "none",
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::String => "string",
            DataType::Bool => "bool",
        };
        f.write_str(name)
    }
}
