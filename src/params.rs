// Copyright (c) 2025 Presto Client Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serialization of query parameters into Presto SQL literals.
//!
//! Each positional parameter is rendered as a literal and substituted for a
//! `?` placeholder in the SQL text. The accepted kinds are deliberately
//! narrow: floating-point values are refused because their decimal rendering
//! is lossy (pass a [`Numeric`] string instead), and single bytes are
//! refused because they are ambiguous between character and numeric data.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// String representation of a number, such as `"10"`, `"5.5"` or scientific
/// form. Serialization fails for strings that do not parse as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numeric(pub String);

impl Numeric {
    /// Wrap a numeric string.
    pub fn new(s: impl Into<String>) -> Self {
        Numeric(s.into())
    }
}

/// A query parameter value.
///
/// Most callers construct these through `From` conversions:
/// `1i64.into()`, `"hello".into()`, `vec![1.into(), 2.into()].into()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Rejected; write SQL `NULL` in the statement text instead.
    Null,
    /// `true` / `false`
    Bool(bool),
    /// 8-bit signed integer
    TinyInt(i8),
    /// 16-bit signed integer
    SmallInt(i16),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    BigInt(i64),
    /// 8-bit unsigned integer; rejected (ambiguous with character data)
    UTinyInt(u8),
    /// 16-bit unsigned integer
    USmallInt(u16),
    /// 32-bit unsigned integer
    UInt(u32),
    /// 64-bit unsigned integer
    UBigInt(u64),
    /// 32-bit float; rejected, use [`Numeric`]
    Float(f32),
    /// 64-bit float; rejected, use [`Numeric`]
    Double(f64),
    /// Validated numeric string
    Numeric(Numeric),
    /// Single-quoted string literal
    String(String),
    /// Rejected; no unambiguous Presto target type
    Bytes(Vec<u8>),
    /// Rejected; Presto date/time literals take several distinct forms
    DateTime(DateTime<Utc>),
    /// Rejected; no unambiguous Presto target type
    Json(serde_json::Value),
    /// `ARRAY[...]`, elements serialized recursively
    Array(Vec<Value>),
    /// Rejected; iteration order is not guaranteed to match MAP semantics
    Map(Vec<(Value, Value)>),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "<nil>",
            Value::Bool(_) => "bool",
            Value::TinyInt(_) => "i8",
            Value::SmallInt(_) => "i16",
            Value::Int(_) => "i32",
            Value::BigInt(_) => "i64",
            Value::UTinyInt(_) => "byte/uint8",
            Value::USmallInt(_) => "u16",
            Value::UInt(_) => "u32",
            Value::UBigInt(_) => "u64",
            Value::Float(_) => "f32",
            Value::Double(_) => "f64",
            Value::Numeric(_) => "numeric",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

/// Convert a parameter value to its Presto SQL literal.
pub fn serialize(value: &Value) -> Result<String> {
    match value {
        Value::TinyInt(x) => Ok(x.to_string()),
        Value::SmallInt(x) => Ok(x.to_string()),
        Value::Int(x) => Ok(x.to_string()),
        Value::BigInt(x) => Ok(x.to_string()),
        Value::USmallInt(x) => Ok(x.to_string()),
        Value::UInt(x) => Ok(x.to_string()),
        Value::UBigInt(x) => Ok(x.to_string()),

        Value::Numeric(Numeric(s)) => {
            if s.parse::<f64>().is_err() {
                return Err(Error::Params(format!("invalid numeric literal: {:?}", s)));
            }
            Ok(s.clone())
        }

        Value::Bool(x) => Ok(x.to_string()),

        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),

        Value::Array(elements) => {
            let rendered = elements
                .iter()
                .map(serialize)
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("ARRAY[{}]", rendered.join(", ")))
        }

        Value::Null
        | Value::UTinyInt(_)
        | Value::Float(_)
        | Value::Double(_)
        | Value::Bytes(_)
        | Value::DateTime(_)
        | Value::Json(_)
        | Value::Map(_) => Err(Error::UnsupportedArg(value.kind_name().to_string())),
    }
}

/// Substitute serialized parameters for `?` placeholders, in order.
///
/// The substitution is positional and does not parse the SQL: a `?` inside
/// a string literal is treated as a placeholder too, so callers must avoid
/// bare `?` characters in literals when passing parameters. Placeholders
/// beyond the parameter count are left in place.
pub(crate) fn interpolate(sql: &str, params: &[Value]) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }
    let mut out = String::with_capacity(sql.len());
    let mut params = params.iter();
    let mut bound = 0usize;
    for (i, part) in sql.split('?').enumerate() {
        if i > 0 {
            match params.next() {
                Some(value) => {
                    out.push_str(&serialize(value)?);
                    bound += 1;
                }
                None => out.push('?'),
            }
        }
        out.push_str(part);
    }
    if params.next().is_some() {
        return Err(Error::Params(format!(
            "{} placeholders bound but more parameters were given",
            bound
        )));
    }
    Ok(out)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}
impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}
impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::BigInt(v as i64)
    }
}
impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UTinyInt(v)
    }
}
impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::USmallInt(v)
    }
}
impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UBigInt(v)
    }
}
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UBigInt(v as u64)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<Numeric> for Value {
    fn from(v: Numeric) -> Self {
        Value::Numeric(v)
    }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}
