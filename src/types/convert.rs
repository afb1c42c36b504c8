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

//! Conversion of loosely typed wire values into strongly typed cells.
//!
//! The coordinator streams rows as JSON, so numbers arrive as doubles and
//! temporal values as strings. A [`Converter`] is materialized per column
//! from its type signature and applied at scan time. Row signatures nest:
//! the converter recurses over the field types; `map` and `array` values
//! pass through untouched (the slice scanners recurse on their own).

use chrono::offset::LocalResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::wire::TypeSignature;

/// A decoded result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// `boolean`
    Bool(bool),
    /// Textual types
    String(String),
    /// `tinyint` through `bigint`
    Int(i64),
    /// `real` and `double`
    Float(f64),
    /// `date`, `time` and `timestamp` variants, normalized to UTC
    Timestamp(DateTime<Utc>),
    /// `map`, passed through undecoded
    Map(serde_json::Map<String, JsonValue>),
    /// `array`, passed through undecoded
    Array(Vec<JsonValue>),
    /// `row`, field name to converted value; null fields omitted
    Row(IndexMap<String, CellValue>),
}

impl CellValue {
    /// True for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The string content, if textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float content, if floating-point.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The boolean content, if boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The timestamp content, if temporal.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Materialized converter for one column type.
#[derive(Debug, Clone)]
pub enum Converter {
    /// `boolean`
    Boolean,
    /// Textual types; also the fallback for unrecognized raw types
    Varchar,
    /// Integral types; the wire double is truncated
    BigInt,
    /// Floating-point types
    Double,
    /// `date`
    Date,
    /// `time`, `time with time zone`
    Time,
    /// `timestamp`, `timestamp with time zone`
    Timestamp,
    /// `map`; values are not recursively converted
    Map,
    /// `array`; elements are not recursively converted here
    Array,
    /// `row` with ordered field names and per-field converters
    Row {
        /// Field names from the literal arguments
        fields: Vec<String>,
        /// Per-field converters from the type arguments
        converters: Vec<Converter>,
    },
}

impl Converter {
    /// Build a converter from a type signature. `row` signatures recurse;
    /// anything else maps to a scalar converter by raw type.
    pub fn new(signature: &TypeSignature) -> Result<Converter> {
        if signature.raw_type != "row" {
            return Ok(Converter::scalar_for(&signature.raw_type));
        }
        if signature.literal_arguments.len() != signature.type_arguments.len() {
            return Err(Error::Conversion(format!(
                "row signature has {} field names for {} field types",
                signature.literal_arguments.len(),
                signature.type_arguments.len()
            )));
        }
        let mut fields = Vec::with_capacity(signature.literal_arguments.len());
        for literal in &signature.literal_arguments {
            let name = literal.as_str().ok_or_else(|| {
                Error::Conversion(format!("row field name is not a string: {}", literal))
            })?;
            fields.push(name.to_string());
        }
        let converters = signature
            .type_arguments
            .iter()
            .map(Converter::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Converter::Row { fields, converters })
    }

    /// Scalar converter for a raw type name or rendered type text
    /// (`varchar(1)`, `timestamp with time zone`, ...).
    pub fn scalar_for(type_name: &str) -> Converter {
        let name = type_name.trim();
        if name == "boolean" {
            Converter::Boolean
        } else if matches!(name, "bigint" | "integer" | "smallint" | "tinyint") {
            Converter::BigInt
        } else if matches!(name, "double" | "real") {
            Converter::Double
        } else if name == "date" {
            Converter::Date
        } else if name.starts_with("timestamp") {
            Converter::Timestamp
        } else if name.starts_with("time") {
            Converter::Time
        } else if name.starts_with("map") {
            Converter::Map
        } else if name.starts_with("array") {
            Converter::Array
        } else {
            Converter::Varchar
        }
    }

    /// Nominal type name reported in column metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            Converter::Boolean => "boolean",
            Converter::Varchar => "varchar",
            Converter::BigInt => "bigint",
            Converter::Double => "double",
            Converter::Date => "date",
            Converter::Time => "time",
            Converter::Timestamp => "timestamp",
            Converter::Map => "map",
            Converter::Array => "array",
            Converter::Row { .. } => "row",
        }
    }

    /// Convert one wire value. Null always converts to null without
    /// invoking any nested converter.
    pub fn convert(&self, value: &JsonValue) -> Result<CellValue> {
        if value.is_null() {
            return Ok(CellValue::Null);
        }
        match self {
            Converter::Boolean => value
                .as_bool()
                .map(CellValue::Bool)
                .ok_or_else(|| mismatch("boolean", value)),
            Converter::Varchar => value
                .as_str()
                .map(|s| CellValue::String(s.to_string()))
                .ok_or_else(|| mismatch("varchar", value)),
            Converter::BigInt => {
                if let Some(i) = value.as_i64() {
                    Ok(CellValue::Int(i))
                } else if let Some(f) = value.as_f64() {
                    Ok(CellValue::Int(f as i64))
                } else {
                    Err(mismatch("bigint", value))
                }
            }
            Converter::Double => value
                .as_f64()
                .map(CellValue::Float)
                .ok_or_else(|| mismatch("double", value)),
            Converter::Date => {
                let s = value.as_str().ok_or_else(|| mismatch("date", value))?;
                parse_date(s).map(CellValue::Timestamp)
            }
            Converter::Time => {
                let s = value.as_str().ok_or_else(|| mismatch("time", value))?;
                parse_time(s).map(CellValue::Timestamp)
            }
            Converter::Timestamp => {
                let s = value
                    .as_str()
                    .ok_or_else(|| mismatch("timestamp", value))?;
                parse_timestamp(s).map(CellValue::Timestamp)
            }
            Converter::Map => value
                .as_object()
                .map(|m| CellValue::Map(m.clone()))
                .ok_or_else(|| mismatch("map", value)),
            Converter::Array => value
                .as_array()
                .map(|a| CellValue::Array(a.clone()))
                .ok_or_else(|| mismatch("array", value)),
            Converter::Row { fields, converters } => {
                let elements = value.as_array().ok_or_else(|| mismatch("row", value))?;
                if elements.len() != fields.len() {
                    return Err(Error::Conversion(format!(
                        "row has {} elements, expected {}",
                        elements.len(),
                        fields.len()
                    )));
                }
                let mut row = IndexMap::with_capacity(fields.len());
                for ((field, converter), element) in
                    fields.iter().zip(converters.iter()).zip(elements.iter())
                {
                    if element.is_null() {
                        continue;
                    }
                    let converted = converter.convert(element).map_err(|e| {
                        Error::Conversion(format!("row field {:?}: {}", field, e))
                    })?;
                    if !converted.is_null() {
                        row.insert(field.clone(), converted);
                    }
                }
                Ok(CellValue::Row(row))
            }
        }
    }
}

fn mismatch(expected: &str, value: &JsonValue) -> Error {
    Error::Conversion(format!(
        "{} column cannot decode wire value {}",
        expected, value
    ))
}

fn zone_offset(zone: &str) -> Result<FixedOffset> {
    match zone {
        "UTC" | "UT" | "GMT" | "Z" => return Ok(FixedOffset::east_opt(0).unwrap()),
        _ => {}
    }
    let bytes = zone.as_bytes();
    if !bytes.is_empty() && (bytes[0] == b'+' || bytes[0] == b'-') {
        let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
        if digits.len() == 4 {
            if let (Ok(hours), Ok(minutes)) =
                (digits[..2].parse::<i32>(), digits[2..].parse::<i32>())
            {
                let secs = (hours * 3600 + minutes * 60) * if bytes[0] == b'-' { -1 } else { 1 };
                if let Some(offset) = FixedOffset::east_opt(secs) {
                    return Ok(offset);
                }
            }
        }
    }
    Err(Error::Conversion(format!("unsupported time zone: {}", zone)))
}

/// Split a trailing zone token off a temporal string. The token qualifies
/// when it starts with a letter or a sign, which excludes the time-of-day
/// field itself.
fn split_zone(s: &str) -> (&str, Option<&str>) {
    if let Some((rest, last)) = s.rsplit_once(' ') {
        if last
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '+' || c == '-')
        {
            return (rest, Some(last));
        }
    }
    (s, None)
}

fn with_zone(naive: NaiveDateTime, zone: Option<&str>) -> Result<DateTime<Utc>> {
    let offset = match zone {
        Some(z) => zone_offset(z)?,
        None => FixedOffset::east_opt(0).unwrap(),
    };
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Conversion(format!("ambiguous local time: {}", naive)))
}

pub(crate) fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Conversion(format!("invalid date {:?}: {}", s, e)))?;
    match Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap()) {
        LocalResult::Single(dt) => Ok(dt),
        _ => Err(Error::Conversion(format!("invalid date {:?}", s))),
    }
}

pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    let (hms, zone) = split_zone(s);
    let time = NaiveTime::parse_from_str(hms, "%H:%M:%S%.f")
        .map_err(|e| Error::Conversion(format!("invalid time {:?}: {}", s, e)))?;
    // times are carried on year 0, day 1
    let date = NaiveDate::from_ymd_opt(0, 1, 1).unwrap();
    with_zone(date.and_time(time), zone)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let (stamp, zone) = split_zone(s);
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| Error::Conversion(format!("invalid timestamp {:?}: {}", s, e)))?;
    with_zone(naive, zone)
}

/// Parse any temporal wire layout; the slice scanners accept all of them.
pub(crate) fn parse_temporal(s: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(s)
        .or_else(|_| parse_date(s))
        .or_else(|_| parse_time(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_scalar_conversion_samples() {
        let cases: Vec<(&str, JsonValue, CellValue)> = vec![
            ("boolean", serde_json::json!(true), CellValue::Bool(true)),
            (
                "varchar(1)",
                serde_json::json!("hello"),
                CellValue::String("hello".to_string()),
            ),
            ("bigint", serde_json::json!(1.0), CellValue::Int(1)),
            ("double", serde_json::json!(1.0), CellValue::Float(1.0)),
            (
                "date",
                serde_json::json!("2017-07-10"),
                CellValue::Timestamp(utc(2017, 7, 10, 0, 0, 0)),
            ),
            (
                "time",
                serde_json::json!("01:02:03.000"),
                CellValue::Timestamp(utc(0, 1, 1, 1, 2, 3)),
            ),
            (
                "time with time zone",
                serde_json::json!("01:02:03.000 UTC"),
                CellValue::Timestamp(utc(0, 1, 1, 1, 2, 3)),
            ),
            (
                "timestamp",
                serde_json::json!("2017-07-10 01:02:03.000"),
                CellValue::Timestamp(utc(2017, 7, 10, 1, 2, 3)),
            ),
            (
                "timestamp with time zone",
                serde_json::json!("2017-07-10 01:02:03.000 UTC"),
                CellValue::Timestamp(utc(2017, 7, 10, 1, 2, 3)),
            ),
        ];
        for (type_name, sample, expected) in cases {
            let converter = Converter::scalar_for(type_name);
            // null always converts cleanly
            assert_eq!(
                converter.convert(&JsonValue::Null).unwrap(),
                CellValue::Null,
                "{}",
                type_name
            );
            // bogus wire data errors
            assert!(
                converter.convert(&serde_json::json!([{"bogus": 1}])).is_err(),
                "{}",
                type_name
            );
            assert_eq!(converter.convert(&sample).unwrap(), expected, "{}", type_name);
        }
    }

    #[test]
    fn test_map_and_array_pass_through() {
        let map = Converter::scalar_for("map");
        assert_eq!(map.convert(&JsonValue::Null).unwrap(), CellValue::Null);
        let value = serde_json::json!({"hello": "world"});
        match map.convert(&value).unwrap() {
            CellValue::Map(m) => assert_eq!(m.get("hello"), Some(&serde_json::json!("world"))),
            other => panic!("unexpected {:?}", other),
        }
        assert!(map.convert(&serde_json::json!([1])).is_err());

        let array = Converter::scalar_for("array");
        assert_eq!(array.convert(&JsonValue::Null).unwrap(), CellValue::Null);
        match array.convert(&serde_json::json!([1, 2])).unwrap() {
            CellValue::Array(a) => assert_eq!(a.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(array.convert(&serde_json::json!("nope")).is_err());
    }

    #[test]
    fn test_bigint_truncates_wire_double() {
        let converter = Converter::scalar_for("bigint");
        assert_eq!(
            converter.convert(&serde_json::json!(1.9)).unwrap(),
            CellValue::Int(1)
        );
    }

    #[test]
    fn test_timestamp_fixed_offset_normalized_to_utc() {
        let converter = Converter::scalar_for("timestamp with time zone");
        let cell = converter
            .convert(&serde_json::json!("2017-07-10 01:02:03.000 +02:00"))
            .unwrap();
        assert_eq!(cell, CellValue::Timestamp(utc(2017, 7, 9, 23, 2, 3)));
    }

    #[test]
    fn test_named_zone_other_than_utc_errors() {
        let converter = Converter::scalar_for("timestamp with time zone");
        assert!(converter
            .convert(&serde_json::json!("2017-07-10 01:02:03.000 America/New_York"))
            .is_err());
    }

    fn row_signature() -> TypeSignature {
        serde_json::from_str(
            r#"{
                "rawType": "row",
                "typeArguments": [
                    {"rawType": "varchar"},
                    {"rawType": "bigint"},
                    {"rawType": "row",
                     "typeArguments": [{"rawType": "boolean"}],
                     "literalArguments": ["flag"]}
                ],
                "literalArguments": ["name", "age", "extra"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_row_conversion() {
        let converter = Converter::new(&row_signature()).unwrap();
        let cell = converter
            .convert(&serde_json::json!(["bob", 42, [true]]))
            .unwrap();
        let CellValue::Row(row) = cell else {
            panic!("expected row");
        };
        assert_eq!(row.get("name"), Some(&CellValue::String("bob".to_string())));
        assert_eq!(row.get("age"), Some(&CellValue::Int(42)));
        let CellValue::Row(extra) = row.get("extra").unwrap() else {
            panic!("expected nested row");
        };
        assert_eq!(extra.get("flag"), Some(&CellValue::Bool(true)));
    }

    #[test]
    fn test_row_conversion_skips_null_fields() {
        let converter = Converter::new(&row_signature()).unwrap();
        let cell = converter
            .convert(&serde_json::json!(["bob", null, null]))
            .unwrap();
        let CellValue::Row(row) = cell else {
            panic!("expected row");
        };
        assert!(row.contains_key("name"));
        assert!(!row.contains_key("age"));
        assert!(!row.contains_key("extra"));
    }

    #[test]
    fn test_row_conversion_wrong_arity_errors() {
        let converter = Converter::new(&row_signature()).unwrap();
        assert!(converter.convert(&serde_json::json!(["bob"])).is_err());
        assert!(converter.convert(&serde_json::json!("bob")).is_err());
    }

    #[test]
    fn test_row_signature_invariants() {
        let sig: TypeSignature = serde_json::from_str(
            r#"{"rawType": "row", "typeArguments": [{"rawType": "varchar"}], "literalArguments": []}"#,
        )
        .unwrap();
        assert!(Converter::new(&sig).is_err());

        let sig: TypeSignature = serde_json::from_str(
            r#"{"rawType": "row", "typeArguments": [{"rawType": "varchar"}], "literalArguments": [7]}"#,
        )
        .unwrap();
        assert!(Converter::new(&sig).is_err());
    }

    #[test]
    fn test_null_never_invokes_subconverters() {
        let converter = Converter::new(&row_signature()).unwrap();
        assert_eq!(converter.convert(&JsonValue::Null).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_parse_temporal_accepts_all_layouts() {
        assert!(parse_temporal("2017-07-01").is_ok());
        assert!(parse_temporal("01:02:03.000").is_ok());
        assert!(parse_temporal("2017-07-10 01:02:03.000 UTC").is_ok());
        assert!(parse_temporal("bogus").is_err());
    }
}
