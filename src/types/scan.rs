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

//! Nullable slice scanners for `array` columns.
//!
//! `array` cells pass through conversion as raw JSON sequences; these
//! scanners decode them into typed slices at 1, 2 and 3 dimensions.
//! Scanning a null cell leaves `valid` false; null elements become `None`;
//! a malformed element fails the whole scan.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::convert::parse_temporal;

/// Decodes one raw cell into caller storage, in the manner of a database
/// scanner: `scan` replaces the previous contents.
pub trait Scanner {
    /// Decode `value` into `self`.
    fn scan(&mut self, value: &JsonValue) -> Result<()>;
}

fn elem_bool(value: &JsonValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::Conversion(format!("expected boolean element, got {}", value)))
}

fn elem_string(value: &JsonValue) -> Result<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Conversion(format!("expected string element, got {}", value)))
}

fn elem_int64(value: &JsonValue) -> Result<i64> {
    if let Some(i) = value.as_i64() {
        Ok(i)
    } else if let Some(f) = value.as_f64() {
        Ok(f as i64)
    } else {
        Err(Error::Conversion(format!(
            "expected numeric element, got {}",
            value
        )))
    }
}

fn elem_float64(value: &JsonValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Error::Conversion(format!("expected numeric element, got {}", value)))
}

fn elem_time(value: &JsonValue) -> Result<DateTime<Utc>> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Conversion(format!("expected temporal element, got {}", value)))?;
    parse_temporal(s)
}

fn elem_map(value: &JsonValue) -> Result<serde_json::Map<String, JsonValue>> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| Error::Conversion(format!("expected map element, got {}", value)))
}

/// Decode a non-null sequence, mapping null elements to `None`.
fn scan_vec<T>(
    value: &JsonValue,
    elem: &dyn Fn(&JsonValue) -> Result<T>,
) -> Result<Vec<Option<T>>> {
    let array = value
        .as_array()
        .ok_or_else(|| Error::Conversion(format!("expected array, got {}", value)))?;
    array
        .iter()
        .map(|v| {
            if v.is_null() {
                Ok(None)
            } else {
                elem(v).map(Some)
            }
        })
        .collect()
}

macro_rules! null_slice_scanners {
    ($what:literal, $ty:ty, $elem:path, $name1:ident, $name2:ident, $name3:ident) => {
        #[doc = concat!("Nullable scanner for a 1-dimensional array of ", $what, " values.")]
        #[derive(Debug, Clone, Default)]
        pub struct $name1 {
            /// Decoded elements; `None` marks a null element.
            pub slice: Vec<Option<$ty>>,
            /// False when the scanned cell was null.
            pub valid: bool,
        }

        impl Scanner for $name1 {
            fn scan(&mut self, value: &JsonValue) -> Result<()> {
                if value.is_null() {
                    self.slice = Vec::new();
                    self.valid = false;
                    return Ok(());
                }
                self.slice = scan_vec(value, &$elem)?;
                self.valid = true;
                Ok(())
            }
        }

        #[doc = concat!("Nullable scanner for a 2-dimensional array of ", $what, " values.")]
        #[derive(Debug, Clone, Default)]
        pub struct $name2 {
            /// Decoded elements; `None` marks a null element.
            pub slice: Vec<Option<Vec<Option<$ty>>>>,
            /// False when the scanned cell was null.
            pub valid: bool,
        }

        impl Scanner for $name2 {
            fn scan(&mut self, value: &JsonValue) -> Result<()> {
                if value.is_null() {
                    self.slice = Vec::new();
                    self.valid = false;
                    return Ok(());
                }
                self.slice = scan_vec(value, &|v| scan_vec(v, &$elem))?;
                self.valid = true;
                Ok(())
            }
        }

        #[doc = concat!("Nullable scanner for a 3-dimensional array of ", $what, " values.")]
        #[derive(Debug, Clone, Default)]
        pub struct $name3 {
            /// Decoded elements; `None` marks a null element.
            pub slice: Vec<Option<Vec<Option<Vec<Option<$ty>>>>>>,
            /// False when the scanned cell was null.
            pub valid: bool,
        }

        impl Scanner for $name3 {
            fn scan(&mut self, value: &JsonValue) -> Result<()> {
                if value.is_null() {
                    self.slice = Vec::new();
                    self.valid = false;
                    return Ok(());
                }
                self.slice = scan_vec(value, &|v| scan_vec(v, &|v| scan_vec(v, &$elem)))?;
                self.valid = true;
                Ok(())
            }
        }
    };
}

null_slice_scanners!("boolean", bool, elem_bool, NullSliceBool, NullSlice2Bool, NullSlice3Bool);
null_slice_scanners!(
    "string",
    String,
    elem_string,
    NullSliceString,
    NullSlice2String,
    NullSlice3String
);
null_slice_scanners!("64-bit integer", i64, elem_int64, NullSliceInt64, NullSlice2Int64, NullSlice3Int64);
null_slice_scanners!(
    "64-bit float",
    f64,
    elem_float64,
    NullSliceFloat64,
    NullSlice2Float64,
    NullSlice3Float64
);
null_slice_scanners!(
    "timestamp",
    DateTime<Utc>,
    elem_time,
    NullSliceTime,
    NullSlice2Time,
    NullSlice3Time
);
null_slice_scanners!(
    "map",
    serde_json::Map<String, JsonValue>,
    elem_map,
    NullSliceMap,
    NullSlice2Map,
    NullSlice3Map
);
