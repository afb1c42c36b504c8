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

//! Type definitions for the Presto client.
//!
//! This module contains data structures organized by domain:
//! - `wire`: statement protocol request/response envelopes
//! - `convert`: per-column converters from wire JSON to typed cells
//! - `scan`: nullable slice scanners for `array` columns

pub mod convert;
pub mod scan;
pub mod wire;

pub use convert::{CellValue, Converter};
pub use scan::{
    NullSlice2Bool, NullSlice2Float64, NullSlice2Int64, NullSlice2Map, NullSlice2String,
    NullSlice2Time, NullSlice3Bool, NullSlice3Float64, NullSlice3Int64, NullSlice3Map,
    NullSlice3String, NullSlice3Time, NullSliceBool, NullSliceFloat64, NullSliceInt64,
    NullSliceMap, NullSliceString, NullSliceTime, Scanner,
};
pub use wire::TypeSignature;
