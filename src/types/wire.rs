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

//! Statement protocol request/response types.
//!
//! These map directly to the JSON envelopes exchanged with the coordinator.
//! Field names are wire-stable; unknown fields (`stats`, `updateType`, ...)
//! are tolerated and ignored. The submission request itself has no JSON
//! envelope: the body is the raw SQL text.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Response envelope returned by `/v1/statement` and every `nextUri` poll.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StmtResponse {
    /// Query identifier assigned on the first response.
    pub id: String,
    pub info_uri: Option<String>,
    pub partial_cancel_uri: Option<String>,
    /// Absent when the query is terminal; otherwise must be polled.
    pub next_uri: Option<String>,
    pub columns: Vec<StmtColumn>,
    pub data: Vec<Vec<JsonValue>>,
    pub error: Option<StmtError>,
}

/// One column of the result set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StmtColumn {
    pub name: String,
    /// Rendered type text, e.g. `varchar(1)`.
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_signature: TypeSignature,
}

/// Recursive description of a column type.
///
/// For `row` signatures the literal arguments carry the field names and
/// their count equals the type-argument count.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeSignature {
    /// Raw type name, e.g. `varchar`, `array`, `row`.
    pub raw_type: String,
    /// Ordered type arguments, each itself a signature.
    pub type_arguments: Vec<TypeSignature>,
    /// Ordered literal arguments (strings or integers).
    pub literal_arguments: Vec<JsonValue>,
}

impl TypeSignature {
    /// Signature with just a raw type, for tests and fallbacks.
    pub fn scalar(raw_type: impl Into<String>) -> Self {
        TypeSignature {
            raw_type: raw_type.into(),
            type_arguments: Vec::new(),
            literal_arguments: Vec::new(),
        }
    }
}

/// Error envelope, present iff the query failed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StmtError {
    pub message: String,
    pub error_name: String,
    pub error_code: i64,
    pub error_type: String,
    pub failure_info: Option<FailureInfo>,
}

/// Nested failure detail with the server-side message and stack.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct FailureInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub stack: Vec<String>,
}
