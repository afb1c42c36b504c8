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

//! Error types for the Presto client
//!
//! This module defines all error types that can occur during Presto
//! operations, from DSN parsing to protocol failures reported by the
//! coordinator.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error name synthesized when the coordinator stays unreachable after all
/// retry attempts.
pub const PRESTO_UNAVAILABLE: &str = "PRESTO_UNAVAILABLE";

/// Error name synthesized when a response body cannot be decoded.
pub const PRESTO_BAD_RESPONSE: &str = "PRESTO_BAD_RESPONSE";

/// Error name the coordinator reports for a query cancelled server-side.
pub(crate) const USER_CANCELLED: &str = "USER_CANCELLED";

/// Main error type for the Presto client
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Query Errors
    // =========================================================================
    /// The coordinator reported the query as failed
    #[error("presto: query failed ({}): {}", .0.error_name, .0.message())]
    QueryFailed(QueryFailure),

    /// The query was cancelled, either by the caller or by the server
    #[error("presto: query cancelled")]
    QueryCancelled,

    /// The per-statement deadline expired before the query finished
    #[error("presto: deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    // =========================================================================
    // Parameter Errors
    // =========================================================================
    /// A query parameter cannot be serialized to a Presto literal
    #[error("presto: unsupported arg type: {0}")]
    UnsupportedArg(String),

    /// Placeholder/parameter mismatch in the SQL text
    #[error("presto: {0}")]
    Params(String),

    // =========================================================================
    // Driver Surface Errors
    // =========================================================================
    /// The connection or transaction is no longer usable
    #[error("presto: bad connection")]
    BadConnection,

    /// Operation the driver does not surface (e.g. Exec)
    #[error("presto: operation not supported: {0}")]
    NotSupported(&'static str),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Malformed or unacceptable connection string
    #[error("presto: invalid connection string: {0}")]
    InvalidDsn(String),

    /// `custom_client` names an HTTP client that was never registered
    #[error("presto: custom client not registered: {0}")]
    ClientNotRegistered(String),

    /// A client name that cannot be registered
    #[error("presto: custom client name {0:?} is reserved")]
    ReservedClientName(String),

    /// Connection-level configuration problem
    #[error("presto: {0}")]
    Config(String),

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// A wire value did not match the column type
    #[error("presto: {0}")]
    Conversion(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Underlying HTTP transport error
    #[error("presto: http transport: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Check if this error is the cancellation sentinel.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::QueryCancelled)
    }

    /// Check if this error is a deadline expiry.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Error::DeadlineExceeded(_))
    }

    /// Create a query failure from a synthesized error name and message.
    pub(crate) fn query_failed(name: &str, message: impl Into<String>) -> Self {
        Error::QueryFailed(QueryFailure {
            error_name: name.to_string(),
            error_code: 0,
            error_type: String::new(),
            failure_kind: None,
            failure_message: Some(message.into()),
            stack: Vec::new(),
        })
    }
}

/// Detail of a query the coordinator reported as failed.
///
/// Mirrors the wire `error` envelope: stable `errorName`/`errorCode`/
/// `errorType` plus the nested failure message and stack when present.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    /// Stable error name, e.g. `SYNTAX_ERROR`
    pub error_name: String,
    /// Numeric error code
    pub error_code: i64,
    /// Error category, e.g. `USER_ERROR`
    pub error_type: String,
    /// Server-side exception class from the nested failure info
    pub failure_kind: Option<String>,
    /// Human-readable message from the nested failure info
    pub failure_message: Option<String>,
    /// Server-side stack from the nested failure info
    pub stack: Vec<String>,
}

impl QueryFailure {
    /// The failure message, or the error name when the server sent none.
    pub fn message(&self) -> &str {
        self.failure_message.as_deref().unwrap_or(&self.error_name)
    }
}
