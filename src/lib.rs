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

#![warn(missing_docs)]

//! # presto-client
//!
//! A client for the Presto (PrestoDB) HTTP query protocol, exposed through
//! a relational-database driver surface: open a connection from a DSN,
//! submit SQL with optional parameters, and stream rows back from the
//! coordinator.
//!
//! The driver is read-biased: it supports `SELECT`, `SHOW` and
//! transactional control (`START TRANSACTION`, `COMMIT`, `ROLLBACK`), but
//! does not report affected-row counts for DML.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use presto_client::Connection;
//!
//! #[tokio::main]
//! async fn main() -> presto_client::Result<()> {
//!     let conn = Connection::open("http://user@localhost:8080?catalog=hive&schema=web")?;
//!
//!     let mut rows = conn.query("SELECT id, name FROM users WHERE id = ?", &[1i64.into()]).await?;
//!     for column in rows.columns() {
//!         println!("{} ({})", column.name(), column.type_name());
//!     }
//!     while let Some(row) = rows.next().await {
//!         let row = row?;
//!         let id = row.get(0)?.as_i64().unwrap_or(0);
//!         let name = row.get(1)?;
//!         println!("{}: {:?}", id, name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Parameters
//!
//! Positional parameters are serialized into SQL literals and substituted
//! for `?` placeholders in order. The substitution does not parse the SQL,
//! so a bare `?` inside a string literal is replaced too; escape such
//! queries or inline the literal yourself. Floating-point parameters are
//! rejected; pass a [`Numeric`] string for decimal literals.
//!
//! ## Transactions
//!
//! ```rust,no_run
//! use presto_client::{Connection, IsolationLevel, TxOptions};
//!
//! # async fn example(conn: Connection) -> presto_client::Result<()> {
//! let mut tx = conn
//!     .begin(TxOptions { read_only: true, isolation: Some(IsolationLevel::ReadUncommitted) })
//!     .await?;
//! let rows = tx.query("SELECT * FROM accounts", &[]).await?;
//! # drop(rows);
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Typed arrays
//!
//! `array` cells pass through as raw JSON; scan them into typed slices with
//! the nullable slice scanners:
//!
//! ```rust,no_run
//! use presto_client::{NullSliceInt64, Row};
//!
//! # fn example(row: Row) -> presto_client::Result<()> {
//! let mut xs = NullSliceInt64::default();
//! row.scan(0, &mut xs)?;
//! if xs.valid {
//!     println!("{:?}", xs.slice);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom HTTP clients
//!
//! The DSN `custom_client` parameter selects a `reqwest::Client` from the
//! process-wide registry, for TLS material, proxies, or a Kerberos/SPNEGO
//! transport:
//!
//! ```rust,no_run
//! presto_client::register_custom_client("mtls", reqwest::Client::new())?;
//! let conn = presto_client::Connection::open("https://user@presto:8443?custom_client=mtls")?;
//! # Ok::<(), presto_client::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod params;
pub mod rows;
pub mod statement;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use client::{deregister_custom_client, register_custom_client, RetryPolicy};
pub use config::{Config, KerberosConfig, DEFAULT_SOURCE};
pub use connection::{Connection, QueryOptions};
pub use error::{Error, QueryFailure, Result, PRESTO_BAD_RESPONSE, PRESTO_UNAVAILABLE};
pub use logging::{init_logging, LogConfig};
pub use params::{Numeric, Value};
pub use rows::{Column, Row, Rows};
pub use transaction::{IsolationLevel, Transaction, TxOptions};
pub use types::convert::CellValue;
pub use types::scan::{
    NullSlice2Bool, NullSlice2Float64, NullSlice2Int64, NullSlice2Map, NullSlice2String,
    NullSlice2Time, NullSlice3Bool, NullSlice3Float64, NullSlice3Int64, NullSlice3Map,
    NullSlice3String, NullSlice3Time, NullSliceBool, NullSliceFloat64, NullSliceInt64,
    NullSliceMap, NullSliceString, NullSliceTime, Scanner,
};
pub use types::TypeSignature;

// Re-export serde_json for users working with raw cells and map columns
pub use serde_json;
