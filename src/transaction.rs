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

//! Transaction control over the statement protocol.
//!
//! Presto transactions ride on three headers: `START TRANSACTION` is
//! submitted with the literal `NONE` transaction id, the coordinator hands
//! back the real id in `X-Presto-Started-Transaction-Id`, every request in
//! the transaction then carries that id, and `COMMIT`/`ROLLBACK` end it via
//! `X-Presto-Clear-Transaction-Id` on their response.

use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::params::Value;
use crate::rows::Rows;

/// Transaction header state of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum TransactionState {
    /// No transaction: header absent.
    #[default]
    None,
    /// `START TRANSACTION` in flight: header literal `NONE`.
    Starting,
    /// Active transaction: header carries the id.
    Active(String),
}

/// Isolation levels Presto accepts. Anything else fails before any network
/// call, which the type rules out here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// `READ UNCOMMITTED`
    ReadUncommitted,
    /// `READ COMMITTED`
    ReadCommitted,
    /// `REPEATABLE READ`
    RepeatableRead,
    /// `SERIALIZABLE`
    Serializable,
}

impl IsolationLevel {
    /// Token rendered into the `ISOLATION LEVEL` modifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "Read Uncommitted",
            IsolationLevel::ReadCommitted => "Read Committed",
            IsolationLevel::RepeatableRead => "Repeatable Read",
            IsolationLevel::Serializable => "Serializable",
        }
    }
}

/// Options for `Connection::begin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxOptions {
    /// Start the transaction `READ ONLY` instead of `READ WRITE`.
    pub read_only: bool,
    /// Isolation level modifier; omitted when `None`.
    pub isolation: Option<IsolationLevel>,
}

fn start_transaction_sql(options: &TxOptions) -> String {
    let mut modifiers = vec![if options.read_only {
        "READ ONLY".to_string()
    } else {
        "READ WRITE".to_string()
    }];
    if let Some(isolation) = options.isolation {
        modifiers.push(format!("ISOLATION LEVEL {}", isolation.as_str()));
    }
    format!("START TRANSACTION {}", modifiers.join(", "))
}

impl Connection {
    /// Begin a transaction. Runs `START TRANSACTION` to completion and
    /// captures the server-assigned transaction id from the response
    /// headers.
    pub async fn begin(&self, options: TxOptions) -> Result<Transaction<'_>> {
        {
            let mut session = self.session().lock().expect("session state poisoned");
            if session.transaction != TransactionState::None {
                return Err(Error::Config("a transaction is already active".to_string()));
            }
            session.transaction = TransactionState::Starting;
        }
        let sql = start_transaction_sql(&options);
        debug!("beginning transaction: {}", sql);
        match self.run_to_completion(&sql).await {
            Ok(()) => Ok(Transaction {
                conn: self,
                done: false,
            }),
            Err(e) => {
                let mut session = self.session().lock().expect("session state poisoned");
                session.transaction = TransactionState::None;
                Err(e)
            }
        }
    }

    async fn run_to_completion(&self, sql: &str) -> Result<()> {
        let mut rows = self.query(sql, &[]).await?;
        rows.drain().await
    }
}

/// An active transaction. Single-use: after `commit` or `rollback`
/// succeeds, further calls return the bad-connection sentinel.
#[derive(Debug)]
pub struct Transaction<'a> {
    conn: &'a Connection,
    done: bool,
}

impl Transaction<'_> {
    /// Run a query inside the transaction.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        if self.done {
            return Err(Error::BadConnection);
        }
        self.conn.query(sql, params).await
    }

    /// Commit the transaction.
    pub async fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT").await
    }

    /// Roll the transaction back.
    pub async fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, sql: &str) -> Result<()> {
        if self.done {
            return Err(Error::BadConnection);
        }
        self.conn.run_to_completion(sql).await?;
        self.done = true;
        Ok(())
    }
}
