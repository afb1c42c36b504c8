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

//! Connection: per-session state and the query entry points.
//!
//! A connection is logical: constructing one performs no network I/O. It
//! owns the session-property map and transaction state shared with every
//! statement it runs, plus the HTTP client resolved from the custom-client
//! registry (or built fresh) at connect time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{self, PrestoHttpClient, RetryPolicy};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::params::{interpolate, Value};
use crate::rows::Rows;
use crate::statement::StatementDriver;
use crate::transaction::TransactionState;

/// Timeout applied to `ping`.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Session state mutated by server response headers.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    /// Session properties in insertion order, keys unique.
    pub properties: IndexMap<String, String>,
    /// Transaction header state.
    pub transaction: TransactionState,
}

/// Per-query options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Per-query `X-Presto-User` override; not a SQL parameter.
    pub user: Option<String>,
    /// Overrides the connection's default statement timeout.
    pub timeout: Option<Duration>,
    /// Extra protocol headers sent on every request of the statement.
    /// Names must start with `X-Presto-`; a name matching a standard
    /// header overrides it for this statement only.
    pub headers: Vec<(String, String)>,
}

impl QueryOptions {
    /// Options with a per-query user override.
    pub fn with_user(user: impl Into<String>) -> Self {
        QueryOptions {
            user: Some(user.into()),
            ..QueryOptions::default()
        }
    }

    /// Options with a per-query timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        QueryOptions {
            timeout: Some(timeout),
            ..QueryOptions::default()
        }
    }

    /// Add an extra `X-Presto-*` header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A logical connection to a Presto coordinator.
#[derive(Debug)]
pub struct Connection {
    config: Arc<Config>,
    http: PrestoHttpClient,
    session: Arc<Mutex<SessionState>>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

impl Connection {
    /// Open a logical connection from a configuration. Validates the
    /// configuration and resolves the HTTP client; no network I/O happens
    /// here.
    pub fn connect(config: Config) -> Result<Connection> {
        config.validate()?;
        let client = match config.custom_client {
            Some(ref name) => client::custom_client(name)
                .ok_or_else(|| Error::ClientNotRegistered(name.clone()))?,
            None => reqwest::Client::builder()
                .build()
                .map_err(Error::Http)?,
        };
        let session = SessionState {
            properties: config.session_properties.clone(),
            transaction: TransactionState::None,
        };
        debug!("opened connection to {}", config.uri);
        Ok(Connection {
            config: Arc::new(config),
            http: PrestoHttpClient::new(client, RetryPolicy::default()),
            session: Arc::new(Mutex::new(session)),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Open a logical connection from a DSN.
    pub fn open(dsn: &str) -> Result<Connection> {
        Connection::connect(Config::parse_dsn(dsn)?)
    }

    /// The connection configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a query with positional parameters substituted for `?`
    /// placeholders.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.query_opts(sql, params, QueryOptions::default()).await
    }

    /// Run a query with per-query options.
    pub async fn query_opts(
        &self,
        sql: &str,
        params: &[Value],
        options: QueryOptions,
    ) -> Result<Rows> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::BadConnection);
        }
        for (name, _) in &options.headers {
            if !name.starts_with("X-Presto-") {
                return Err(Error::Params(format!(
                    "header argument {:?} is not an X-Presto-* header",
                    name
                )));
            }
        }
        let sql = interpolate(sql, params)?;
        let driver = StatementDriver::new(
            self.http.clone(),
            self.config.clone(),
            self.session.clone(),
            options.user,
            options.headers,
            self.shutdown.child_token(),
            options.timeout.unwrap_or(self.config.query_timeout),
        );
        Rows::start(driver, &sql).await
    }

    /// DML execution is not surfaced by this driver; Presto's protocol
    /// reports no affected-row counts. Always fails.
    pub async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
        Err(Error::NotSupported("exec"))
    }

    /// Liveness check: `SELECT 1` with a small timeout.
    pub async fn ping(&self) -> Result<()> {
        let mut rows = self
            .query_opts("SELECT 1", &[], QueryOptions::with_timeout(PING_TIMEOUT))
            .await?;
        rows.drain().await
    }

    /// Cancel outstanding statements and make the connection unusable.
    /// Safe to call from any thread, repeatedly.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("closing connection to {}", self.config.uri);
            self.shutdown.cancel();
        }
    }

    /// True once `close` ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn session(&self) -> &Arc<Mutex<SessionState>> {
        &self.session
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
