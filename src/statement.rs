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

//! The statement driver: the long-poll state machine that carries one SQL
//! statement from submission to a terminal state.
//!
//! A statement starts with a `POST` of the SQL text to `/v1/statement`,
//! then follows the server-supplied `nextUri` with `GET`s until the
//! response carries none. Each hop may deliver column metadata (the first
//! non-empty set wins and is frozen), a page of rows, session mutations in
//! response headers, or a terminal error envelope.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value as JsonValue;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::PrestoHttpClient;
use crate::config::Config;
use crate::connection::SessionState;
use crate::error::{Error, Result, PRESTO_BAD_RESPONSE, USER_CANCELLED};
use crate::rows::Column;
use crate::transaction::TransactionState;
use crate::types::wire::{StmtError, StmtResponse};

pub(crate) const HEADER_USER: &str = "X-Presto-User";
pub(crate) const HEADER_SOURCE: &str = "X-Presto-Source";
pub(crate) const HEADER_CATALOG: &str = "X-Presto-Catalog";
pub(crate) const HEADER_SCHEMA: &str = "X-Presto-Schema";
pub(crate) const HEADER_SESSION: &str = "X-Presto-Session";
pub(crate) const HEADER_TRANSACTION: &str = "X-Presto-Transaction-Id";
pub(crate) const HEADER_STARTED_TRANSACTION: &str = "X-Presto-Started-Transaction-Id";
pub(crate) const HEADER_CLEAR_TRANSACTION: &str = "X-Presto-Clear-Transaction-Id";
pub(crate) const HEADER_SET_SESSION: &str = "X-Presto-Set-Session";
pub(crate) const HEADER_CLEAR_SESSION: &str = "X-Presto-Clear-Session";

/// Drives one statement through the protocol.
#[derive(Debug)]
pub(crate) struct StatementDriver {
    http: PrestoHttpClient,
    config: Arc<Config>,
    session: Arc<Mutex<SessionState>>,
    user_override: Option<String>,
    extra_headers: Vec<(String, String)>,
    cancel: CancellationToken,
    deadline: Instant,
    timeout: Duration,
    cancel_timeout: Duration,

    query_id: Option<String>,
    info_uri: Option<String>,
    next_uri: Option<String>,
    partial_cancel_uri: Option<String>,
    columns: Option<Arc<Vec<Column>>>,
    finished: bool,
}

impl StatementDriver {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        http: PrestoHttpClient,
        config: Arc<Config>,
        session: Arc<Mutex<SessionState>>,
        user_override: Option<String>,
        extra_headers: Vec<(String, String)>,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> Self {
        let cancel_timeout = config.cancel_timeout;
        Self {
            http,
            config,
            session,
            user_override,
            extra_headers,
            cancel,
            deadline: Instant::now() + timeout,
            timeout,
            cancel_timeout,
            query_id: None,
            info_uri: None,
            next_uri: None,
            partial_cancel_uri: None,
            columns: None,
            finished: false,
        }
    }

    /// Submit the SQL text and process the first response.
    pub(crate) async fn submit(&mut self, sql: &str) -> Result<Vec<Vec<JsonValue>>> {
        let url = self.config.statement_url();
        debug!("submitting statement to {}", url);
        self.round_trip(Method::POST, url, Some(sql.to_string()))
            .await
    }

    /// Poll the current `nextUri` once. `None` means the statement already
    /// reached a terminal state.
    pub(crate) async fn poll(&mut self) -> Result<Option<Vec<Vec<JsonValue>>>> {
        let Some(uri) = self.next_uri.clone() else {
            return Ok(None);
        };
        debug!("polling {}", uri);
        let page = self.round_trip(Method::GET, uri, None).await?;
        Ok(Some(page))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn columns(&self) -> Option<Arc<Vec<Column>>> {
        self.columns.clone()
    }

    pub(crate) fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    pub(crate) fn info_uri(&self) -> Option<&str> {
        self.info_uri.as_deref()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    async fn round_trip(
        &mut self,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> Result<Vec<Vec<JsonValue>>> {
        let outcome = {
            let build = || {
                let mut rb = self.http.inner().request(method.clone(), &url);
                rb = self.apply_headers(rb);
                if let Some(ref body) = body {
                    rb = rb.body(body.clone());
                }
                rb
            };
            tokio::time::timeout_at(self.deadline, self.http.execute(build, &self.cancel)).await
        };

        match outcome {
            Err(_elapsed) => {
                self.finished = true;
                self.cancel_remote().await;
                Err(Error::DeadlineExceeded(self.timeout))
            }
            Ok(Err(e)) if e.is_cancelled() => {
                self.finished = true;
                self.cancel_remote().await;
                Err(e)
            }
            Ok(Err(e)) => {
                self.finished = true;
                Err(e)
            }
            Ok(Ok(response)) => {
                self.apply_response_headers(response.headers());
                let bytes = response.bytes().await?;
                let decoded: StmtResponse = serde_json::from_slice(&bytes).map_err(|e| {
                    self.finished = true;
                    Error::query_failed(
                        PRESTO_BAD_RESPONSE,
                        format!("decoding statement response: {}", e),
                    )
                })?;
                self.absorb(decoded)
            }
        }
    }

    /// Fold one decoded response into the driver state and hand back its
    /// data page.
    fn absorb(&mut self, response: StmtResponse) -> Result<Vec<Vec<JsonValue>>> {
        if let Some(ref error) = response.error {
            if !error.error_name.is_empty() {
                self.next_uri = None;
                self.finished = true;
                return Err(stmt_error_to_error(error));
            }
        }
        if self.query_id.is_none() && !response.id.is_empty() {
            self.query_id = Some(response.id.clone());
        }
        if response.info_uri.is_some() {
            self.info_uri = response.info_uri.clone();
        }
        if response.partial_cancel_uri.is_some() {
            self.partial_cancel_uri = response.partial_cancel_uri.clone();
        }
        if self.columns.is_none() && !response.columns.is_empty() {
            let columns = response
                .columns
                .iter()
                .map(Column::from_wire)
                .collect::<Result<Vec<_>>>()?;
            self.columns = Some(Arc::new(columns));
        }
        self.next_uri = response.next_uri;
        if self.next_uri.is_none() {
            self.finished = true;
        }
        Ok(response.data)
    }

    /// Attach the protocol headers reflecting the current session state.
    /// Extra per-query headers override the standard set by name.
    fn apply_headers(&self, mut rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut headers: Vec<(&str, String)> = Vec::new();
        let user = self
            .user_override
            .as_deref()
            .unwrap_or(&self.config.user);
        if !user.is_empty() {
            headers.push((HEADER_USER, user.to_string()));
        }
        if !self.config.source.is_empty() {
            headers.push((HEADER_SOURCE, self.config.source.clone()));
        }
        if let Some(ref catalog) = self.config.catalog {
            headers.push((HEADER_CATALOG, catalog.clone()));
        }
        if let Some(ref schema) = self.config.schema {
            headers.push((HEADER_SCHEMA, schema.clone()));
        }

        let session = self.session.lock().expect("session state poisoned");
        if !session.properties.is_empty() {
            let joined = session
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",");
            headers.push((HEADER_SESSION, joined));
        }
        match session.transaction {
            TransactionState::None => {}
            TransactionState::Starting => {
                headers.push((HEADER_TRANSACTION, "NONE".to_string()));
            }
            TransactionState::Active(ref id) => {
                headers.push((HEADER_TRANSACTION, id.clone()));
            }
        }
        drop(session);

        for (name, value) in &self.extra_headers {
            match headers
                .iter_mut()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
            {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name.as_str(), value.clone())),
            }
        }

        for (name, value) in headers {
            rb = rb.header(name, value);
        }
        if let Some(ref password) = self.config.password {
            rb = rb.basic_auth(&self.config.user, Some(password));
        }
        rb
    }

    /// Apply server-directed session mutations. Clears run before sets so a
    /// cleared key re-set in the same response survives.
    fn apply_response_headers(&mut self, headers: &HeaderMap) {
        let mut session = self.session.lock().expect("session state poisoned");
        for value in headers.get_all(HEADER_CLEAR_SESSION) {
            if let Ok(name) = value.to_str() {
                session.properties.shift_remove(name.trim());
            }
        }
        for value in headers.get_all(HEADER_SET_SESSION) {
            if let Ok(pair) = value.to_str() {
                if let Some((k, v)) = pair.split_once('=') {
                    session
                        .properties
                        .insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
        if let Some(id) = headers
            .get(HEADER_STARTED_TRANSACTION)
            .and_then(|v| v.to_str().ok())
        {
            if !id.is_empty() && id != "NONE" {
                session.transaction = TransactionState::Active(id.to_string());
            }
        }
        if headers.get(HEADER_CLEAR_TRANSACTION).is_some() {
            session.transaction = TransactionState::None;
        }
    }

    /// Best-effort `DELETE` of the running query, bounded by the cancel
    /// timeout. Failures are logged, never surfaced.
    pub(crate) async fn cancel_remote(&self) {
        let Some(url) = self
            .partial_cancel_uri
            .clone()
            .or_else(|| self.next_uri.clone())
        else {
            return;
        };
        debug!("cancelling query via DELETE {}", url);
        let rb = self.apply_headers(self.http.inner().delete(&url));
        match tokio::time::timeout(self.cancel_timeout, self.http.send_once(rb)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("cancel request failed: {}", e),
            Err(_) => debug!("cancel request timed out"),
        }
    }

    /// Detached variant of [`cancel_remote`] for drop paths, where no
    /// executor context may be awaited on.
    pub(crate) fn cancel_remote_task(&self) -> Option<impl std::future::Future<Output = ()>> {
        let url = self
            .partial_cancel_uri
            .clone()
            .or_else(|| self.next_uri.clone())?;
        let rb = self.apply_headers(self.http.inner().delete(&url));
        let http = self.http.clone();
        let timeout = self.cancel_timeout;
        Some(async move {
            let _ = tokio::time::timeout(timeout, http.send_once(rb)).await;
        })
    }
}

fn stmt_error_to_error(error: &StmtError) -> Error {
    if error.error_name == USER_CANCELLED {
        return Error::QueryCancelled;
    }
    let (failure_kind, failure_message, stack) = match error.failure_info {
        Some(ref info) => (
            Some(info.kind.clone()).filter(|k| !k.is_empty()),
            Some(info.message.clone()),
            info.stack.clone(),
        ),
        None => {
            if error.message.is_empty() {
                (None, None, Vec::new())
            } else {
                (None, Some(error.message.clone()), Vec::new())
            }
        }
    };
    Error::QueryFailed(crate::error::QueryFailure {
        error_name: error.error_name.clone(),
        error_code: error.error_code,
        error_type: error.error_type.clone(),
        failure_kind,
        failure_message,
        stack,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::wire::FailureInfo;

    fn driver() -> StatementDriver {
        let config = Arc::new(Config::new("http://localhost:8080", "tester"));
        StatementDriver::new(
            PrestoHttpClient::new(reqwest::Client::new(), Default::default()),
            config,
            Arc::new(Mutex::new(SessionState::default())),
            None,
            Vec::new(),
            CancellationToken::new(),
            Duration::from_secs(60),
        )
    }

    fn response(json: &str) -> StmtResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_absorb_captures_id_and_next_uri() {
        let mut d = driver();
        let page = d
            .absorb(response(
                r#"{"id": "q1", "nextUri": "http://localhost:8080/v1/statement/q1/1"}"#,
            ))
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(d.query_id(), Some("q1"));
        assert!(!d.is_finished());

        // terminal response with a data page
        let page = d
            .absorb(response(
                r#"{"id": "q1",
                    "columns": [{"name": "x", "type": "bigint",
                                 "typeSignature": {"rawType": "bigint"}}],
                    "data": [[1], [2]]}"#,
            ))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(d.is_finished());
        assert_eq!(d.columns().unwrap().len(), 1);
    }

    #[test]
    fn test_absorb_freezes_first_columns() {
        let mut d = driver();
        d.absorb(response(
            r#"{"id": "q1", "nextUri": "u",
                "columns": [{"name": "first", "type": "bigint",
                             "typeSignature": {"rawType": "bigint"}}]}"#,
        ))
        .unwrap();
        d.absorb(response(
            r#"{"id": "q1",
                "columns": [{"name": "second", "type": "bigint",
                             "typeSignature": {"rawType": "bigint"}}]}"#,
        ))
        .unwrap();
        assert_eq!(d.columns().unwrap()[0].name(), "first");
    }

    #[test]
    fn test_absorb_error_envelope_is_terminal() {
        let mut d = driver();
        let err = d
            .absorb(response(
                r#"{"id": "q1", "nextUri": "u",
                    "error": {"errorName": "SYNTAX_ERROR", "errorType": "USER_ERROR"}}"#,
            ))
            .unwrap_err();
        match err {
            Error::QueryFailed(f) => assert_eq!(f.error_name, "SYNTAX_ERROR"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(d.is_finished());
    }

    #[test]
    fn test_user_cancelled_maps_to_sentinel() {
        let error = StmtError {
            error_name: USER_CANCELLED.to_string(),
            ..Default::default()
        };
        assert!(stmt_error_to_error(&error).is_cancelled());
    }

    #[test]
    fn test_failure_info_carried() {
        let error = StmtError {
            error_name: "GENERIC_INTERNAL_ERROR".to_string(),
            error_code: 65536,
            error_type: "INTERNAL_ERROR".to_string(),
            failure_info: Some(FailureInfo {
                kind: "java.lang.RuntimeException".to_string(),
                message: "boom".to_string(),
                stack: vec!["frame".to_string()],
            }),
            ..Default::default()
        };
        match stmt_error_to_error(&error) {
            Error::QueryFailed(f) => {
                assert_eq!(f.message(), "boom");
                assert_eq!(f.failure_kind.as_deref(), Some("java.lang.RuntimeException"));
                assert_eq!(f.stack.len(), 1);
                assert_eq!(f.error_code, 65536);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_session_mutation_clear_before_set() {
        let mut d = driver();
        {
            let mut session = d.session.lock().unwrap();
            session.properties.insert("a".to_string(), "1".to_string());
            session.properties.insert("b".to_string(), "2".to_string());
        }
        let mut headers = HeaderMap::new();
        headers.append(HEADER_CLEAR_SESSION, "a".parse().unwrap());
        headers.append(HEADER_SET_SESSION, "a=9".parse().unwrap());
        d.apply_response_headers(&headers);
        let session = d.session.lock().unwrap();
        let props: Vec<_> = session
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        // the cleared key was re-set and now sits at the end
        assert_eq!(props, vec![("b", "2"), ("a", "9")]);
    }

    #[test]
    fn test_session_set_preserves_position_of_existing_key() {
        let mut d = driver();
        {
            let mut session = d.session.lock().unwrap();
            session.properties.insert("a".to_string(), "1".to_string());
            session.properties.insert("b".to_string(), "2".to_string());
        }
        let mut headers = HeaderMap::new();
        headers.append(HEADER_SET_SESSION, "a=9".parse().unwrap());
        d.apply_response_headers(&headers);
        let session = d.session.lock().unwrap();
        let props: Vec<_> = session
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(props, vec![("a", "9"), ("b", "2")]);
    }

    #[test]
    fn test_transaction_header_side_effects() {
        let mut d = driver();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_STARTED_TRANSACTION, "txn-123".parse().unwrap());
        d.apply_response_headers(&headers);
        assert_eq!(
            d.session.lock().unwrap().transaction,
            TransactionState::Active("txn-123".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_CLEAR_TRANSACTION, "true".parse().unwrap());
        d.apply_response_headers(&headers);
        assert_eq!(d.session.lock().unwrap().transaction, TransactionState::None);
    }
}
