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

//! Low-level HTTP execution with automatic retry.
//!
//! Transport errors and `503`/`429` responses are retried with exponential
//! backoff and jitter; everything else is classified immediately. The
//! statement driver layers the protocol state machine on top of this.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result, PRESTO_UNAVAILABLE};

/// Retry policy for one HTTP hop of the statement protocol.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound on a single backoff delay.
    pub max_delay: Duration,
    /// Jitter fraction applied to each delay (0.25 = +/-25%).
    pub jitter: f64,
    /// Total number of requests issued for one hop, first attempt included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before attempt `attempt + 1`, jittered.
    fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        capped.mul_f64(factor)
    }
}

/// HTTP client for one connection to a Presto coordinator.
#[derive(Debug, Clone)]
pub struct PrestoHttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl PrestoHttpClient {
    pub(crate) fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// The underlying `reqwest` client for building requests.
    pub(crate) fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Execute one protocol hop, retrying per policy.
    ///
    /// `build` is invoked once per attempt so the request body and headers
    /// are rebuilt fresh. The cancellation token is observed while waiting
    /// on the network and during backoff sleeps.
    pub(crate) async fn execute<F>(
        &self,
        build: F,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let send = build().send();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::QueryCancelled),
                r = send => r,
            };

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if Self::is_retryable_status(status) {
                        if attempts < self.policy.max_attempts {
                            warn!(
                                "request failed with {} (attempt {}/{}), retrying",
                                status, attempts, self.policy.max_attempts
                            );
                            self.wait_for_retry(attempts, cancel).await?;
                            continue;
                        }
                        return Err(Error::query_failed(
                            PRESTO_UNAVAILABLE,
                            format!("coordinator unavailable after {} attempts: {}", attempts, status),
                        ));
                    }
                    return Err(Error::query_failed(
                        "PRESTO_HTTP_ERROR",
                        status.to_string(),
                    ));
                }
                Err(e) => {
                    if Self::is_retryable_error(&e) {
                        if attempts < self.policy.max_attempts {
                            warn!(
                                "request failed (attempt {}/{}): {}, retrying",
                                attempts, self.policy.max_attempts, e
                            );
                            self.wait_for_retry(attempts, cancel).await?;
                            continue;
                        }
                        return Err(Error::query_failed(
                            PRESTO_UNAVAILABLE,
                            format!("coordinator unreachable after {} attempts: {}", attempts, e),
                        ));
                    }
                    return Err(Error::Http(e));
                }
            }
        }
    }

    /// Issue a request exactly once, without retry. Used for best-effort
    /// cancellation.
    pub(crate) async fn send_once(&self, build: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        Ok(build.send().await?)
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS
        )
    }

    fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    async fn wait_for_retry(&self, attempt: u32, cancel: &CancellationToken) -> Result<()> {
        let delay = self.policy.delay(attempt);
        debug!("waiting {:?} before retry", delay);
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::QueryCancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
