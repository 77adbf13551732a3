// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP delivery of a batch to the logging hub.
//!
//! Delivery is best effort: whatever happens, the batch handed to
//! [`Sink::deliver`] is consumed. Failures are logged and returned so callers
//! can observe them, but nothing is requeued or persisted. A [`RetryStrategy`]
//! can be configured for transport errors and 5xx responses; the default makes
//! a single attempt.

use crate::entry::{BatchRequest, LogEntry};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryStrategy {
    /// One attempt per batch.
    #[default]
    None,
    /// Up to `n` attempts back to back.
    Immediate(u64),
    /// Up to `n` attempts, waiting `attempt * delay_ms` between them.
    LinearBackoff(u64, u64),
}

impl std::str::FromStr for RetryStrategy {
    type Err = String;

    /// Parses `none`, `immediate,N` or `linear,N,MS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let number = |raw: &str| {
            raw.parse::<u64>()
                .map_err(|_| format!("Invalid number '{raw}' in retry strategy '{s}'"))
        };
        match parts.as_slice() {
            ["none"] => Ok(RetryStrategy::None),
            ["immediate", n] => Ok(RetryStrategy::Immediate(number(n)?)),
            ["linear", n, delay] => Ok(RetryStrategy::LinearBackoff(number(n)?, number(delay)?)),
            _ => Err(format!(
                "Invalid retry strategy '{s}'. Expected none, immediate,N or linear,N,MS"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShippingError {
    #[error("Failed to serialize payload: {0}")]
    Payload(String),

    #[error("Failed to deliver to destination ({0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}

#[derive(Debug, Clone)]
pub struct Sink {
    client: reqwest::Client,
    url: String,
    senders: Vec<String>,
    retry_strategy: RetryStrategy,
}

impl Sink {
    pub fn new(
        url: String,
        senders: Vec<String>,
        timeout: Duration,
        retry_strategy: RetryStrategy,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Sink {
            client,
            url,
            senders,
            retry_strategy,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ships `entries` as one POST. Returns how many entries were delivered;
    /// an empty batch returns `Ok(0)` without touching the network.
    pub async fn deliver(&self, entries: Vec<LogEntry>) -> Result<usize, ShippingError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let count = entries.len();

        let body = serde_json::to_vec(&BatchRequest {
            senders: &self.senders,
            entries: &entries,
        })
        .map_err(|e| {
            error!("Failed to serialize {count} log entries, batch dropped: {e}");
            ShippingError::Payload(e.to_string())
        })?;
        drop(entries);

        let mut attempts = 0;
        loop {
            attempts += 1;
            let time = Instant::now();
            let resp = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;
            let elapsed = time.elapsed();

            match resp {
                Ok(resp) if resp.status().is_success() => {
                    debug!(
                        "Delivered {count} log entries in {} ms",
                        elapsed.as_millis()
                    );
                    return Ok(count);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_else(|e| {
                        error!("Failed to read response body: {e}");
                        String::new()
                    });
                    if status.is_server_error() && self.should_retry(attempts).await {
                        warn!("{status}: Logging hub rejected batch, retrying (attempt {attempts})");
                        continue;
                    }
                    error!(
                        status_code = status.as_u16(),
                        "Error posting logs: {status}: {text}"
                    );
                    return Err(ShippingError::Destination(Some(status), text));
                }
                Err(e) => {
                    if self.should_retry(attempts).await {
                        warn!("Error flushing logs, retrying (attempt {attempts}): {e}");
                        continue;
                    }
                    error!(
                        "Error flushing {count} logs after {} ms and {attempts} attempts: {e}",
                        elapsed.as_millis()
                    );
                    return Err(ShippingError::Destination(e.status(), e.to_string()));
                }
            }
        }
    }

    async fn should_retry(&self, attempts: u64) -> bool {
        match self.retry_strategy {
            RetryStrategy::None => false,
            RetryStrategy::Immediate(max) => attempts < max,
            RetryStrategy::LinearBackoff(max, delay_ms) => {
                if attempts >= max {
                    return false;
                }
                tokio::time::sleep(backoff_delay(delay_ms, attempts)).await;
                true
            }
        }
    }
}

fn backoff_delay(delay_ms: u64, attempts: u64) -> Duration {
    Duration::from_millis(delay_ms.saturating_mul(attempts))
}
