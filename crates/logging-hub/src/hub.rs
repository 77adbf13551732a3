// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The owned pipeline object producers talk to.
//!
//! Building a [`LoggingHub`] validates the configuration and spawns the
//! [`FlushScheduler`] on the current tokio runtime. The hub owns the
//! ingestion queue, the pending buffer and the scheduler's cancellation token;
//! [`LoggingHub::shutdown`] stops the scheduler after a final flush.

use crate::buffer::PendingLogs;
use crate::config::HubConfig;
use crate::errors::{HubError, SubmitError};
use crate::filter::{FieldFilter, FieldFormatter};
use crate::level::Level;
use crate::queue::{self, EntrySender};
use crate::record::Record;
use crate::scheduler::{FlushResponse, FlushScheduler, SchedulerConfig, SchedulerHandle};
use crate::sink::Sink;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub struct LoggingHub {
    levels: RwLock<Vec<Level>>,
    formatter: RwLock<FieldFormatter>,
    sender: EntrySender,
    buffer: Arc<PendingLogs>,
    flusher: SchedulerHandle,
    cancel_token: CancellationToken,
    scheduler: TokioMutex<Option<JoinHandle<()>>>,
}

impl LoggingHub {
    /// Creates a hub with default settings for everything but the URL and senders.
    pub fn new(url: impl Into<String>, senders: Vec<String>) -> Result<Self, HubError> {
        Self::with_config(HubConfig::new(url, senders))
    }

    /// Creates a hub and starts its flush scheduler. Must be called from within
    /// a tokio runtime.
    pub fn with_config(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| HubError::NoRuntime)?;

        let sink = Sink::new(
            config.url.clone(),
            config.senders.clone(),
            config.timeout,
            config.retry_strategy,
        )?;
        let buffer = Arc::new(PendingLogs::new());
        let (sender, rx) = queue::channel(config.queue_capacity, config.overflow_policy);
        let cancel_token = CancellationToken::new();

        let url = sink.url().to_string();
        let (scheduler, flusher) = FlushScheduler::new(
            rx,
            Arc::clone(&buffer),
            Arc::new(sink),
            SchedulerConfig {
                batch_size: config.batch_size,
                request_size_limit: config.request_size_limit,
                flush_interval: config.flush_interval,
            },
            cancel_token.clone(),
        );
        let handle = runtime.spawn(scheduler.run());
        debug!(
            "Logging hub started for {} with batch size {} and flush interval {:?}",
            url,
            config.batch_size,
            config.flush_interval
        );

        let levels = if config.levels.is_empty() {
            Level::DEFAULT_LEVELS.to_vec()
        } else {
            config.levels
        };

        Ok(LoggingHub {
            levels: RwLock::new(levels),
            formatter: RwLock::new(FieldFormatter::new(config.ignore_fields, config.filters)),
            sender,
            buffer,
            flusher,
            cancel_token,
            scheduler: TokioMutex::new(Some(handle)),
        })
    }

    pub fn levels(&self) -> Vec<Level> {
        self.levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_levels(&self, levels: Vec<Level>) {
        *self.levels.write().unwrap_or_else(PoisonError::into_inner) = levels;
    }

    pub fn accepts(&self, level: Level) -> bool {
        self.levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&level)
    }

    /// Adds a field name that is never shipped.
    pub fn add_ignore(&self, name: impl Into<String>) {
        self.formatter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_ignore(name);
    }

    /// Registers a filter for a field name, replacing any previous one.
    pub fn add_filter(&self, name: impl Into<String>, filter: Arc<dyn FieldFilter>) {
        self.formatter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_filter(name, filter);
    }

    /// Filters a record and queues it for delivery. Records whose level is not
    /// accepted are skipped.
    ///
    /// Only fails under [`crate::queue::OverflowPolicy::Reject`] or once the
    /// hub is shut down.
    pub fn fire(&self, record: Record) -> Result<(), SubmitError> {
        if !self.accepts(record.level) {
            return Ok(());
        }
        let entry = self
            .formatter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .format(record);
        self.sender.submit(entry)
    }

    /// Delivers whatever is pending right now without waiting for the timer.
    ///
    /// The flush runs on the scheduler task, after any delivery already in
    /// flight and after entries queued before the call, so batches still
    /// reach the hub in order. Returns `Ok(0)` once the hub is shut down.
    pub async fn flush(&self) -> FlushResponse {
        self.flusher.flush().await
    }

    /// Stops the scheduler after it has drained the queue and flushed.
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let Some(handle) = self.scheduler.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            error!("Flush scheduler task failed: {e}");
        }
    }

    /// Entries dropped because the ingestion queue was full.
    pub fn dropped(&self) -> u64 {
        self.sender.dropped()
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Drop for LoggingHub {
    fn drop(&mut self) {
        // Lets a still-running scheduler drain and flush in the background.
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Redact;
    use crate::record::FieldValue;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn config(url: String) -> HubConfig {
        HubConfig {
            batch_size: 10,
            flush_interval: Duration::from_secs(3600),
            ..HubConfig::new(url, vec!["frontend".to_string()])
        }
    }

    #[tokio::test]
    async fn test_construction_errors() {
        assert!(matches!(
            LoggingHub::new("", vec!["svc".to_string()]),
            Err(HubError::InvalidConfig(_))
        ));
        assert!(matches!(
            LoggingHub::new("http://localhost/logs", Vec::new()),
            Err(HubError::InvalidConfig(_))
        ));
        assert!(matches!(
            LoggingHub::with_config(HubConfig {
                flush_interval: Duration::from_secs(u64::MAX),
                ..HubConfig::new("http://localhost/logs", vec!["svc".to_string()])
            }),
            Err(HubError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(
            LoggingHub::new("http://localhost/logs", vec!["svc".to_string()]),
            Err(HubError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_level_management() {
        let hub = LoggingHub::new("http://localhost/logs", vec!["svc".to_string()]).unwrap();
        assert_eq!(hub.levels(), Level::DEFAULT_LEVELS.to_vec());
        assert!(hub.accepts(Level::Info));
        assert!(!hub.accepts(Level::Debug));

        hub.set_levels(vec![Level::Debug]);
        assert!(hub.accepts(Level::Debug));
        assert!(!hub.accepts(Level::Error));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_fire_filters_and_shutdown_flushes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .match_body(Matcher::PartialJson(json!({
                "senders": ["frontend"],
                "entries": [
                    {"log": "login", "level": "info", "fields": {"user": "alice", "token": "[REDACTED]"}},
                    {"log": "boom", "level": "error", "fields": {}}
                ]
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let hub = LoggingHub::with_config(config(format!("{}/logs", server.url()))).unwrap();
        hub.add_ignore("password");
        hub.add_filter("token", Arc::new(Redact::default()));

        hub.fire(
            Record::new(Level::Info, "login")
                .with_field("user", "alice")
                .with_field("password", "hunter2")
                .with_field("token", "abc"),
        )
        .unwrap();
        hub.fire(Record::new(Level::Debug, "noise")).unwrap();
        hub.fire(Record::new(Level::Error, "boom").with_field("password", FieldValue::I64(1)))
            .unwrap();

        hub.shutdown().await;
        mock.assert_async().await;

        assert_eq!(
            hub.fire(Record::new(Level::Error, "late")),
            Err(SubmitError::Closed)
        );
        // Second shutdown is a no-op.
        hub.shutdown().await;
        assert_eq!(hub.flush().await, Ok(0));
    }

    #[tokio::test]
    async fn test_manual_flush_of_empty_buffer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .expect(0)
            .create_async()
            .await;

        let hub = LoggingHub::with_config(config(format!("{}/logs", server.url()))).unwrap();
        assert_eq!(hub.flush().await, Ok(0));
        assert_eq!(hub.pending(), 0);
        hub.shutdown().await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_manual_flush_delivers_pending() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .match_body(Matcher::PartialJson(json!({
                "entries": [{"log": "one"}, {"log": "two"}]
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let hub = LoggingHub::with_config(config(format!("{}/logs", server.url()))).unwrap();
        hub.fire(Record::new(Level::Warn, "one")).unwrap();
        hub.fire(Record::new(Level::Warn, "two")).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.pending() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("entries never reached the buffer");

        assert_eq!(hub.flush().await, Ok(2));
        assert_eq!(hub.pending(), 0);
        hub.shutdown().await;
        mock.assert_async().await;
    }
}
