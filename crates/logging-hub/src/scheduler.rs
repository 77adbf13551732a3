// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background task that batches queued entries and triggers delivery.
//!
//! The scheduler waits on four event sources at once:
//! - an entry arriving on the ingestion queue: appended, then flushed if the
//!   batch threshold (or the optional size limit) is reached
//! - a flush command from a [`SchedulerHandle`]: flushes and replies
//! - the flush ticker: flushes whatever is pending
//! - the cancellation token: drains the queue, flushes once more and exits
//!
//! Only this task receives from the queue and talks to the sink, so two
//! flush triggers never race for queue contents and batches leave in order.

use crate::buffer::PendingLogs;
use crate::constants::MAX_FLUSH_INTERVAL;
use crate::entry::LogEntry;
use crate::sink::{ShippingError, Sink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type FlushResponse = Result<usize, ShippingError>;

/// Requests flushes from a running [`FlushScheduler`]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<oneshot::Sender<FlushResponse>>,
}

impl SchedulerHandle {
    /// Flushes the pending buffer between the scheduler's own deliveries and
    /// returns the number of entries shipped. Once the scheduler has stopped
    /// there is nothing left to flush and `Ok(0)` is returned.
    pub async fn flush(&self) -> FlushResponse {
        let (response_tx, response_rx) = oneshot::channel();
        if self.tx.send(response_tx).is_err() {
            debug!("Flush scheduler already stopped, nothing to flush");
            return Ok(0);
        }
        response_rx.await.unwrap_or(Ok(0))
    }
}

pub struct FlushScheduler {
    rx: mpsc::Receiver<LogEntry>,
    commands: mpsc::UnboundedReceiver<oneshot::Sender<FlushResponse>>,
    buffer: Arc<PendingLogs>,
    sink: Arc<Sink>,
    batch_size: usize,
    request_size_limit: Option<usize>,
    flush_interval: Duration,
    cancel_token: CancellationToken,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub request_size_limit: Option<usize>,
    pub flush_interval: Duration,
}

impl FlushScheduler {
    pub fn new(
        rx: mpsc::Receiver<LogEntry>,
        buffer: Arc<PendingLogs>,
        sink: Arc<Sink>,
        config: SchedulerConfig,
        cancel_token: CancellationToken,
    ) -> (Self, SchedulerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let flush_interval = if config.flush_interval > MAX_FLUSH_INTERVAL {
            warn!(
                "Flush interval {:?} is too long, using {MAX_FLUSH_INTERVAL:?}",
                config.flush_interval
            );
            MAX_FLUSH_INTERVAL
        } else {
            config.flush_interval
        };

        let scheduler = FlushScheduler {
            rx,
            commands,
            buffer,
            sink,
            batch_size: config.batch_size,
            request_size_limit: config.request_size_limit,
            flush_interval,
            cancel_token,
        };
        (scheduler, SchedulerHandle { tx })
    }

    pub async fn run(mut self) {
        debug!("Flush scheduler started");
        let start = Instant::now()
            .checked_add(self.flush_interval)
            .unwrap_or_else(Instant::now);
        let mut ticker = interval_at(start, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!("Flush scheduler received shutdown signal");
                    break;
                }
                maybe_entry = self.rx.recv() => {
                    let Some(entry) = maybe_entry else {
                        debug!("All producers dropped, stopping flush scheduler");
                        break;
                    };
                    let (count, total_size) = self.buffer.append_log(entry);
                    if self.should_flush(count, total_size) {
                        let _ = self.flush().await;
                    }
                }
                Some(response_tx) = self.commands.recv() => {
                    let response = self.flush().await;
                    // The requester may have given up waiting.
                    let _ = response_tx.send(response);
                }
                _ = ticker.tick() => {
                    let _ = self.flush().await;
                }
            }
        }

        self.drain().await;
        debug!("Flush scheduler stopped");
    }

    fn should_flush(&self, count: usize, total_size: usize) -> bool {
        count >= self.batch_size
            || self
                .request_size_limit
                .is_some_and(|limit| total_size >= limit)
    }

    /// Failures are logged by the sink; the batch is gone either way.
    async fn flush(&self) -> FlushResponse {
        let entries = self.buffer.flush();
        if entries.is_empty() {
            return Ok(0);
        }
        debug!("Flushing {} log entries", entries.len());
        self.sink.deliver(entries).await
    }

    /// Moves everything still queued into the buffer and flushes it, keeping
    /// the batch threshold so a large backlog ships in several requests.
    async fn drain(&mut self) {
        self.rx.close();
        while let Some(entry) = self.rx.recv().await {
            let (count, total_size) = self.buffer.append_log(entry);
            if self.should_flush(count, total_size) {
                let _ = self.flush().await;
            }
        }
        let _ = self.flush().await;
    }
}
