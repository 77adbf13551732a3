// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded hand-off from producer threads to the flush scheduler.
//!
//! `submit` is synchronous so it can be called from any thread, including
//! from inside a `tracing` layer. What happens when the queue is full is
//! governed by [`OverflowPolicy`].

use crate::entry::LogEntry;
use crate::errors::SubmitError;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// What a producer does when the ingestion queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for the scheduler to free a slot.
    #[default]
    Block,
    /// Discard the entry being submitted.
    DropNewest,
    /// Hand `SubmitError::QueueFull` back to the producer.
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "drop" | "drop_newest" => Ok(OverflowPolicy::DropNewest),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(format!(
                "Invalid overflow policy '{other}'. Must be one of: block, drop, reject"
            )),
        }
    }
}

/// Producer side of the ingestion queue. Cheap to clone.
#[derive(Clone)]
pub struct EntrySender {
    tx: mpsc::Sender<LogEntry>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

/// Creates the ingestion queue.
pub fn channel(capacity: usize, policy: OverflowPolicy) -> (EntrySender, mpsc::Receiver<LogEntry>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EntrySender {
            tx,
            policy,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl EntrySender {
    pub fn submit(&self, entry: LogEntry) -> Result<(), SubmitError> {
        let entry = match self.tx.try_send(entry) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(SubmitError::Closed),
            Err(TrySendError::Full(entry)) => entry,
        };

        match self.policy {
            OverflowPolicy::Block => self.blocking_submit(entry),
            OverflowPolicy::DropNewest => {
                self.record_drop();
                debug!("Ingestion queue full, dropping log entry");
                Ok(())
            }
            OverflowPolicy::Reject => Err(SubmitError::QueueFull),
        }
    }

    fn blocking_submit(&self, entry: LogEntry) -> Result<(), SubmitError> {
        let result = match Handle::try_current() {
            Err(_) => self.tx.blocking_send(entry),
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.tx.send(entry)))
            }
            Ok(_) => {
                // The scheduler shares this thread, waiting here would never return.
                self.record_drop();
                warn!("Ingestion queue full on a current-thread runtime, dropping log entry");
                return Ok(());
            }
        };
        result.map_err(|_| SubmitError::Closed)
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of entries discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for EntrySender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrySender")
            .field("policy", &self.policy)
            .field("dropped", &self.dropped())
            .finish()
    }
}
