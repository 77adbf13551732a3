// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::LogEntry;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Pending {
    items: Vec<LogEntry>,
    total_size: usize,
}

/// Entries waiting for the next flush, in arrival order.
///
/// The scheduler is the only task appending, the lock guards against a manual
/// [`crate::hub::LoggingHub::flush`] from another thread.
#[derive(Debug, Default)]
pub struct PendingLogs {
    inner: Mutex<Pending>,
}

impl PendingLogs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry and returns the pending count and accumulated size.
    pub fn append_log(&self, entry: LogEntry) -> (usize, usize) {
        let mut pending = self.lock();
        pending.total_size += entry.size();
        pending.items.push(entry);
        (pending.items.len(), pending.total_size)
    }

    /// Takes every pending entry, leaving the buffer empty.
    pub fn flush(&self) -> Vec<LogEntry> {
        let mut pending = self.lock();
        pending.total_size = 0;
        std::mem::take(&mut pending.items)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.lock().total_size
    }
}
