// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire model for the logging hub intake.
//!
//! A flush is sent as a single JSON document:
//!
//! ```json
//! {
//!   "senders": ["checkout"],
//!   "entries": [
//!     {"log": "payment failed", "time": "2024-01-02T15:04:05.000Z",
//!      "level": "error", "fields": {"order": "42"}}
//!   ]
//! }
//! ```

use crate::level::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A filtered log entry ready to ship. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    log: String,
    time: String,
    level: Level,
    fields: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(
        message: String,
        time: DateTime<Utc>,
        level: Level,
        fields: BTreeMap<String, String>,
    ) -> Self {
        LogEntry {
            log: message,
            time: format_time(time),
            level,
            fields,
        }
    }

    pub fn message(&self) -> &str {
        &self.log
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Size accounted against the request size limit. Fields are not counted.
    pub fn size(&self) -> usize {
        self.log.len() + self.time.len() + self.level.as_str().len()
    }
}

/// Request body for one flush.
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub senders: &'a [String],
    pub entries: &'a [LogEntry],
}

/// Formats a timestamp as `2006-01-02T15:04:05.000Z`.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
