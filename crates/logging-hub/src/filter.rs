// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-field filtering applied to a record before it is queued.
//!
//! For each field of a [`Record`]:
//! 1. if the name is in the ignore set, the field is dropped
//! 2. else if a [`FieldFilter`] is registered for the name, its output is used
//! 3. else the value's default rendering ([`FieldValue::render`]) is used

use crate::constants::REDACTED;
use crate::entry::LogEntry;
use crate::record::{FieldValue, Record};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Transforms a field value into the text that gets shipped.
pub trait FieldFilter: Send + Sync {
    fn apply(&self, value: &FieldValue) -> String;
}

impl<F> FieldFilter for F
where
    F: Fn(&FieldValue) -> String + Send + Sync,
{
    fn apply(&self, value: &FieldValue) -> String {
        self(value)
    }
}

/// Replaces any value with a fixed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redact {
    replacement: String,
}

impl Redact {
    pub fn with_replacement(replacement: impl Into<String>) -> Self {
        Redact {
            replacement: replacement.into(),
        }
    }
}

impl Default for Redact {
    fn default() -> Self {
        Redact::with_replacement(REDACTED)
    }
}

impl FieldFilter for Redact {
    fn apply(&self, _value: &FieldValue) -> String {
        self.replacement.clone()
    }
}

/// Renders the value and keeps at most `max_chars` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncate {
    pub max_chars: usize,
}

impl FieldFilter for Truncate {
    fn apply(&self, value: &FieldValue) -> String {
        let rendered = value.render();
        match rendered.char_indices().nth(self.max_chars) {
            Some((idx, _)) => rendered[..idx].to_string(),
            None => rendered,
        }
    }
}

/// Ignore set and filter registry keyed by field name.
#[derive(Clone, Default)]
pub struct FieldFormatter {
    ignore_fields: HashSet<String>,
    filters: HashMap<String, Arc<dyn FieldFilter>>,
}

impl FieldFormatter {
    pub fn new(
        ignore_fields: HashSet<String>,
        filters: HashMap<String, Arc<dyn FieldFilter>>,
    ) -> Self {
        FieldFormatter {
            ignore_fields,
            filters,
        }
    }

    pub fn add_ignore(&mut self, name: impl Into<String>) {
        self.ignore_fields.insert(name.into());
    }

    pub fn add_filter(&mut self, name: impl Into<String>, filter: Arc<dyn FieldFilter>) {
        self.filters.insert(name.into(), filter);
    }

    pub fn format(&self, record: Record) -> LogEntry {
        let mut fields = BTreeMap::new();
        for (name, value) in record.fields {
            if self.ignore_fields.contains(&name) {
                continue;
            }
            let text = match self.filters.get(&name) {
                Some(filter) => filter.apply(&value),
                None => value.render(),
            };
            fields.insert(name, text);
        }
        LogEntry::new(record.message, record.time, record.level, fields)
    }
}

impl fmt::Debug for FieldFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFormatter")
            .field("ignore_fields", &self.ignore_fields)
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}
