// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Raw structured records handed to the pipeline by producers.

use crate::level::Level;
use chrono::{DateTime, Utc};
use std::fmt;

/// A field value as supplied by a producer, before filtering.
///
/// Values are captured at construction so a record is `Send` and can cross
/// threads without borrowing from the producer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    /// Message of an error value.
    Error(String),
    /// String form of a value implementing `Display`.
    Display(String),
    /// Structured value that passes through as JSON.
    Json(serde_json::Value),
    /// Generic `{:?}` fallback.
    Debug(String),
}

impl FieldValue {
    pub fn error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        FieldValue::Error(err.to_string())
    }

    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        FieldValue::Display(value.to_string())
    }

    pub fn debug<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        FieldValue::Debug(format!("{value:?}"))
    }

    /// Default textual rendering. Never fails.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Str(s)
            | FieldValue::Error(s)
            | FieldValue::Display(s)
            | FieldValue::Debug(s) => s.clone(),
            FieldValue::I64(v) => v.to_string(),
            FieldValue::U64(v) => v.to_string(),
            FieldValue::F64(v) => v.to_string(),
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Json(serde_json::Value::String(s)) => s.clone(),
            FieldValue::Json(v) => v.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::I64(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::I64(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::U64(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::U64(u64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

/// A structured log record: level, message, timestamp and named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub level: Level,
    pub message: String,
    pub time: DateTime<Utc>,
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            level,
            message: message.into(),
            time: Utc::now(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Opaque {
        id: u8,
    }

    #[test]
    fn test_render_self_describing_values() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert_eq!(FieldValue::error(&err).render(), "disk on fire");

        let addr: std::net::SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(FieldValue::display(&addr).render(), "127.0.0.1:8080");
    }

    #[test]
    fn test_render_json_values() {
        assert_eq!(FieldValue::from(json!("plain")).render(), "plain");
        assert_eq!(
            FieldValue::from(json!({"a": 1, "b": [true]})).render(),
            r#"{"a":1,"b":[true]}"#
        );
    }

    #[test]
    fn test_render_falls_back_to_debug() {
        assert_eq!(FieldValue::debug(&Opaque { id: 7 }).render(), "Opaque { id: 7 }");
    }

    #[test]
    fn test_render_primitives() {
        assert_eq!(FieldValue::from(-3i64).render(), "-3");
        assert_eq!(FieldValue::from(3u32).render(), "3");
        assert_eq!(FieldValue::from(1.5).render(), "1.5");
        assert_eq!(FieldValue::from(false).render(), "false");
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new(Level::Info, "hello")
            .with_field("user", "alice")
            .with_field("attempt", 2);
        assert_eq!(record.message, "hello");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[1], ("attempt".to_string(), FieldValue::I64(2)));
    }
}
