// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `tracing` integration: ships events emitted anywhere in the process.
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! let hub = Arc::new(LoggingHub::new(url, vec!["frontend".to_string()])?);
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(HubLayer::new(Arc::clone(&hub)))
//!     .init();
//! ```

use crate::hub::LoggingHub;
use crate::level::Level;
use crate::record::{FieldValue, Record};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

// Events from these targets are emitted while delivering a batch. Shipping
// them would feed the pipeline its own diagnostics.
const INTERNAL_TARGETS: [&str; 6] = [
    env!("CARGO_CRATE_NAME"),
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
];

pub struct HubLayer {
    hub: Arc<LoggingHub>,
}

impl HubLayer {
    pub fn new(hub: Arc<LoggingHub>) -> Self {
        HubLayer { hub }
    }
}

impl<S: Subscriber> Layer<S> for HubLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }
        let level = Level::from(metadata.level());
        if !self.hub.accepts(level) {
            return;
        }

        let mut visitor = RecordVisitor::new(level);
        event.record(&mut visitor);
        // Producers never see delivery problems; a full or closed queue is
        // reported by the queue itself.
        let _ = self.hub.fire(visitor.record);
    }
}

fn is_internal(target: &str) -> bool {
    INTERNAL_TARGETS.iter().any(|internal| {
        target == *internal
            || target
                .strip_prefix(internal)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

struct RecordVisitor {
    record: Record,
}

impl RecordVisitor {
    fn new(level: Level) -> Self {
        RecordVisitor {
            record: Record::new(level, String::new()),
        }
    }

    fn push(&mut self, field: &Field, value: FieldValue) {
        self.record.fields.push((field.name().to_string(), value));
    }
}

impl Visit for RecordVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, FieldValue::F64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, FieldValue::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, FieldValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.record.message = value.to_string();
        } else {
            self.push(field, FieldValue::Str(value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, FieldValue::error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.record.message = format!("{value:?}");
        } else {
            self.push(field, FieldValue::debug(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_internal_targets() {
        assert!(is_internal("logging_hub::sink"));
        assert!(is_internal("hyper"));
        assert!(is_internal("hyper_util::client::legacy"));
        assert!(!is_internal("hyperdrive"));
        assert!(!is_internal("frontend::handlers"));
    }

    #[tokio::test]
    async fn test_layer_ships_tracing_events() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logs")
            .match_body(Matcher::PartialJson(json!({
                "senders": ["frontend"],
                "entries": [{
                    "log": "order failed",
                    "level": "error",
                    "fields": {"order_id": "42", "customer": "c-7", "retryable": "false"}
                }]
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let hub = Arc::new(
            LoggingHub::with_config(HubConfig {
                flush_interval: Duration::from_secs(3600),
                ..HubConfig::new(format!("{}/logs", server.url()), vec!["frontend".to_string()])
            })
            .unwrap(),
        );
        let subscriber = tracing_subscriber::registry().with(HubLayer::new(Arc::clone(&hub)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "frontend", "not shipped");
            tracing::error!(
                target: "frontend",
                order_id = 42,
                customer = "c-7",
                retryable = false,
                "order failed"
            );
            tracing::error!(target: "logging_hub::sink", "internal, not shipped");
        });

        hub.shutdown().await;
        mock.assert_async().await;
    }
}
