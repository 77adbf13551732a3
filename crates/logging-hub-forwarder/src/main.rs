// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use chrono::{DateTime, Utc};
use logging_hub::{FieldValue, HubConfig, Level, LoggingHub, Record};
use serde_json::{Map, Value};
use std::env;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("LOGGING_HUB_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match HubConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to start logging hub forwarder: {e}");
            return;
        }
    };
    debug!("Starting logging hub forwarder with {config:?}");

    let hub = match LoggingHub::with_config(config) {
        Ok(hub) => hub,
        Err(e) => {
            error!("Unable to start logging hub forwarder: {e}");
            return;
        }
    };

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = hub.fire(parse_line(&line)) {
                        warn!("Dropping log line: {e}");
                    }
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                break;
            }
        }
    }

    hub.shutdown().await;
    if hub.dropped() > 0 {
        warn!("{} log lines were dropped because the queue was full", hub.dropped());
    }
}

/// Turns one input line into a record.
///
/// JSON objects use `level`, `msg` (or `message`) and `time` (RFC 3339) as the
/// record's level, message and timestamp; every other key becomes a field.
/// Anything else is shipped verbatim as an `info` record.
fn parse_line(line: &str) -> Record {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => record_from_object(object),
        _ => Record::new(Level::Info, line),
    }
}

fn record_from_object(mut object: Map<String, Value>) -> Record {
    let level = object
        .remove("level")
        .and_then(|level| level.as_str().and_then(|l| l.parse::<Level>().ok()))
        .unwrap_or(Level::Info);
    let message = object
        .remove("msg")
        .or_else(|| object.remove("message"))
        .map(|message| match message {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_default();

    let mut record = Record::new(level, message);
    if let Some(time) = object
        .remove("time")
        .and_then(|time| time.as_str().and_then(|t| DateTime::parse_from_rfc3339(t).ok()))
    {
        record = record.at(time.with_timezone(&Utc));
    }

    for (name, value) in object {
        record = record.with_field(name, FieldValue::Json(value));
    }
    record
}
