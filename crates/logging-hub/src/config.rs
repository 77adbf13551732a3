// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_HTTP_CLIENT_TIMEOUT,
    DEFAULT_QUEUE_CAPACITY, MAX_FLUSH_INTERVAL, MAX_HTTP_CLIENT_TIMEOUT,
};
use crate::errors::HubError;
use crate::filter::{FieldFilter, Redact};
use crate::level::Level;
use crate::queue::OverflowPolicy;
use crate::sink::RetryStrategy;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::hub::LoggingHub`].
#[derive(Clone)]
pub struct HubConfig {
    /// Logging hub intake URL. Required.
    pub url: String,
    /// Identifiers sent with every batch. At least one is required.
    pub senders: Vec<String>,
    /// Levels that are shipped. Empty means [`Level::DEFAULT_LEVELS`].
    pub levels: Vec<Level>,
    /// Field names never shipped.
    pub ignore_fields: HashSet<String>,
    /// Filters applied to fields by name.
    pub filters: HashMap<String, Arc<dyn FieldFilter>>,
    /// Pending entry count that triggers a flush.
    pub batch_size: usize,
    /// Accumulated entry size that triggers a flush, see [`crate::entry::LogEntry::size`].
    pub request_size_limit: Option<usize>,
    pub flush_interval: Duration,
    pub timeout: Duration,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub retry_strategy: RetryStrategy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            senders: Vec::new(),
            levels: Level::DEFAULT_LEVELS.to_vec(),
            ignore_fields: HashSet::new(),
            filters: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            request_size_limit: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            timeout: DEFAULT_HTTP_CLIENT_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            retry_strategy: RetryStrategy::default(),
        }
    }
}

impl HubConfig {
    pub fn new(url: impl Into<String>, senders: Vec<String>) -> Self {
        Self {
            url: url.into(),
            senders,
            ..Default::default()
        }
    }

    /// Create configuration from `LOGGING_HUB_*` environment variables.
    pub fn from_env() -> Result<Self, HubError> {
        let defaults = Self::default();

        let url = env::var("LOGGING_HUB_URL").unwrap_or_default();
        let senders = env::var("LOGGING_HUB_SENDERS")
            .map(|val| split_list(&val))
            .unwrap_or_default();
        let levels = match env::var("LOGGING_HUB_LEVELS") {
            Ok(val) => split_list(&val)
                .iter()
                .map(|level| level.parse::<Level>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| HubError::InvalidConfig(e.to_string()))?,
            Err(_) => defaults.levels,
        };
        let ignore_fields: HashSet<String> = env::var("LOGGING_HUB_IGNORE_FIELDS")
            .map(|val| split_list(&val).into_iter().collect())
            .unwrap_or_default();
        let filters: HashMap<String, Arc<dyn FieldFilter>> = env::var("LOGGING_HUB_REDACT_FIELDS")
            .map(|val| {
                split_list(&val)
                    .into_iter()
                    .map(|name| (name, Arc::new(Redact::default()) as Arc<dyn FieldFilter>))
                    .collect()
            })
            .unwrap_or_default();

        let batch_size = parse_var("LOGGING_HUB_BATCH_SIZE")?.unwrap_or(defaults.batch_size);
        let request_size_limit = parse_var("LOGGING_HUB_REQUEST_SIZE_LIMIT")?;
        let flush_interval = parse_var("LOGGING_HUB_FLUSH_INTERVAL")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.flush_interval);
        let timeout = parse_var("LOGGING_HUB_TIMEOUT")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let queue_capacity =
            parse_var("LOGGING_HUB_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        let overflow_policy =
            parse_var("LOGGING_HUB_OVERFLOW_POLICY")?.unwrap_or(defaults.overflow_policy);
        let retry_strategy = parse_var("LOGGING_HUB_RETRY")?.unwrap_or(defaults.retry_strategy);

        let config = Self {
            url,
            senders,
            levels,
            ignore_fields,
            filters,
            batch_size,
            request_size_limit,
            flush_interval,
            timeout,
            queue_capacity,
            overflow_policy,
            retry_strategy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), HubError> {
        if self.url.trim().is_empty() {
            return Err(HubError::InvalidConfig(
                "Logging hub URL cannot be empty".to_string(),
            ));
        }

        if self.senders.is_empty() {
            return Err(HubError::InvalidConfig(
                "Configuration must have at least one sender".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(HubError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(HubError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(HubError::InvalidConfig(format!(
                "Flush interval cannot exceed {MAX_FLUSH_INTERVAL:?}"
            )));
        }

        if self.timeout.is_zero() || self.timeout > MAX_HTTP_CLIENT_TIMEOUT {
            return Err(HubError::InvalidConfig(format!(
                "HTTP timeout must be greater than 0 and at most {MAX_HTTP_CLIENT_TIMEOUT:?}"
            )));
        }

        if self.queue_capacity == 0 {
            return Err(HubError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("url", &self.url)
            .field("senders", &self.senders)
            .field("levels", &self.levels)
            .field("ignore_fields", &self.ignore_fields)
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("batch_size", &self.batch_size)
            .field("request_size_limit", &self.request_size_limit)
            .field("flush_interval", &self.flush_interval)
            .field("timeout", &self.timeout)
            .field("queue_capacity", &self.queue_capacity)
            .field("overflow_policy", &self.overflow_policy)
            .field("retry_strategy", &self.retry_strategy)
            .finish()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T>(name: &str) -> Result<Option<T>, HubError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| HubError::InvalidConfig(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> HubConfig {
        HubConfig::new("http://localhost:9000/logs", vec!["svc".to_string()])
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.overflow_policy, OverflowPolicy::Block);
        assert_eq!(config.retry_strategy, RetryStrategy::None);
        assert_eq!(config.levels, Level::DEFAULT_LEVELS.to_vec());
    }

    #[test]
    fn test_validate_empty_url() {
        let config = HubConfig {
            url: "  ".to_string(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(HubError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_no_senders() {
        let config = HubConfig {
            senders: Vec::new(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one sender"));
    }

    #[test]
    fn test_validate_zero_values() {
        assert!(HubConfig {
            batch_size: 0,
            ..valid()
        }
        .validate()
        .is_err());
        assert!(HubConfig {
            flush_interval: Duration::ZERO,
            ..valid()
        }
        .validate()
        .is_err());
        assert!(HubConfig {
            queue_capacity: 0,
            ..valid()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_validate_durations_out_of_range() {
        let err = HubConfig {
            flush_interval: Duration::from_secs(u64::MAX),
            ..valid()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("Flush interval cannot exceed"));

        assert!(HubConfig {
            flush_interval: MAX_FLUSH_INTERVAL,
            ..valid()
        }
        .validate()
        .is_ok());
        assert!(HubConfig {
            timeout: Duration::from_secs(u64::MAX),
            ..valid()
        }
        .validate()
        .is_err());
        assert!(HubConfig {
            timeout: Duration::ZERO,
            ..valid()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    // All environment handling lives in one test so parallel tests never
    // observe each other's variables.
    #[test]
    fn test_from_env() {
        env::set_var("LOGGING_HUB_URL", "http://hub:8080/entries");
        env::set_var("LOGGING_HUB_SENDERS", "frontend, customers");
        env::set_var("LOGGING_HUB_LEVELS", "error,warn");
        env::set_var("LOGGING_HUB_IGNORE_FIELDS", "password");
        env::set_var("LOGGING_HUB_REDACT_FIELDS", "token");
        env::set_var("LOGGING_HUB_BATCH_SIZE", "25");
        env::set_var("LOGGING_HUB_FLUSH_INTERVAL", "5");
        env::set_var("LOGGING_HUB_OVERFLOW_POLICY", "reject");
        env::set_var("LOGGING_HUB_RETRY", "immediate,2");

        let config = HubConfig::from_env().expect("config from env");
        assert_eq!(config.url, "http://hub:8080/entries");
        assert_eq!(config.senders, vec!["frontend", "customers"]);
        assert_eq!(config.levels, vec![Level::Error, Level::Warn]);
        assert!(config.ignore_fields.contains("password"));
        assert!(config.filters.contains_key("token"));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
        assert_eq!(config.retry_strategy, RetryStrategy::Immediate(2));

        env::set_var("LOGGING_HUB_BATCH_SIZE", "many");
        let err = HubConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("LOGGING_HUB_BATCH_SIZE"));

        env::set_var("LOGGING_HUB_BATCH_SIZE", "25");
        env::set_var("LOGGING_HUB_FLUSH_INTERVAL", "18446744073709551615");
        let err = HubConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("Flush interval cannot exceed"));

        env::set_var("LOGGING_HUB_FLUSH_INTERVAL", "5");
        env::set_var("LOGGING_HUB_SENDERS", "");
        assert!(HubConfig::from_env().is_err());

        for name in [
            "LOGGING_HUB_URL",
            "LOGGING_HUB_SENDERS",
            "LOGGING_HUB_LEVELS",
            "LOGGING_HUB_IGNORE_FIELDS",
            "LOGGING_HUB_REDACT_FIELDS",
            "LOGGING_HUB_BATCH_SIZE",
            "LOGGING_HUB_FLUSH_INTERVAL",
            "LOGGING_HUB_OVERFLOW_POLICY",
            "LOGGING_HUB_RETRY",
        ] {
            env::remove_var(name);
        }
    }
}
