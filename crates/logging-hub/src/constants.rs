// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Capacity of the ingestion queue between producers and the scheduler.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Number of pending entries that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Longest accepted flush interval. The scheduler clamps to it as well.
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Client side timeout for a single POST to the hub.
pub const DEFAULT_HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

pub const MAX_HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Replacement text used by the `Redact` filter.
pub const REDACTED: &str = "[REDACTED]";
