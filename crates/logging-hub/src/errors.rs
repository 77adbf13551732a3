// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while building a [`crate::hub::LoggingHub`]. All of them are
/// fatal: the pipeline is never started.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No tokio runtime available to run the flush scheduler")]
    NoRuntime,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors returned to producers when an entry can't be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Ingestion queue is full")]
    QueueFull,

    #[error("Logging hub pipeline is shut down")]
    Closed,
}
