// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous log batching and delivery to a logging hub.
//!
//! Producers hand structured [`record::Record`]s to a [`hub::LoggingHub`]. Each
//! record is run through the field filters, pushed onto a bounded ingestion
//! queue and picked up by a single background scheduler task which batches
//! entries and POSTs them to the hub endpoint when either the batch threshold
//! is reached or the flush interval elapses.
//!
//! ```text
//!  producers ──> FieldFormatter ──> ingestion queue ──> FlushScheduler
//!                                                          │
//!                                            PendingLogs <─┘
//!                                                 │  (threshold | tick | shutdown)
//!                                                 v
//!                                               Sink ──> HTTP POST
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod entry;
pub mod errors;
pub mod filter;
pub mod hub;
pub mod layer;
pub mod level;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod sink;

pub use config::HubConfig;
pub use hub::LoggingHub;
pub use layer::HubLayer;
pub use level::Level;
pub use record::{FieldValue, Record};
