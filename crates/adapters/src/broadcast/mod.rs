// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log broadcast adapters

mod local;
mod noop;

pub use local::LocalBroadcastHub;
pub use noop::NoOpBroadcaster;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BroadcastCall, FakeBroadcaster};

use async_trait::async_trait;
use ob_core::JobId;
use thiserror::Error;

/// Errors from broadcast operations
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast unavailable: {0}")]
    Unavailable(String),
    #[error("publish to {channel} failed: {message}")]
    PublishFailed { channel: String, message: String },
}

/// Channel key carrying a job's live log: `logs:<job_id>`.
pub fn log_channel(job_id: &JobId) -> String {
    format!("logs:{}", job_id)
}

/// Best-effort, at-most-once fan-out of log text to live viewers.
///
/// A viewer that is not subscribed when a message is published never sees
/// it. Implementations must not block on slow subscribers.
#[async_trait]
pub trait LogBroadcaster: Clone + Send + Sync + 'static {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BroadcastError>;
}
