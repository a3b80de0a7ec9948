// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue adapters
//!
//! The durable broker lives outside the worker; these adapters only hand the
//! pool one descriptor at a time.

mod channel;
mod spool;

pub use channel::{ChannelQueue, ChannelQueueSender};
pub use spool::SpoolQueue;

use async_trait::async_trait;
use ob_core::{JobDescriptor, JobId};
use thiserror::Error;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed job descriptor {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Source of job descriptors.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Wait for the next descriptor. `Ok(None)` means the queue is closed.
    ///
    /// Must be cancel-safe: dropping the future never loses a descriptor.
    async fn next(&self) -> Result<Option<JobDescriptor>, QueueError>;

    /// Acknowledge that a job's runner has returned.
    async fn ack(&self, _job_id: &JobId) -> Result<(), QueueError> {
        Ok(())
    }
}
