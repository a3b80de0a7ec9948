// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process queue over a tokio mpsc channel.

use super::{JobQueue, QueueError};
use async_trait::async_trait;
use ob_core::JobDescriptor;
use tokio::sync::{mpsc, Mutex};

/// Producer half of a [`ChannelQueue`].
pub type ChannelQueueSender = mpsc::UnboundedSender<JobDescriptor>;

/// Queue fed by an in-process channel. Closes when every sender is dropped.
pub struct ChannelQueue {
    rx: Mutex<mpsc::UnboundedReceiver<JobDescriptor>>,
}

impl ChannelQueue {
    pub fn new() -> (ChannelQueueSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl JobQueue for ChannelQueue {
    async fn next(&self) -> Result<Option<JobDescriptor>, QueueError> {
        Ok(self.rx.lock().await.recv().await)
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
