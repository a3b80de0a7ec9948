// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broadcast hub: one `tokio::sync::broadcast` sender per channel key.

use super::{BroadcastError, LogBroadcaster};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Messages buffered per channel before a slow subscriber starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// In-process pub/sub keyed by channel name.
///
/// Publishing never waits: with no subscriber the message is dropped, and a
/// subscriber that falls more than `capacity` messages behind skips ahead.
#[derive(Clone)]
pub struct LocalBroadcastHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl Default for LocalBroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl LocalBroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Receive everything published to `channel` from now on.
    ///
    /// Channels whose subscribers have all gone away are dropped here.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.lock();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of channels currently held, live or not.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Number of channels with at least one live subscriber.
    pub fn active_channels(&self) -> usize {
        self.channels
            .lock()
            .values()
            .filter(|tx| tx.receiver_count() > 0)
            .count()
    }
}

#[async_trait]
impl LogBroadcaster for LocalBroadcastHub {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BroadcastError> {
        let mut channels = self.channels.lock();
        let Some(tx) = channels.get(channel) else {
            return Ok(());
        };
        if tx.send(message.to_string()).is_err() {
            // Every subscriber has gone away.
            channels.remove(channel);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
