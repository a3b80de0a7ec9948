// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake broadcaster for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BroadcastError, LogBroadcaster};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Recorded publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastCall {
    pub channel: String,
    pub message: String,
}

#[derive(Default)]
struct FakeBroadcastState {
    calls: Vec<BroadcastCall>,
    fail: bool,
    delay: Option<Duration>,
}

/// Fake broadcaster for testing
#[derive(Clone, Default)]
pub struct FakeBroadcaster {
    inner: Arc<Mutex<FakeBroadcastState>>,
}

impl FakeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded publishes
    pub fn calls(&self) -> Vec<BroadcastCall> {
        self.inner.lock().calls.clone()
    }

    /// Messages published to one channel, in order.
    pub fn messages(&self, channel: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.channel == channel)
            .map(|c| c.message.clone())
            .collect()
    }

    /// Make every publish fail.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Delay every publish, simulating a slow downstream.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }
}

#[async_trait]
impl LogBroadcaster for FakeBroadcaster {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BroadcastError> {
        let delay = self.inner.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock();
        if inner.fail {
            return Err(BroadcastError::PublishFailed {
                channel: channel.to_string(),
                message: "fake failure".to_string(),
            });
        }
        inner.calls.push(BroadcastCall {
            channel: channel.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
