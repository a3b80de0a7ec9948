// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op broadcaster.

use super::{BroadcastError, LogBroadcaster};
use async_trait::async_trait;

/// Broadcaster that silently discards every message.
///
/// Used when no live viewer surface is attached to the worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpBroadcaster;

impl NoOpBroadcaster {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogBroadcaster for NoOpBroadcaster {
    async fn publish(&self, _channel: &str, _message: &str) -> Result<(), BroadcastError> {
        Ok(())
    }
}
