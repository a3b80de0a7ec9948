// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Metadata store seam for the Oubliette training worker

mod snapshot;
mod state;
mod store;

pub use snapshot::{Snapshot, SnapshotError};
pub use state::MetadataState;
pub use store::{MemoryStore, MetadataStore, StoreError};
