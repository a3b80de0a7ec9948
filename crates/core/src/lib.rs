// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ob-core: Domain types for the Oubliette training worker

pub mod clock;
pub mod hyperparams;
pub mod id;
pub mod job;
pub mod metrics;
pub mod records;
pub mod slug;
pub mod storage_path;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use hyperparams::{HyperparameterError, Hyperparameters, DEFAULT_MAX_PARAMS_BYTES};
pub use id::{is_path_component, IdGen, SequentialIdGen, UuidIdGen};
pub use job::{JobDescriptor, JobId, JobRecord, JobStatus, TransitionError};
pub use metrics::{parse_metrics, Metrics, MetricsError, METRICS_FILE};
pub use records::{
    DatasetId, DatasetRecord, ModelId, ModelRecord, ModelVersionId, ModelVersionRecord,
    NewModelVersion, RuntimeId, RuntimeRecord, ScriptId, ScriptRecord,
};
pub use slug::model_dir_name;
pub use storage_path::{StoragePath, StoragePathError};
