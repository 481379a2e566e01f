//! # Execflow
//!
//! File-execution tracking and executor dispatch for distributed document
//! processing workers.
//!
//! Execflow provides:
//!
//! - **Retry policies**: Named, validated exponential backoff with jitter and a time budget
//! - **Executor dispatch**: An explicit registry and an orchestrator that turns every failure into a result
//! - **Status tracking**: A monotonic per-file stage machine stored in a shared hash store with TTL
//! - **Queue routing**: Task-to-queue routes and worker pool scaling bounds
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use execflow::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ExecutorRegistry::new());
//! registry.register_instance(Arc::new(MyExecutor::new()));
//!
//! let tracker = FileExecutionStatusTracker::new(Arc::new(InMemoryHashStore::new()));
//! let run = FileRun::new(tracker, ExecutionOrchestrator::new(registry));
//!
//! let result = run.run("exec-1", "file-1", &context).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod dispatch;
pub mod errors;
pub mod executors;
pub mod observability;
pub mod retry;
pub mod routing;
pub mod testing;
pub mod tracker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogSettings, Settings};
    pub use crate::context::{ExecutionContext, ExecutionSource};
    pub use crate::core::{ExecutionResult, FileExecutionStage, FileExecutionStageStatus};
    pub use crate::dispatch::{FileRun, TaskHandler};
    pub use crate::errors::{
        ConfigError, ContainerError, ExecflowError, NotFoundError, ServiceError,
        StageTransitionError, StoreError, ValidationError,
    };
    pub use crate::executors::{
        ExecutionOrchestrator, Executor, ExecutorRegistry, FnExecutor, ToolContainerExecutor,
    };
    pub use crate::observability::init_logging;
    pub use crate::retry::{RetryPolicies, RetryPolicy, RetryPolicyConfig, TransientError};
    pub use crate::routing::{QueueRouter, RoutingConfig, ScalingPolicy, WorkerType};
    pub use crate::tracker::{
        FileExecutionData, FileExecutionStageData, FileExecutionStatusTracker, HashStore,
        InMemoryHashStore,
    };
}

pub use errors::ExecflowError;
