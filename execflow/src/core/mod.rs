//! Core domain model types for execflow.
//!
//! This module contains the value types shared by every component:
//! - File execution stage and stage-status enums
//! - The execution result returned by executors

mod result;
mod status;

pub use result::ExecutionResult;
pub use status::{FileExecutionStage, FileExecutionStageStatus};
