//! Testing utilities for executors and file tracking.
//!
//! This module provides:
//! - Mock executors (counting, failing, panicking)
//! - Context and tracker fixtures
//! - Assertions for results and tracker records

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_history, assert_result_error_contains, assert_stage};
pub use fixtures::{context, file_ids, in_memory_tracker};
pub use mocks::{FailingExecutor, MockExecutor, PanickingExecutor};
