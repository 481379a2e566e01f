//! Execution context for dispatching work to executors.

mod execution;

pub use execution::{ExecutionContext, ExecutionSource};
