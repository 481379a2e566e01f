//! Mock executors for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::ExecutionContext;
use crate::core::ExecutionResult;
use crate::executors::Executor;

/// An executor that counts calls and returns a fixed result.
#[derive(Debug)]
pub struct MockExecutor {
    name: String,
    result: ExecutionResult,
    calls: AtomicUsize,
}

impl MockExecutor {
    /// Creates a mock returning `result`.
    #[must_use]
    pub fn new(name: impl Into<String>, result: ExecutionResult) -> Self {
        Self {
            name: name.into(),
            result,
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a mock returning an empty success.
    #[must_use]
    pub fn succeeding(name: impl Into<String>) -> Self {
        Self::new(name, ExecutionResult::ok_empty())
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _context: &ExecutionContext) -> anyhow::Result<ExecutionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// An executor that always returns an error.
#[derive(Debug)]
pub struct FailingExecutor {
    name: String,
    error: String,
}

impl FailingExecutor {
    /// Creates a failing executor.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

#[async_trait]
impl Executor for FailingExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _context: &ExecutionContext) -> anyhow::Result<ExecutionResult> {
        anyhow::bail!("{}", self.error)
    }
}

/// An executor that panics.
#[derive(Debug)]
pub struct PanickingExecutor {
    name: String,
    message: String,
}

impl PanickingExecutor {
    /// Creates a panicking executor.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Executor for PanickingExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _context: &ExecutionContext) -> anyhow::Result<ExecutionResult> {
        panic!("{}", self.message)
    }
}
