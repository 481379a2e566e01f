//! The executor capability and a closure adapter.

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

use crate::context::ExecutionContext;
use crate::core::ExecutionResult;

/// A named processing strategy.
///
/// Returning `Err` (or panicking) is a business failure: the orchestrator
/// turns it into a failed [`ExecutionResult`] so callers never see it as an
/// error.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Returns the name the executor registers under.
    fn name(&self) -> &str;

    /// Runs the unit of work described by `context`.
    async fn execute(&self, context: &ExecutionContext) -> anyhow::Result<ExecutionResult>;
}

/// An executor backed by an async closure.
pub struct FnExecutor<F, Fut>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnExecutor<F, Fut>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
{
    /// Creates a new closure-backed executor.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for FnExecutor<F, Fut>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F, Fut>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, context: &ExecutionContext) -> anyhow::Result<ExecutionResult> {
        (self.func)(context.clone()).await
    }
}
