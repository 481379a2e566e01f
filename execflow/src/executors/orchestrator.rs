//! The failure boundary between executor code and the dispatch layer.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

use super::ExecutorRegistry;
use crate::context::ExecutionContext;
use crate::core::ExecutionResult;
use crate::observability::execution_span;

/// Resolves contexts to executors and normalizes every outcome into an
/// [`ExecutionResult`].
///
/// [`execute`](Self::execute) never fails: malformed contexts, unknown
/// executors, executor errors and executor panics all come back as
/// failed results.
#[derive(Debug, Clone)]
pub struct ExecutionOrchestrator {
    registry: Arc<ExecutorRegistry>,
}

impl ExecutionOrchestrator {
    /// Creates an orchestrator over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Runs `context` on its executor.
    pub async fn execute(&self, context: &ExecutionContext) -> ExecutionResult {
        if let Err(err) = context.validate() {
            warn!(
                executor = %context.executor_name,
                run_id = %context.run_id,
                error = %err,
                "Rejected malformed execution context"
            );
            return ExecutionResult::failure(format!("Invalid execution context: {}", err.message));
        }

        let name = context.executor_name.as_str();
        let executor = match std::panic::catch_unwind(AssertUnwindSafe(|| self.registry.get(name))) {
            Ok(Some(executor)) => executor,
            Ok(None) => {
                error!(
                    executor = name,
                    available = ?self.registry.names(),
                    "No executor registered"
                );
                return ExecutionResult::failure(format!("No executor registered for '{name}'"));
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(executor = name, panic = %message, "Executor factory panicked");
                return ExecutionResult::failure(format!(
                    "Failed to create executor '{name}': {message}"
                ));
            }
        };

        info!(
            executor = name,
            operation = %context.operation,
            run_id = %context.run_id,
            "Executing"
        );
        let started = Instant::now();
        let outcome = AssertUnwindSafe(
            executor
                .execute(context)
                .instrument(execution_span(context)),
        )
        .catch_unwind()
        .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Ok(result)) => {
                info!(
                    executor = name,
                    operation = %context.operation,
                    run_id = %context.run_id,
                    success = result.is_success(),
                    elapsed_ms,
                    "Execution finished"
                );
                result
            }
            Ok(Err(err)) => {
                let message = format!("{err:#}");
                warn!(
                    executor = name,
                    operation = %context.operation,
                    run_id = %context.run_id,
                    elapsed_ms,
                    error = %message,
                    "Executor failed"
                );
                ExecutionResult::failure(message)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    executor = name,
                    operation = %context.operation,
                    run_id = %context.run_id,
                    elapsed_ms,
                    panic = %message,
                    "Executor panicked"
                );
                ExecutionResult::failure(format!("Executor '{name}' panicked: {message}"))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
