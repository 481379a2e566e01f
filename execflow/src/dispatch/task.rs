//! The worker-side task body.

use serde_json::{Map, Value};
use tracing::warn;

use crate::context::ExecutionContext;
use crate::core::ExecutionResult;
use crate::executors::ExecutionOrchestrator;

/// Turns a delivered payload into a serialized result.
///
/// Payloads and results are flat JSON maps, so whatever delivers tasks
/// only ever moves plain data. A payload that does not decode into an
/// [`ExecutionContext`] becomes a failed result, not an error.
#[derive(Debug, Clone)]
pub struct TaskHandler {
    orchestrator: ExecutionOrchestrator,
}

impl TaskHandler {
    /// Creates a handler over `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: ExecutionOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Handles one payload.
    pub async fn handle(&self, payload: Map<String, Value>) -> Map<String, Value> {
        let context = match ExecutionContext::from_map(payload) {
            Ok(context) => context,
            Err(err) => {
                warn!(error = %err, "Discarding undecodable task payload");
                return ExecutionResult::failure(err.to_string()).to_map();
            }
        };
        self.orchestrator.execute(&context).await.to_map()
    }
}
