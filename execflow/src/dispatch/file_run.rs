//! Drives one file through its pipeline stages.

use std::time::Duration;
use tracing::{info, warn, Instrument};

use crate::context::ExecutionContext;
use crate::core::{ExecutionResult, FileExecutionStage};
use crate::errors::ExecflowError;
use crate::executors::{ExecutionOrchestrator, CONTAINER_NAME_KEY};
use crate::observability::file_span;
use crate::tracker::{FileExecutionStageData, FileExecutionStatusTracker};

use FileExecutionStage::{Completed, Finalization, Initialization, ToolExecution};

/// Runs a context for one file, reporting every stage to the tracker.
///
/// Executor failures come back as failed results with the tool stage
/// marked `FAILED`. Tracker failures are infrastructure failures and are
/// returned as errors.
#[derive(Debug, Clone)]
pub struct FileRun {
    tracker: FileExecutionStatusTracker,
    orchestrator: ExecutionOrchestrator,
    ttl: Option<Duration>,
    delete_on_completion: bool,
}

impl FileRun {
    /// Creates a runner.
    #[must_use]
    pub fn new(tracker: FileExecutionStatusTracker, orchestrator: ExecutionOrchestrator) -> Self {
        Self {
            tracker,
            orchestrator,
            ttl: None,
            delete_on_completion: false,
        }
    }

    /// Overrides the tracker TTL for records written by this runner.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Deletes the record once the file reaches `COMPLETED`.
    #[must_use]
    pub fn with_delete_on_completion(mut self, delete: bool) -> Self {
        self.delete_on_completion = delete;
        self
    }

    async fn mark(
        &self,
        ids: (&str, &str),
        data: FileExecutionStageData,
    ) -> Result<(), ExecflowError> {
        self.tracker
            .update_stage_status(ids.0, ids.1, data, self.ttl)
            .await
            .map(|_| ())
    }

    /// Runs `context` for one file.
    pub async fn run(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        context: &ExecutionContext,
    ) -> Result<ExecutionResult, ExecflowError> {
        self.run_stages(execution_id, file_execution_id, context)
            .instrument(file_span(execution_id, file_execution_id))
            .await
    }

    async fn run_stages(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        context: &ExecutionContext,
    ) -> Result<ExecutionResult, ExecflowError> {
        let ids = (execution_id, file_execution_id);

        self.mark(ids, FileExecutionStageData::in_progress(Initialization))
            .await?;
        self.tracker
            .update_organization_id(
                execution_id,
                file_execution_id,
                &context.organization_id,
                self.ttl,
            )
            .await?;
        if let Err(err) = context.validate() {
            let message = format!("Invalid execution context: {}", err.message);
            self.mark(ids, FileExecutionStageData::failed(Initialization, &message))
                .await?;
            return Ok(ExecutionResult::failure(message));
        }
        self.mark(ids, FileExecutionStageData::success(Initialization))
            .await?;

        self.mark(ids, FileExecutionStageData::in_progress(ToolExecution))
            .await?;
        let result = self.orchestrator.execute(context).await;
        if let Some(name) = result
            .metadata_value(CONTAINER_NAME_KEY)
            .and_then(serde_json::Value::as_str)
        {
            self.tracker
                .update_tool_container_name(execution_id, file_execution_id, name, self.ttl)
                .await?;
        }
        if result.is_failure() {
            let error = result.error().unwrap_or_default().to_string();
            warn!(
                execution_id,
                file_execution_id,
                error = %error,
                "Tool execution failed"
            );
            self.mark(ids, FileExecutionStageData::failed(ToolExecution, error))
                .await?;
            return Ok(result);
        }
        self.mark(ids, FileExecutionStageData::success(ToolExecution))
            .await?;

        self.mark(ids, FileExecutionStageData::in_progress(Finalization))
            .await?;
        self.mark(ids, FileExecutionStageData::success(Finalization))
            .await?;
        self.mark(ids, FileExecutionStageData::success(Completed))
            .await?;
        info!(execution_id, file_execution_id, "File execution completed");

        if self.delete_on_completion {
            self.tracker
                .delete_data(execution_id, file_execution_id)
                .await?;
        }
        Ok(result)
    }
}
