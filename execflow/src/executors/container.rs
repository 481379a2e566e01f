//! Running sandboxed tools through a container runtime.
//!
//! The runtime itself is external; [`ContainerClient`] is the seam. A tool
//! reports back by printing JSON lines on stdout:
//!
//! ```text
//! {"type": "LOG", "level": "INFO", "log": "reading page 3"}
//! {"type": "RESULT", "result": {"output": "..."}}
//! {"type": "ERROR", "error": "unsupported file type"}
//! ```

use anyhow::Context as _;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Executor;
use crate::context::ExecutionContext;
use crate::core::ExecutionResult;
use crate::errors::ContainerError;
use crate::retry::RetryPolicy;

/// Name the container executor registers under.
pub const TOOL_CONTAINER_EXECUTOR: &str = "tool_container";

/// Metadata key carrying the container name on results.
pub const CONTAINER_NAME_KEY: &str = "tool_container_name";

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRunConfig {
    /// Image name.
    pub image: String,
    /// Image tag.
    pub tag: String,
    /// Name given to the container.
    pub container_name: String,
    /// Environment passed to the tool.
    pub env: HashMap<String, String>,
}

impl ContainerRunConfig {
    /// Returns `image:tag`.
    #[must_use]
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// A started container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Runtime ID.
    pub id: String,
    /// Container name.
    pub name: String,
}

/// Container runtime operations used by tool executors.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Starts a container.
    async fn run(&self, config: &ContainerRunConfig) -> Result<ContainerHandle, ContainerError>;

    /// Streams stdout lines until the container exits.
    async fn stream_logs(
        &self,
        handle: &ContainerHandle,
    ) -> Result<BoxStream<'static, Result<String, ContainerError>>, ContainerError>;

    /// Removes the container.
    async fn cleanup(&self, handle: &ContainerHandle) -> Result<(), ContainerError>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum ToolMessage {
    Log {
        #[serde(default)]
        level: String,
        #[serde(default)]
        log: String,
    },
    Result {
        result: serde_json::Value,
    },
    Error {
        error: String,
    },
}

/// Runs `executor_params.image` (with optional `tag` and `env`) in a
/// container and turns its output into a result.
///
/// The container is always cleaned up, whatever the outcome.
pub struct ToolContainerExecutor {
    client: Arc<dyn ContainerClient>,
    retry: Option<RetryPolicy>,
}

impl std::fmt::Debug for ToolContainerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContainerExecutor")
            .field("retry", &self.retry.as_ref().map(RetryPolicy::name))
            .finish_non_exhaustive()
    }
}

impl ToolContainerExecutor {
    /// Creates an executor over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ContainerClient>) -> Self {
        Self {
            client,
            retry: None,
        }
    }

    /// Retries container start-up under `policy`.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    fn run_config(context: &ExecutionContext) -> anyhow::Result<ContainerRunConfig> {
        let image = context
            .param_str("image")
            .filter(|image| !image.trim().is_empty())
            .context("executor_params.image is required")?;
        let tag = context.param_str("tag").unwrap_or("latest");

        let mut env: HashMap<String, String> = match context.param("env") {
            Some(serde_json::Value::Object(vars)) => vars
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
            Some(other) => anyhow::bail!("executor_params.env must be an object, got {other}"),
            None => HashMap::new(),
        };
        env.insert("EXECUTION_RUN_ID".to_string(), context.run_id.clone());
        env.insert(
            "ORGANIZATION_ID".to_string(),
            context.organization_id.clone(),
        );

        Ok(ContainerRunConfig {
            image: image.to_string(),
            tag: tag.to_string(),
            container_name: format!("tool-{}", Uuid::new_v4().simple()),
            env,
        })
    }

    async fn start(&self, config: &ContainerRunConfig) -> Result<ContainerHandle, ContainerError> {
        match &self.retry {
            Some(policy) => policy.call(|| self.client.run(config)).await,
            None => self.client.run(config).await,
        }
    }

    async fn collect_output(&self, handle: &ContainerHandle) -> anyhow::Result<ExecutionResult> {
        let mut lines = self.client.stream_logs(handle).await?;
        let mut result = None;
        let mut error = None;

        while let Some(line) = lines.next().await {
            let line = line?;
            match serde_json::from_str::<ToolMessage>(&line) {
                Ok(ToolMessage::Result { result: value }) => result = Some(value),
                Ok(ToolMessage::Error { error: message }) => error = Some(message),
                Ok(ToolMessage::Log { level, log }) => {
                    debug!(container = %handle.name, level = %level, "{log}");
                }
                Err(_) => debug!(container = %handle.name, "{line}"),
            }
        }

        if let Some(message) = error {
            return Ok(ExecutionResult::failure(message));
        }
        match result {
            Some(serde_json::Value::Object(data)) => {
                Ok(ExecutionResult::ok(data.into_iter().collect()))
            }
            Some(value) => Ok(ExecutionResult::ok_value("output", value)),
            None => anyhow::bail!("tool container {} exited without a result", handle.name),
        }
    }
}

#[async_trait]
impl Executor for ToolContainerExecutor {
    fn name(&self) -> &str {
        TOOL_CONTAINER_EXECUTOR
    }

    async fn execute(&self, context: &ExecutionContext) -> anyhow::Result<ExecutionResult> {
        let config = Self::run_config(context)?;
        info!(
            image = %config.image_ref(),
            container = %config.container_name,
            run_id = %context.run_id,
            "Starting tool container"
        );
        let handle = self
            .start(&config)
            .await
            .with_context(|| format!("starting {}", config.image_ref()))?;

        let outcome = self.collect_output(&handle).await;
        if let Err(err) = self.client.cleanup(&handle).await {
            warn!(container = %handle.name, error = %err, "Container cleanup failed");
        }

        Ok(outcome?.add_metadata(CONTAINER_NAME_KEY, serde_json::json!(handle.name)))
    }
}
