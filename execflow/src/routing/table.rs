//! The routing table: queues, task routes and scaling policies.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{QueueDefinition, ScalingPolicy, WorkerType};
use crate::errors::ConfigError;

fn default_queue_name() -> String {
    "celery".to_string()
}

/// Static routing and scaling configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Queue for tasks without an explicit route.
    #[serde(default = "default_queue_name")]
    pub default_queue: String,
    /// Every known queue.
    pub queues: Vec<QueueDefinition>,
    /// Task name to queue name.
    #[serde(default)]
    pub task_routes: HashMap<String, String>,
    /// Scaling policy per pool.
    #[serde(default)]
    pub scaling: HashMap<WorkerType, ScalingPolicy>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoutingConfig {
    /// The table shipped with the workers.
    #[must_use]
    pub fn builtin() -> Self {
        use WorkerType::{
            ApiDeployment, Callback, FileProcessing, General, LogConsumer, Notification, Scheduler,
        };

        let queues = vec![
            QueueDefinition::new("celery", General),
            QueueDefinition::new("celery_api_deployments", ApiDeployment).with_priority(7),
            QueueDefinition::new("file_processing", FileProcessing).with_concurrency(2),
            QueueDefinition::new("api_file_processing", FileProcessing)
                .with_concurrency(2)
                .with_priority(7),
            QueueDefinition::new("file_processing_callback", Callback),
            QueueDefinition::new("api_file_processing_callback", Callback).with_priority(7),
            QueueDefinition::new("notifications", Notification).with_concurrency(8),
            QueueDefinition::new("celery_log_task_queue", LogConsumer)
                .with_priority(2)
                .with_concurrency(8),
            QueueDefinition::new("scheduler", Scheduler).with_concurrency(1),
        ];

        let task_routes = [
            ("async_execute_bin_general", "celery"),
            ("async_execute_bin", "celery_api_deployments"),
            ("async_execute_bin_api", "celery_api_deployments"),
            ("process_file_batch", "file_processing"),
            ("process_file_batch_api", "api_file_processing"),
            ("process_batch_callback", "file_processing_callback"),
            ("process_batch_callback_api", "api_file_processing_callback"),
            ("send_webhook_notification", "notifications"),
            ("logs_consumer", "celery_log_task_queue"),
            ("execute_pipeline_task", "scheduler"),
        ]
        .into_iter()
        .map(|(task, queue)| (task.to_string(), queue.to_string()))
        .collect();

        let scaling = [
            (General, ScalingPolicy::new(1, 10)),
            (
                ApiDeployment,
                ScalingPolicy::new(2, 20).with_thresholds(20, 2).with_steps(2, 1),
            ),
            (
                FileProcessing,
                ScalingPolicy::new(2, 30)
                    .with_thresholds(100, 10)
                    .with_steps(5, 2),
            ),
            (Callback, ScalingPolicy::new(1, 10)),
            (Notification, ScalingPolicy::new(1, 5)),
            (LogConsumer, ScalingPolicy::new(1, 4).with_thresholds(500, 50)),
            (Scheduler, ScalingPolicy::new(1, 2)),
        ]
        .into_iter()
        .collect();

        Self {
            default_queue: default_queue_name(),
            queues,
            task_routes,
            scaling,
        }
    }

    /// Parses a JSON routing document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::parse("routing", "<document>", e.to_string()))
    }

    /// Reads a JSON routing document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|e| {
            ConfigError::parse("routing", path.display().to_string(), e.to_string())
        })
    }

    /// Checks the table is self-consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.is_empty() {
            return Err(ConfigError::invalid("queues", "at least one queue is required"));
        }

        let mut names = HashSet::new();
        for queue in &self.queues {
            queue.validate()?;
            if !names.insert(queue.name.as_str()) {
                return Err(ConfigError::invalid(
                    "queues",
                    format!("duplicate queue '{}'", queue.name),
                ));
            }
        }

        if !names.contains(self.default_queue.as_str()) {
            return Err(ConfigError::invalid(
                "default_queue",
                format!("unknown queue '{}'", self.default_queue),
            ));
        }

        for (task, queue) in &self.task_routes {
            if !names.contains(queue.as_str()) {
                return Err(ConfigError::invalid(
                    format!("task_routes.{task}"),
                    format!("unknown queue '{queue}'"),
                ));
            }
        }

        for (worker_type, policy) in &self.scaling {
            policy.validate().map_err(|err| match err {
                ConfigError::Invalid { field, message } => {
                    ConfigError::invalid(format!("scaling.{worker_type}.{field}"), message)
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
