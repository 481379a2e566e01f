//! Read-only lookups over a validated [`RoutingConfig`].

use tracing::debug;

use super::{QueueDefinition, RoutingConfig, ScalingPolicy, WorkerType};
use crate::errors::ConfigError;

/// Answers "which queue" and "how many workers" questions.
#[derive(Debug, Clone)]
pub struct QueueRouter {
    config: RoutingConfig,
}

impl QueueRouter {
    /// Validates `config` and wraps it.
    pub fn new(config: RoutingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// A router over the built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            config: RoutingConfig::builtin(),
        }
    }

    /// Returns the underlying table.
    #[must_use]
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Returns the queue for a task, or the default queue if the task has
    /// no route.
    #[must_use]
    pub fn route_for_task(&self, task_name: &str) -> &str {
        match self.config.task_routes.get(task_name) {
            Some(queue) => queue,
            None => {
                debug!(task = task_name, queue = %self.config.default_queue, "No route for task, using default queue");
                &self.config.default_queue
            }
        }
    }

    /// Returns the queues consumed by a pool, in declaration order.
    #[must_use]
    pub fn queues_for_worker_type(&self, worker_type: WorkerType) -> Vec<&str> {
        self.config
            .queues
            .iter()
            .filter(|q| q.worker_type == worker_type)
            .map(|q| q.name.as_str())
            .collect()
    }

    /// Returns the scaling policy of a pool.
    #[must_use]
    pub fn scaling_config_for(&self, worker_type: WorkerType) -> Option<&ScalingPolicy> {
        self.config.scaling.get(&worker_type)
    }

    /// Looks up a queue by name.
    #[must_use]
    pub fn queue(&self, name: &str) -> Option<&QueueDefinition> {
        self.config.queues.iter().find(|q| q.name == name)
    }
}

impl Default for QueueRouter {
    fn default() -> Self {
        Self::builtin()
    }
}
