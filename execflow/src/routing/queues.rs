//! Worker pools and the queues they consume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ConfigError, ValidationError};

/// Highest broker priority a queue may declare.
pub const MAX_QUEUE_PRIORITY: u8 = 9;

/// A pool of workers specialised for one kind of task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    /// General-purpose workflow tasks.
    General,
    /// API deployment executions.
    ApiDeployment,
    /// Per-file batch processing.
    FileProcessing,
    /// Batch completion callbacks.
    Callback,
    /// Webhook notifications.
    Notification,
    /// Log and event consumers.
    LogConsumer,
    /// Scheduled pipeline triggers.
    Scheduler,
}

impl WorkerType {
    /// Every worker type.
    pub const ALL: [Self; 7] = [
        Self::General,
        Self::ApiDeployment,
        Self::FileProcessing,
        Self::Callback,
        Self::Notification,
        Self::LogConsumer,
        Self::Scheduler,
    ];

    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ApiDeployment => "api_deployment",
            Self::FileProcessing => "file_processing",
            Self::Callback => "callback",
            Self::Notification => "notification",
            Self::LogConsumer => "log_consumer",
            Self::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(format!("unknown worker type '{s}'")).with_field("worker_type")
            })
    }
}

fn default_priority() -> u8 {
    5
}

fn default_concurrency() -> u32 {
    4
}

fn default_exchange() -> String {
    "celery".to_string()
}

/// A broker queue and the pool that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDefinition {
    /// Queue name.
    pub name: String,
    /// Pool consuming this queue.
    pub worker_type: WorkerType,
    /// Broker priority, 0 to [`MAX_QUEUE_PRIORITY`].
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Tasks a single worker runs at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Routing key. Defaults to the queue name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
    /// Broker exchange.
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

impl QueueDefinition {
    /// Creates a queue with default priority, concurrency and exchange.
    #[must_use]
    pub fn new(name: impl Into<String>, worker_type: WorkerType) -> Self {
        Self {
            name: name.into(),
            worker_type,
            priority: default_priority(),
            concurrency: default_concurrency(),
            routing_key: None,
            exchange: default_exchange(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets an explicit routing key.
    #[must_use]
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = Some(routing_key.into());
        self
    }

    /// Returns the effective routing key.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        self.routing_key.as_deref().unwrap_or(&self.name)
    }

    /// Rejects empty names, zero concurrency and out-of-range priorities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("queues.name", "must not be empty"));
        }
        let field = |f: &str| format!("queues.{}.{f}", self.name);
        if self.concurrency == 0 {
            return Err(ConfigError::invalid(field("concurrency"), "must be at least 1"));
        }
        if self.priority > MAX_QUEUE_PRIORITY {
            return Err(ConfigError::invalid(
                field("priority"),
                format!("must be at most {MAX_QUEUE_PRIORITY}, got {}", self.priority),
            ));
        }
        if self.exchange.trim().is_empty() {
            return Err(ConfigError::invalid(field("exchange"), "must not be empty"));
        }
        Ok(())
    }
}
