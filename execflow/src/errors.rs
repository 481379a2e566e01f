//! Error types for execflow.
//!
//! Infrastructure failures (`StoreError`, `ConfigError`) propagate to the
//! caller. Business failures raised by executors never appear here; the
//! orchestrator turns them into failed `ExecutionResult`s.

use crate::core::FileExecutionStage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for execflow operations.
#[derive(Debug, Error)]
pub enum ExecflowError {
    /// Malformed input to the tracker or an execution context.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A non-monotonic stage move was attempted.
    #[error("{0}")]
    StageTransition(#[from] StageTransitionError),

    /// A record expected to exist was absent.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The shared store failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Static configuration was invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ExecflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl ExecflowError {
    /// Returns a stable short code for logs and result metadata.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::StageTransition(_) => "stage_transition",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Returns true for failures of the coordination substrate itself.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Error raised when input is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The offending field, if known.
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a "must not be empty" error for a field.
    #[must_use]
    pub fn empty_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} must not be empty"),
            field: Some(field),
        }
    }

    /// Sets the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Error raised when a stage update would move a file backwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Invalid stage transition for {execution_id}/{file_execution_id}: \
     {current} -> {attempted} (stages only move forward)"
)]
pub struct StageTransitionError {
    /// The execution ID.
    pub execution_id: String,
    /// The file execution ID.
    pub file_execution_id: String,
    /// The stage currently recorded.
    pub current: FileExecutionStage,
    /// The stage the caller attempted to move to.
    pub attempted: FileExecutionStage,
}

impl StageTransitionError {
    /// Creates a new stage transition error.
    #[must_use]
    pub fn new(
        execution_id: impl Into<String>,
        file_execution_id: impl Into<String>,
        current: FileExecutionStage,
        attempted: FileExecutionStage,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            file_execution_id: file_execution_id.into(),
            current,
            attempted,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("StageTransitionError"));
        map.insert("execution_id".to_string(), serde_json::json!(self.execution_id));
        map.insert(
            "file_execution_id".to_string(),
            serde_json::json!(self.file_execution_id),
        );
        map.insert("current".to_string(), serde_json::json!(self.current.as_str()));
        map.insert("attempted".to_string(), serde_json::json!(self.attempted.as_str()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a record is absent on update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Record not found: {key}")]
pub struct NotFoundError {
    /// The store key that was looked up.
    pub key: String,
}

impl NotFoundError {
    /// Creates a new not found error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Failures of the shared key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or rejected the command.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Details from the backend.
        message: String,
    },

    /// A stored field could not be decoded.
    #[error("Corrupt field '{field}' in {key}: {message}")]
    Corrupt {
        /// The store key.
        key: String,
        /// The field that failed to decode.
        field: String,
        /// The decode failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a corrupt field error.
    #[must_use]
    pub fn corrupt(
        key: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Corrupt {
            key: key.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors in static configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value was present but out of range or inconsistent.
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid {
        /// The configuration field.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    /// A textual value could not be parsed.
    #[error("Cannot parse {key}={value:?}: {message}")]
    Parse {
        /// The variable or key name.
        key: String,
        /// The raw value.
        value: String,
        /// The parse failure.
        message: String,
    },

    /// A configuration file could not be read.
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Network-level failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionFailure {
    /// The peer refused the connection.
    Refused,
    /// The connection was reset or aborted.
    Reset,
    /// Connecting or reading timed out.
    Timeout,
    /// The host or network was unreachable.
    Unreachable,
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused => write!(f, "connection refused"),
            Self::Reset => write!(f, "connection reset"),
            Self::Timeout => write!(f, "timed out"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Failures of calls to external services.
///
/// These are what the retry engine classifies; see
/// [`TransientError`](crate::retry::TransientError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A network-level failure before a response was received.
    #[error("{service}: {kind}: {message}")]
    Connection {
        /// The target service.
        service: String,
        /// The failure kind.
        kind: ConnectionFailure,
        /// Details.
        message: String,
    },

    /// The service answered with an error status.
    #[error("{service}: HTTP {status}: {message}")]
    Http {
        /// The target service.
        service: String,
        /// The HTTP status code.
        status: u16,
        /// Details.
        message: String,
    },

    /// Any other failure.
    #[error("{service}: {message}")]
    Other {
        /// The target service.
        service: String,
        /// Details.
        message: String,
    },
}

impl ServiceError {
    /// Creates a connection failure.
    #[must_use]
    pub fn connection(
        service: impl Into<String>,
        kind: ConnectionFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Connection {
            service: service.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates an HTTP status failure.
    #[must_use]
    pub fn http(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates an unclassified failure.
    #[must_use]
    pub fn other(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns the target service name.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Connection { service, .. }
            | Self::Http { service, .. }
            | Self::Other { service, .. } => service,
        }
    }
}

/// Failures talking to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The runtime could not be reached.
    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    /// The container could not be started.
    #[error("Failed to start container: {0}")]
    Start(String),

    /// Reading container logs failed.
    #[error("Failed to read container logs: {0}")]
    Logs(String),

    /// Removing the container failed.
    #[error("Failed to clean up container: {0}")]
    Cleanup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_empty_field() {
        let err = ValidationError::empty_field("execution_id");
        assert_eq!(err.field.as_deref(), Some("execution_id"));
        assert!(err.to_string().contains("execution_id must not be empty"));
    }

    #[test]
    fn test_stage_transition_error_message() {
        let err = StageTransitionError::new(
            "e1",
            "f1",
            FileExecutionStage::ToolExecution,
            FileExecutionStage::Initialization,
        );
        let message = err.to_string();
        assert!(message.contains("TOOL_EXECUTION -> INITIALIZATION"));

        let dict = err.to_dict();
        assert_eq!(dict.get("current").unwrap(), "TOOL_EXECUTION");
        assert_eq!(dict.get("attempted").unwrap(), "INITIALIZATION");
    }

    #[test]
    fn test_error_codes() {
        let err: ExecflowError = NotFoundError::new("k").into();
        assert_eq!(err.code(), "not_found");
        assert!(!err.is_infrastructure());

        let err: ExecflowError = StoreError::unavailable("down").into();
        assert_eq!(err.code(), "store");
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::connection("platform", ConnectionFailure::Refused, "port 8000");
        assert_eq!(err.to_string(), "platform: connection refused: port 8000");
        assert_eq!(err.service(), "platform");

        let err = ServiceError::http("prompt", 503, "overloaded");
        assert_eq!(err.to_string(), "prompt: HTTP 503: overloaded");
    }
}
