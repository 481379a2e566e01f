//! Execution context: the serializable description of one unit of work.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{ExecflowError, ValidationError};

/// Where a unit of work originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionSource {
    /// Interactive runs from the prompt studio.
    Ide,
    /// Deployed tool / workflow runs.
    Tool,
}

impl ExecutionSource {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ide => "ide",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for ExecutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ide" => Ok(Self::Ide),
            "tool" => Ok(Self::Tool),
            other => Err(ValidationError::new(format!(
                "execution_source must be 'ide' or 'tool', got '{other}'"
            ))
            .with_field("execution_source")),
        }
    }
}

/// Describes what to run: which executor, which operation, on whose behalf.
///
/// Contexts are immutable and cross process boundaries as flat JSON maps
/// (see [`to_map`](Self::to_map) / [`from_map`](Self::from_map)).
/// `executor_params` is an opaque bag so executors can carry
/// forward-compatible extra fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Registered name of the executor to dispatch to.
    pub executor_name: String,
    /// Operation the executor should perform.
    pub operation: String,
    /// Run identifier.
    pub run_id: String,
    /// Origin of the request (`ide` or `tool`).
    pub execution_source: String,
    /// Owning organization.
    pub organization_id: String,
    /// Request correlation ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Executor-specific parameters.
    #[serde(default)]
    pub executor_params: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// Creates a new context with no request ID and no parameters.
    #[must_use]
    pub fn new(
        executor_name: impl Into<String>,
        operation: impl Into<String>,
        run_id: impl Into<String>,
        execution_source: ExecutionSource,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            executor_name: executor_name.into(),
            operation: operation.into(),
            run_id: run_id.into(),
            execution_source: execution_source.as_str().to_string(),
            organization_id: organization_id.into(),
            request_id: None,
            executor_params: HashMap::new(),
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Replaces the executor parameters.
    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, serde_json::Value>) -> Self {
        self.executor_params = params;
        self
    }

    /// Adds a single executor parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.executor_params.insert(key.into(), value);
        self
    }

    /// Gets an executor parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.executor_params.get(key)
    }

    /// Gets an executor parameter as a string.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(serde_json::Value::as_str)
    }

    /// Returns the parsed execution source, if recognised.
    #[must_use]
    pub fn source(&self) -> Option<ExecutionSource> {
        self.execution_source.parse().ok()
    }

    /// Checks that all required fields are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("executor_name", &self.executor_name),
            ("operation", &self.operation),
            ("run_id", &self.run_id),
            ("execution_source", &self.execution_source),
            ("organization_id", &self.organization_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::empty_field(field));
            }
        }
        self.execution_source.parse::<ExecutionSource>()?;
        Ok(())
    }

    /// Converts the context to a flat JSON map.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Rebuilds a context from a map produced by [`to_map`](Self::to_map).
    ///
    /// Only the shape is checked here; call [`validate`](Self::validate)
    /// for field contents.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, ExecflowError> {
        serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
            ValidationError::new(format!("invalid execution context: {e}")).into()
        })
    }
}
