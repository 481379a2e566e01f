//! Execution result value object.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{ExecflowError, ValidationError};

/// The outcome of running an executor.
///
/// `ExecutionResult` is immutable once created and `error` is set iff
/// `success` is false. Fields are private so the factory methods are the
/// only way to build one; deserialization applies the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResultFields")]
pub struct ExecutionResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<HashMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Wire shape, checked before it becomes an [`ExecutionResult`].
#[derive(Deserialize)]
struct ResultFields {
    success: bool,
    #[serde(default)]
    data: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, serde_json::Value>>,
}

impl TryFrom<ResultFields> for ExecutionResult {
    type Error = ValidationError;

    fn try_from(fields: ResultFields) -> Result<Self, Self::Error> {
        match (fields.success, &fields.error) {
            (true, Some(_)) => Err(ValidationError::new(
                "a successful result must not carry an error",
            )
            .with_field("error")),
            (false, None) => Err(ValidationError::new("a failed result must carry an error")
                .with_field("error")),
            _ => Ok(Self {
                success: fields.success,
                data: fields.data,
                error: fields.error,
                metadata: fields.metadata,
            }),
        }
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::ok_empty()
    }
}

impl ExecutionResult {
    /// Creates a successful result with data.
    #[must_use]
    pub fn ok(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    /// Creates a successful result with no data.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            metadata: None,
        }
    }

    /// Creates a successful result with a single value.
    #[must_use]
    pub fn ok_value(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), value);
        Self::ok(data)
    }

    /// Creates a failure result with an error message.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// Output data, for successful executions.
    #[must_use]
    pub fn data(&self) -> Option<&HashMap<String, serde_json::Value>> {
        self.data.as_ref()
    }

    /// Error message, for failed executions.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Additional metadata.
    #[must_use]
    pub fn metadata(&self) -> Option<&HashMap<String, serde_json::Value>> {
        self.metadata.as_ref()
    }

    /// Returns true if the result indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns true if the result indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success
    }

    /// Gets a value from the data.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }

    /// Gets a value from the metadata.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// Converts the result to a flat JSON map for crossing a queue boundary.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Rebuilds a result from a map produced by [`to_map`](Self::to_map).
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, ExecflowError> {
        serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
            ValidationError::new(format!("invalid execution result: {e}")).into()
        })
    }
}
