//! Stage data and the file execution aggregate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{FileExecutionStage, FileExecutionStageStatus};
use crate::errors::{StoreError, ValidationError};

/// Hash field names used for a stored record.
pub mod fields {
    /// The execution ID.
    pub const EXECUTION_ID: &str = "execution_id";
    /// The file execution ID.
    pub const FILE_EXECUTION_ID: &str = "file_execution_id";
    /// The owning organization.
    pub const ORGANIZATION_ID: &str = "organization_id";
    /// The container running the tool, if any.
    pub const TOOL_CONTAINER_NAME: &str = "tool_container_name";
    /// The current stage head, JSON encoded.
    pub const STAGE_STATUS: &str = "stage_status";
    /// Previous heads, JSON array, most recent first.
    pub const STATUS_HISTORY: &str = "status_history";
    /// The sticky error.
    pub const ERROR: &str = "error";
}

/// A stage with its status.
///
/// `error` is only ever present on a `FAILED` status. Deserialization
/// enforces this too, so a decoded value is always storable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StageFields")]
pub struct FileExecutionStageData {
    stage: FileExecutionStage,
    status: FileExecutionStageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StageFields {
    stage: FileExecutionStage,
    status: FileExecutionStageStatus,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<StageFields> for FileExecutionStageData {
    type Error = ValidationError;

    fn try_from(fields: StageFields) -> Result<Self, Self::Error> {
        Self::with_error(fields.stage, fields.status, fields.error)
    }
}

impl FileExecutionStageData {
    /// Creates stage data without an error.
    #[must_use]
    pub fn new(stage: FileExecutionStage, status: FileExecutionStageStatus) -> Self {
        Self {
            stage,
            status,
            error: None,
        }
    }

    /// Stage is running.
    #[must_use]
    pub fn in_progress(stage: FileExecutionStage) -> Self {
        Self::new(stage, FileExecutionStageStatus::InProgress)
    }

    /// Stage finished successfully.
    #[must_use]
    pub fn success(stage: FileExecutionStage) -> Self {
        Self::new(stage, FileExecutionStageStatus::Success)
    }

    /// Stage failed. An empty message is dropped.
    #[must_use]
    pub fn failed(stage: FileExecutionStage, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            stage,
            status: FileExecutionStageStatus::Failed,
            error: (!error.is_empty()).then_some(error),
        }
    }

    /// Creates stage data with an optional error, rejecting an error on a
    /// status other than `FAILED`.
    pub fn with_error(
        stage: FileExecutionStage,
        status: FileExecutionStageStatus,
        error: Option<String>,
    ) -> Result<Self, ValidationError> {
        let data = Self {
            stage,
            status,
            error: error.filter(|e| !e.is_empty()),
        };
        data.validate()?;
        Ok(data)
    }

    /// Checks that an error only accompanies a failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.error.is_some() && self.status != FileExecutionStageStatus::Failed {
            return Err(ValidationError::new(format!(
                "error is only allowed on a FAILED status, got {}",
                self.status
            ))
            .with_field("error"));
        }
        Ok(())
    }

    /// Returns the stage.
    #[must_use]
    pub fn stage(&self) -> FileExecutionStage {
        self.stage
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> FileExecutionStageStatus {
        self.status
    }

    /// Returns the error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Everything recorded about one file in one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExecutionData {
    /// The execution ID.
    pub execution_id: String,
    /// The file execution ID.
    pub file_execution_id: String,
    /// The owning organization.
    pub organization_id: String,
    /// The container running the tool, if any.
    pub tool_container_name: Option<String>,
    /// The current stage head.
    pub stage_status: FileExecutionStageData,
    /// Previous heads, most recent first.
    pub status_history: Vec<FileExecutionStageData>,
    /// The sticky error.
    pub error: Option<String>,
}

impl FileExecutionData {
    /// Creates a record with an empty history.
    #[must_use]
    pub fn new(
        execution_id: impl Into<String>,
        file_execution_id: impl Into<String>,
        organization_id: impl Into<String>,
        stage_status: FileExecutionStageData,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            file_execution_id: file_execution_id.into(),
            organization_id: organization_id.into(),
            tool_container_name: None,
            stage_status,
            status_history: Vec::new(),
            error: None,
        }
    }

    /// Sets the container name.
    #[must_use]
    pub fn with_tool_container_name(mut self, name: impl Into<String>) -> Self {
        self.tool_container_name = Some(name.into());
        self
    }

    /// Sets the history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<FileExecutionStageData>) -> Self {
        self.status_history = history;
        self
    }

    /// Sets the sticky error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Rejects empty identifiers.
    pub fn validate_ids(&self) -> Result<(), ValidationError> {
        validate_ids(&self.execution_id, &self.file_execution_id)
    }

    /// Builds the first record for a key from its first stage update.
    ///
    /// Values already left in `raw` by single-field writes are kept; a
    /// non-empty error on `head` wins over a stored one.
    pub(crate) fn bootstrap(
        execution_id: &str,
        file_execution_id: &str,
        head: FileExecutionStageData,
        raw: &HashMap<String, String>,
    ) -> Self {
        let error = head
            .error()
            .map(str::to_string)
            .or_else(|| non_empty(raw, fields::ERROR));
        Self {
            execution_id: execution_id.to_string(),
            file_execution_id: file_execution_id.to_string(),
            organization_id: non_empty(raw, fields::ORGANIZATION_ID).unwrap_or_default(),
            tool_container_name: non_empty(raw, fields::TOOL_CONTAINER_NAME),
            status_history: vec![head.clone()],
            stage_status: head,
            error,
        }
    }

    /// Encodes the record as hash fields. Absent optionals become empty
    /// strings.
    pub fn to_fields(&self) -> Result<HashMap<String, String>, serde_json::Error> {
        let mut out = HashMap::with_capacity(7);
        out.insert(fields::EXECUTION_ID.to_string(), self.execution_id.clone());
        out.insert(
            fields::FILE_EXECUTION_ID.to_string(),
            self.file_execution_id.clone(),
        );
        out.insert(
            fields::ORGANIZATION_ID.to_string(),
            self.organization_id.clone(),
        );
        out.insert(
            fields::TOOL_CONTAINER_NAME.to_string(),
            self.tool_container_name.clone().unwrap_or_default(),
        );
        out.insert(
            fields::STAGE_STATUS.to_string(),
            serde_json::to_string(&self.stage_status)?,
        );
        out.insert(
            fields::STATUS_HISTORY.to_string(),
            serde_json::to_string(&self.status_history)?,
        );
        out.insert(
            fields::ERROR.to_string(),
            self.error.clone().unwrap_or_default(),
        );
        Ok(out)
    }

    /// Decodes a record from hash fields.
    ///
    /// Returns `Ok(None)` when there is no stage head, which covers both a
    /// missing key and a record that only received single-field writes.
    pub fn from_fields(key: &str, raw: &HashMap<String, String>) -> Result<Option<Self>, StoreError> {
        let Some(head) = non_empty(raw, fields::STAGE_STATUS) else {
            return Ok(None);
        };
        let stage_status: FileExecutionStageData = serde_json::from_str(&head)
            .map_err(|e| StoreError::corrupt(key, fields::STAGE_STATUS, e.to_string()))?;

        let status_history: Vec<FileExecutionStageData> =
            match non_empty(raw, fields::STATUS_HISTORY) {
                Some(history) => serde_json::from_str(&history).map_err(|e| {
                    StoreError::corrupt(key, fields::STATUS_HISTORY, e.to_string())
                })?,
                None => Vec::new(),
            };

        Ok(Some(Self {
            execution_id: raw.get(fields::EXECUTION_ID).cloned().unwrap_or_default(),
            file_execution_id: raw
                .get(fields::FILE_EXECUTION_ID)
                .cloned()
                .unwrap_or_default(),
            organization_id: raw
                .get(fields::ORGANIZATION_ID)
                .cloned()
                .unwrap_or_default(),
            tool_container_name: non_empty(raw, fields::TOOL_CONTAINER_NAME),
            stage_status,
            status_history,
            error: non_empty(raw, fields::ERROR),
        }))
    }
}

pub(crate) fn validate_ids(execution_id: &str, file_execution_id: &str) -> Result<(), ValidationError> {
    if execution_id.trim().is_empty() {
        return Err(ValidationError::empty_field(fields::EXECUTION_ID));
    }
    if file_execution_id.trim().is_empty() {
        return Err(ValidationError::empty_field(fields::FILE_EXECUTION_ID));
    }
    Ok(())
}

fn non_empty(raw: &HashMap<String, String>, field: &str) -> Option<String> {
    raw.get(field).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_only_on_failed() {
        let err = FileExecutionStageData::with_error(
            FileExecutionStage::ToolExecution,
            FileExecutionStageStatus::Success,
            Some("boom".into()),
        )
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("error"));

        let ok = FileExecutionStageData::with_error(
            FileExecutionStage::ToolExecution,
            FileExecutionStageStatus::Failed,
            Some("boom".into()),
        )
        .unwrap();
        assert_eq!(ok.error(), Some("boom"));
    }

    #[test]
    fn test_empty_error_is_dropped() {
        let data = FileExecutionStageData::failed(FileExecutionStage::Finalization, "");
        assert_eq!(data.error(), None);
        assert_eq!(data.status(), FileExecutionStageStatus::Failed);
    }

    #[test]
    fn test_stage_data_wire_format() {
        let data = FileExecutionStageData::in_progress(FileExecutionStage::ToolExecution);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"stage":"TOOL_EXECUTION","status":"IN_PROGRESS"}"#);
    }

    #[test]
    fn test_fields_round_trip() {
        let data = FileExecutionData::new(
            "e1",
            "f1",
            "org",
            FileExecutionStageData::failed(FileExecutionStage::ToolExecution, "tool crashed"),
        )
        .with_history(vec![FileExecutionStageData::success(
            FileExecutionStage::Initialization,
        )])
        .with_tool_container_name("tool-abc")
        .with_error("tool crashed");

        let raw = data.to_fields().unwrap();
        assert_eq!(raw.get(fields::ERROR).unwrap(), "tool crashed");
        let decoded = FileExecutionData::from_fields("k", &raw).unwrap().unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_absent_optionals_encode_empty() {
        let data = FileExecutionData::new(
            "e1",
            "f1",
            "org",
            FileExecutionStageData::in_progress(FileExecutionStage::Initialization),
        );
        let raw = data.to_fields().unwrap();
        assert_eq!(raw.get(fields::TOOL_CONTAINER_NAME).unwrap(), "");
        let decoded = FileExecutionData::from_fields("k", &raw).unwrap().unwrap();
        assert_eq!(decoded.tool_container_name, None);
        assert_eq!(decoded.error, None);
    }

    #[test]
    fn test_missing_head_decodes_to_none() {
        let mut raw = HashMap::new();
        raw.insert(fields::TOOL_CONTAINER_NAME.to_string(), "tool-1".to_string());
        assert!(FileExecutionData::from_fields("k", &raw).unwrap().is_none());
        assert!(FileExecutionData::from_fields("k", &HashMap::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_corrupt_head() {
        let mut raw = HashMap::new();
        raw.insert(fields::STAGE_STATUS.to_string(), "{not json".to_string());
        let err = FileExecutionData::from_fields("k", &raw).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref field, .. } if field == "stage_status"));
    }

    #[test]
    fn test_validate_ids() {
        assert!(validate_ids("e1", "f1").is_ok());
        let err = validate_ids(" ", "f1").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("execution_id"));
        let err = validate_ids("e1", "").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("file_execution_id"));
    }

    #[test]
    fn test_decoding_rejects_error_on_running_stage() {
        let json = r#"{"stage":"INITIALIZATION","status":"IN_PROGRESS","error":"stale"}"#;
        assert!(serde_json::from_str::<FileExecutionStageData>(json).is_err());

        let json = r#"{"stage":"INITIALIZATION","status":"FAILED","error":"bad pdf"}"#;
        let data: FileExecutionStageData = serde_json::from_str(json).unwrap();
        assert_eq!(data.error(), Some("bad pdf"));
    }

    #[test]
    fn test_bootstrap_keeps_single_field_writes() {
        let mut raw = HashMap::new();
        raw.insert(fields::ORGANIZATION_ID.to_string(), "org-7".to_string());
        raw.insert(fields::ERROR.to_string(), "executor timed out".to_string());

        let head = FileExecutionStageData::in_progress(FileExecutionStage::Initialization);
        let data = FileExecutionData::bootstrap("e1", "f1", head.clone(), &raw);
        assert_eq!(data.organization_id, "org-7");
        assert_eq!(data.tool_container_name, None);
        assert_eq!(data.error.as_deref(), Some("executor timed out"));
        assert_eq!(data.status_history, vec![head]);

        let failed = FileExecutionStageData::failed(FileExecutionStage::Initialization, "no pages");
        let data = FileExecutionData::bootstrap("e1", "f1", failed, &raw);
        assert_eq!(data.error.as_deref(), Some("no pages"));
    }
}
