//! File execution stage and stage-status enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// One ordered phase of a file's processing pipeline.
///
/// The order is total and only used for monotonicity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileExecutionStage {
    /// File is being prepared.
    Initialization,
    /// The tool is running against the file.
    ToolExecution,
    /// Outputs are being written back.
    Finalization,
    /// Terminal stage.
    Completed,
}

impl FileExecutionStage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::Initialization,
        Self::ToolExecution,
        Self::Finalization,
        Self::Completed,
    ];

    /// Returns the position of the stage in the pipeline.
    #[must_use]
    pub const fn order(self) -> u8 {
        match self {
            Self::Initialization => 0,
            Self::ToolExecution => 1,
            Self::Finalization => 2,
            Self::Completed => 3,
        }
    }

    /// Returns true if `self` comes strictly after `other`.
    #[must_use]
    pub const fn is_after(self, other: Self) -> bool {
        self.order() > other.order()
    }

    /// Returns the following stage, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Initialization => Some(Self::ToolExecution),
            Self::ToolExecution => Some(Self::Finalization),
            Self::Finalization => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialization => "INITIALIZATION",
            Self::ToolExecution => "TOOL_EXECUTION",
            Self::Finalization => "FINALIZATION",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for FileExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileExecutionStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ValidationError::new(format!("unknown stage '{s}'")).with_field("stage"))
    }
}

/// The status of the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileExecutionStageStatus {
    /// Stage is running.
    InProgress,
    /// Stage finished successfully.
    Success,
    /// Stage failed.
    Failed,
}

impl FileExecutionStageStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Returns true if the status is final for its stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for FileExecutionStageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileExecutionStageStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(ValidationError::new(format!("unknown stage status '{other}'"))
                .with_field("status")),
        }
    }
}
