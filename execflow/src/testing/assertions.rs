//! Test assertions for execution results and tracker records.

use crate::core::{ExecutionResult, FileExecutionStage, FileExecutionStageStatus};
use crate::tracker::FileExecutionData;

/// Asserts that the result failed with an error containing `needle`.
pub fn assert_result_error_contains(result: &ExecutionResult, needle: &str) {
    let error = result
        .error()
        .unwrap_or_else(|| panic!("Expected failure, got data: {:?}", result.data()));
    assert!(
        error.contains(needle),
        "Expected error containing '{needle}', got '{error}'"
    );
}

/// Asserts that the record's head is `stage` with `status`.
pub fn assert_stage(
    data: &FileExecutionData,
    stage: FileExecutionStage,
    status: FileExecutionStageStatus,
) {
    let head = &data.stage_status;
    assert_eq!(
        (head.stage(), head.status()),
        (stage, status),
        "Unexpected head for {}/{}",
        data.execution_id,
        data.file_execution_id
    );
}

/// Asserts the history, most recent first, as `(stage, status)` pairs.
pub fn assert_history(
    data: &FileExecutionData,
    expected: &[(FileExecutionStage, FileExecutionStageStatus)],
) {
    let actual: Vec<_> = data
        .status_history
        .iter()
        .map(|entry| (entry.stage(), entry.status()))
        .collect();
    assert_eq!(actual, expected, "Unexpected status history");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::FileExecutionStageData;

    #[test]
    fn test_error_contains() {
        assert_result_error_contains(&ExecutionResult::failure("disk full"), "disk");
    }

    #[test]
    #[should_panic(expected = "Expected failure")]
    fn test_error_contains_panics_on_success() {
        assert_result_error_contains(&ExecutionResult::ok_empty(), "disk");
    }

    #[test]
    fn test_record_assertions() {
        let data = FileExecutionData::new(
            "e",
            "f",
            "o",
            FileExecutionStageData::in_progress(FileExecutionStage::ToolExecution),
        )
        .with_history(vec![FileExecutionStageData::success(
            FileExecutionStage::Initialization,
        )]);
        assert_stage(
            &data,
            FileExecutionStage::ToolExecution,
            FileExecutionStageStatus::InProgress,
        );
        assert_history(
            &data,
            &[(
                FileExecutionStage::Initialization,
                FileExecutionStageStatus::Success,
            )],
        );
    }
}
