use super::store::MockHashStore;
use super::*;
use crate::core::{FileExecutionStage, FileExecutionStageStatus};
use crate::errors::{ConfigError, ExecflowError, StoreError};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use FileExecutionStage::{Completed, Finalization, Initialization, ToolExecution};

fn tracker() -> (Arc<InMemoryHashStore>, FileExecutionStatusTracker) {
    let store = Arc::new(InMemoryHashStore::new());
    let tracker = FileExecutionStatusTracker::new(store.clone());
    (store, tracker)
}

async fn advance(
    tracker: &FileExecutionStatusTracker,
    data: FileExecutionStageData,
) -> Result<FileExecutionData, ExecflowError> {
    tracker.update_stage_status("e1", "f1", data, None).await
}

#[tokio::test]
async fn test_scenario_forward_then_backward() {
    let (_, tracker) = tracker();

    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    let data = advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
    assert_eq!(
        data.status_history,
        vec![FileExecutionStageData::in_progress(Initialization)]
    );
    assert_eq!(
        data.stage_status,
        FileExecutionStageData::in_progress(ToolExecution)
    );

    let before = tracker.get_data("e1", "f1").await.unwrap();
    let err = advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap_err();
    match err {
        ExecflowError::StageTransition(err) => {
            assert_eq!(err.current, ToolExecution);
            assert_eq!(err.attempted, Initialization);
        }
        other => panic!("expected a stage transition error, got {other:?}"),
    }
    assert_eq!(tracker.get_data("e1", "f1").await.unwrap(), before);
}

#[tokio::test]
async fn test_bootstrap_creates_record() {
    let (store, tracker) = tracker();

    let data = advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    assert_eq!(data.execution_id, "e1");
    assert_eq!(data.file_execution_id, "f1");
    assert_eq!(data.status_history, vec![data.stage_status.clone()]);
    assert!(store.contains("file_execution:e1:f1"));

    let stored = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(stored, data);
}

#[tokio::test]
async fn test_bootstrap_with_failure_records_error() {
    let (_, tracker) = tracker();
    let data = advance(
        &tracker,
        FileExecutionStageData::failed(Initialization, "source unreadable"),
    )
    .await
    .unwrap();
    assert_eq!(data.error.as_deref(), Some("source unreadable"));
}

#[tokio::test]
async fn test_same_stage_updates_in_place() {
    let (_, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();

    for status in [
        FileExecutionStageData::in_progress(ToolExecution),
        FileExecutionStageData::failed(ToolExecution, "timeout"),
        FileExecutionStageData::success(ToolExecution),
    ] {
        let data = advance(&tracker, status.clone()).await.unwrap();
        assert_eq!(data.status_history.len(), 1);
        assert_eq!(data.stage_status, status);
    }
}

#[tokio::test]
async fn test_error_is_sticky() {
    let (_, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    advance(&tracker, FileExecutionStageData::failed(Initialization, "first"))
        .await
        .unwrap();

    let data = advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
    assert_eq!(data.error.as_deref(), Some("first"));
    assert_eq!(
        tracker
            .get_data("e1", "f1")
            .await
            .unwrap()
            .unwrap()
            .error
            .as_deref(),
        Some("first")
    );

    let data = advance(&tracker, FileExecutionStageData::failed(ToolExecution, "second"))
        .await
        .unwrap();
    assert_eq!(data.error.as_deref(), Some("second"));

    tracker.update_error("e1", "f1", "", None).await.unwrap();
    let stored = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(stored.error.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_full_pipeline_history() {
    let (_, tracker) = tracker();
    for stage in FileExecutionStage::ALL {
        advance(&tracker, FileExecutionStageData::in_progress(stage))
            .await
            .unwrap();
        advance(&tracker, FileExecutionStageData::success(stage))
            .await
            .unwrap();
    }

    let data = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(data.stage_status, FileExecutionStageData::success(Completed));
    assert_eq!(
        data.status_history,
        vec![
            FileExecutionStageData::success(Finalization),
            FileExecutionStageData::success(ToolExecution),
            FileExecutionStageData::success(Initialization),
        ]
    );
}

#[tokio::test]
async fn test_stage_order_never_decreases() {
    let (_, tracker) = tracker();
    let attempts = [
        Initialization,
        Finalization,
        ToolExecution,
        Initialization,
        Finalization,
        Completed,
        Finalization,
    ];

    let mut highest = 0;
    for stage in attempts {
        let before = tracker.get_data("e1", "f1").await.unwrap();
        let result = advance(&tracker, FileExecutionStageData::in_progress(stage)).await;
        let after = tracker.get_data("e1", "f1").await.unwrap().unwrap();

        if result.is_err() {
            assert_eq!(Some(after.clone()), before);
        }
        assert!(after.stage_status.stage().order() >= highest);
        highest = after.stage_status.stage().order();
    }
    assert_eq!(highest, Completed.order());
}

#[tokio::test]
async fn test_skipping_forward_is_allowed() {
    let (_, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    let data = advance(&tracker, FileExecutionStageData::in_progress(Finalization))
        .await
        .unwrap();
    assert_eq!(data.stage_status.stage(), Finalization);
    assert_eq!(data.status_history.len(), 1);
}

#[tokio::test]
async fn test_repeated_advance_to_same_stage_succeeds() {
    let (_, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    let first = advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
    let second = advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_ids_rejected() {
    let (store, tracker) = tracker();
    let head = FileExecutionStageData::in_progress(Initialization);

    let err = tracker
        .update_stage_status("", "f1", head.clone(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecflowError::Validation(_)));

    let data = FileExecutionData::new("e1", " ", "org", head);
    let err = tracker.set_data(&data, None).await.unwrap_err();
    assert!(matches!(err, ExecflowError::Validation(_)));

    assert!(tracker.get_data("", "").await.is_err());
    assert!(tracker.delete_data("e1", "").await.is_err());
    assert!(tracker
        .update_tool_container_name("", "f1", "tool", None)
        .await
        .is_err());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_set_and_get_data() {
    let (store, tracker) = tracker();
    let data = FileExecutionData::new(
        "e1",
        "f1",
        "org-1",
        FileExecutionStageData::in_progress(ToolExecution),
    )
    .with_history(vec![FileExecutionStageData::success(Initialization)])
    .with_tool_container_name("tool-7");

    tracker
        .set_data(&data, Some(Duration::from_secs(30)))
        .await
        .unwrap();
    assert_eq!(tracker.get_data("e1", "f1").await.unwrap(), Some(data));
    assert!(store.ttl("file_execution:e1:f1").unwrap() <= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_records_expire() {
    let (_, tracker) = tracker();
    tracker
        .update_stage_status(
            "e1",
            "f1",
            FileExecutionStageData::in_progress(Initialization),
            Some(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    tracker
        .update_tool_container_name("e1", "f1", "tool-1", Some(Duration::from_secs(60)))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    let data = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(data.tool_container_name.as_deref(), Some("tool-1"));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(tracker.get_data("e1", "f1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_field_updates_keep_stage() {
    let (_, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();

    tracker
        .update_tool_container_name("e1", "f1", "tool-a", None)
        .await
        .unwrap();
    tracker
        .update_tool_container_name("e1", "f1", "", None)
        .await
        .unwrap();
    tracker
        .update_organization_id("e1", "f1", "org-9", None)
        .await
        .unwrap();
    tracker
        .update_error("e1", "f1", "tool exited with 137", None)
        .await
        .unwrap();

    let data = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(data.tool_container_name.as_deref(), Some("tool-a"));
    assert_eq!(data.organization_id, "org-9");
    assert_eq!(data.error.as_deref(), Some("tool exited with 137"));
    assert_eq!(
        data.stage_status,
        FileExecutionStageData::in_progress(ToolExecution)
    );
}

#[tokio::test]
async fn test_single_field_writes_before_first_stage() {
    let (_, tracker) = tracker();
    tracker
        .update_error("e1", "f1", "executor timed out", None)
        .await
        .unwrap();
    tracker
        .update_tool_container_name("e1", "f1", "tool-a", None)
        .await
        .unwrap();
    assert!(tracker.get_data("e1", "f1").await.unwrap().is_none());

    let data = advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    assert_eq!(data.error.as_deref(), Some("executor timed out"));
    assert_eq!(data.tool_container_name.as_deref(), Some("tool-a"));
    assert_eq!(
        data.status_history,
        vec![FileExecutionStageData::in_progress(Initialization)]
    );

    let stored = tracker.get_data("e1", "f1").await.unwrap().unwrap();
    assert_eq!(stored, data);
    advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (store, tracker) = tracker();
    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    tracker.delete_data("e1", "f1").await.unwrap();
    tracker.delete_data("e1", "f1").await.unwrap();
    assert!(store.is_empty());
    assert!(tracker.get_data("e1", "f1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_custom_key_prefix() {
    let (store, tracker) = tracker();
    let tracker = tracker.with_config(TrackerConfig {
        key_prefix: "fx".to_string(),
        ..TrackerConfig::default()
    });
    assert_eq!(tracker.cache_key("a", "b"), "fx:a:b");

    advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap();
    assert!(store.contains("fx:e1:f1"));
}

#[tokio::test]
async fn test_store_read_failure_propagates() {
    let mut store = MockHashStore::new();
    store
        .expect_get_all()
        .returning(|_| Err(StoreError::unavailable("connection refused")));
    store.expect_set_fields().never();
    let tracker = FileExecutionStatusTracker::new(Arc::new(store));

    let err = advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap_err();
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn test_store_write_failure_propagates() {
    let mut store = MockHashStore::new();
    store.expect_get_all().returning(|_| Ok(HashMap::new()));
    store
        .expect_set_fields()
        .times(1)
        .returning(|_, _, _| Err(StoreError::unavailable("read only replica")));
    let tracker = FileExecutionStatusTracker::new(Arc::new(store));

    let err = advance(&tracker, FileExecutionStageData::in_progress(Initialization))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecflowError::Store(StoreError::Unavailable { .. })));
}

#[tokio::test]
async fn test_transition_writes_only_changed_fields() {
    let existing = FileExecutionData::new(
        "e1",
        "f1",
        "org",
        FileExecutionStageData::success(Initialization),
    )
    .with_tool_container_name("tool-a")
    .to_fields()
    .unwrap();

    let mut store = MockHashStore::new();
    store
        .expect_get_all()
        .returning(move |_| Ok(existing.clone()));
    store
        .expect_set_fields()
        .times(1)
        .returning(|_, fields, ttl| {
            let mut names: Vec<_> = fields.keys().cloned().collect();
            names.sort();
            assert_eq!(names, vec!["stage_status", "status_history"]);
            assert_eq!(ttl, Duration::from_secs(86_400));
            Ok(())
        });
    let tracker = FileExecutionStatusTracker::new(Arc::new(store));

    let data = advance(&tracker, FileExecutionStageData::in_progress(ToolExecution))
        .await
        .unwrap();
    assert_eq!(data.tool_container_name.as_deref(), Some("tool-a"));
}

#[tokio::test]
async fn test_corrupt_record_surfaces_store_error() {
    let mut raw = HashMap::new();
    raw.insert("stage_status".to_string(), "[]".to_string());
    let mut store = MockHashStore::new();
    store.expect_get_all().returning(move |_| Ok(raw.clone()));
    let tracker = FileExecutionStatusTracker::new(Arc::new(store));

    let err = tracker.get_data("e1", "f1").await.unwrap_err();
    assert!(matches!(err, ExecflowError::Store(StoreError::Corrupt { .. })));
}

#[tokio::test]
async fn test_stored_head_with_error_on_running_stage_is_corrupt() {
    let mut raw = HashMap::new();
    raw.insert(
        "stage_status".to_string(),
        r#"{"stage":"TOOL_EXECUTION","status":"IN_PROGRESS","error":"stale"}"#.to_string(),
    );
    let mut store = MockHashStore::new();
    store.expect_get_all().returning(move |_| Ok(raw.clone()));
    store.expect_set_fields().never();
    let tracker = FileExecutionStatusTracker::new(Arc::new(store));

    let err = advance(&tracker, FileExecutionStageData::in_progress(Finalization))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecflowError::Store(StoreError::Corrupt { .. })));
}

#[test]
fn test_tracker_config_from_lookup() {
    let lookup = |key: &str| match key {
        "FILE_EXECUTION_TRACKER_TTL_IN_SECOND" => Some("3600".to_string()),
        "FILE_EXECUTION_TRACKER_KEY_PREFIX" => Some("fe".to_string()),
        _ => None,
    };
    let config = TrackerConfig::from_lookup(&lookup).unwrap();
    assert_eq!(config.default_ttl(), Duration::from_secs(3600));
    assert_eq!(config.key_prefix, "fe");

    let zero = |key: &str| (key == TRACKER_TTL_VAR).then(|| "0".to_string());
    assert!(matches!(
        TrackerConfig::from_lookup(&zero),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_failed_status_round_trip_through_history() {
    let data = FileExecutionStageData::with_error(
        ToolExecution,
        FileExecutionStageStatus::Failed,
        Some("exit 1".into()),
    )
    .unwrap();
    let json = serde_json::to_string(&vec![data.clone()]).unwrap();
    let decoded: Vec<FileExecutionStageData> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, vec![data]);
}
