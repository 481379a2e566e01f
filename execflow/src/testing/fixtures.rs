//! Test fixtures for executors and the status tracker.

use std::sync::Arc;
use uuid::Uuid;

use crate::context::{ExecutionContext, ExecutionSource};
use crate::tracker::{FileExecutionStatusTracker, InMemoryHashStore};

/// A well-formed context for `executor_name` with fixed IDs.
#[must_use]
pub fn context(executor_name: &str) -> ExecutionContext {
    ExecutionContext::new(
        executor_name,
        "extract",
        "run-1",
        ExecutionSource::Tool,
        "org-test",
    )
}

/// A fresh `(execution_id, file_execution_id)` pair.
#[must_use]
pub fn file_ids() -> (String, String) {
    (Uuid::new_v4().to_string(), Uuid::new_v4().to_string())
}

/// A tracker over an empty in-memory store. The store is returned for
/// inspection.
#[must_use]
pub fn in_memory_tracker() -> (Arc<InMemoryHashStore>, FileExecutionStatusTracker) {
    let store = Arc::new(InMemoryHashStore::new());
    let tracker = FileExecutionStatusTracker::new(store.clone());
    (store, tracker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_valid() {
        let ctx = context("structure");
        assert_eq!(ctx.executor_name, "structure");
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_file_ids_are_unique() {
        let (a, b) = file_ids();
        assert_ne!(a, b);
    }
}
