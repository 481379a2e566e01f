//! File execution status tracking.
//!
//! Each file in an execution moves through
//! `INITIALIZATION -> TOOL_EXECUTION -> FINALIZATION -> COMPLETED`.
//! [`FileExecutionStatusTracker`] records that journey in a shared
//! [`HashStore`] so any worker can see where a file is, and refuses to move
//! a file backwards.

mod data;
mod status_tracker;
mod store;
#[cfg(test)]
mod tracker_tests;

pub use data::{fields, FileExecutionData, FileExecutionStageData};
pub use status_tracker::{
    FileExecutionStatusTracker, TrackerConfig, TRACKER_KEY_PREFIX_VAR, TRACKER_TTL_VAR,
};
pub use store::{HashStore, InMemoryHashStore};
#[cfg(test)]
pub(crate) use store::MockHashStore;
