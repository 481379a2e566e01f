//! Worker-side entry points.
//!
//! [`TaskHandler`] is the body of a queued task: it takes a serialized
//! context and returns a serialized result. [`FileRun`] drives one file
//! through the tracker stages around an executor call.

mod file_run;
mod task;

pub use file_run::FileRun;
pub use task::TaskHandler;
