//! Logging setup and span constructors.
//!
//! This module provides:
//! - One-shot subscriber installation driven by [`LogSettings`](crate::config::LogSettings)
//! - Spans carrying the identifiers every execution log line needs

mod logging;

pub use logging::{execution_span, file_span, init_logging};
