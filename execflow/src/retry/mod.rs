//! Retry policy engine for calls to flaky external services.
//!
//! This module provides:
//! - Validated, named policies with exponential backoff, jitter and a
//!   total-time budget
//! - The default transient-error classification
//! - Environment loading per policy

mod classify;
mod named;
mod policy;

pub use classify::{
    default_retry_predicate, is_retryable_status, TransientError, RETRYABLE_HTTP_STATUSES,
};
pub use named::{RetryPolicies, PLATFORM_SERVICE, PROMPT_SERVICE};
pub use policy::{
    RetryDecision, RetryPolicy, RetryPolicyConfig, RetryState, StopReason, MAX_JITTER_FRACTION,
};
