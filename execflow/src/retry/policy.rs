//! Retry policies with exponential backoff, jitter and a total-time budget.
//!
//! The stopping rules live in [`RetryState::decide`], which is pure apart
//! from jitter sampling. [`RetryPolicy::call`] drives an async operation
//! through those rules and is the only place that sleeps.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::TransientError;
use crate::config::{parse_flag, parse_var};
use crate::errors::ConfigError;

/// Upper bound of the multiplicative jitter factor.
pub const MAX_JITTER_FRACTION: f64 = 0.25;

fn default_max_retries() -> u32 {
    3
}

fn default_max_total_time() -> f64 {
    60.0
}

fn default_base_delay() -> f64 {
    1.0
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

/// Tunables for one retry policy. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wall-clock budget measured from the first attempt.
    #[serde(default = "default_max_total_time")]
    pub max_total_time: f64,
    /// Delay before the first retry.
    #[serde(default = "default_base_delay")]
    pub base_delay: f64,
    /// Growth factor applied per retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Stretch each delay by a random factor in `[1, 1.25)`.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_total_time: default_max_total_time(),
            base_delay: default_base_delay(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicyConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the total time budget in seconds.
    #[must_use]
    pub fn with_max_total_time(mut self, seconds: f64) -> Self {
        self.max_total_time = seconds;
        self
    }

    /// Sets the base delay in seconds.
    #[must_use]
    pub fn with_base_delay(mut self, seconds: f64) -> Self {
        self.base_delay = seconds;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Rejects non-positive or non-finite times and multipliers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("max_total_time", self.max_total_time),
            ("base_delay", self.base_delay),
            ("multiplier", self.multiplier),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be a positive number, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Overlays `{PREFIX}_MAX_RETRIES`, `{PREFIX}_MAX_TIME`,
    /// `{PREFIX}_BASE_DELAY`, `{PREFIX}_MULTIPLIER` and `{PREFIX}_JITTER`
    /// on top of `self`.
    pub fn overlay_from_lookup<L>(mut self, prefix: &str, lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(lookup, &format!("{prefix}_MAX_RETRIES"))? {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(lookup, &format!("{prefix}_MAX_TIME"))? {
            self.max_total_time = v;
        }
        if let Some(v) = parse_var(lookup, &format!("{prefix}_BASE_DELAY"))? {
            self.base_delay = v;
        }
        if let Some(v) = parse_var(lookup, &format!("{prefix}_MULTIPLIER"))? {
            self.multiplier = v;
        }
        if let Some(v) = parse_flag(lookup, &format!("{prefix}_JITTER"))? {
            self.jitter = v;
        }
        Ok(self)
    }
}

/// Why a retry loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The total time budget was used up.
    BudgetExhausted,
    /// The predicate classified the error as permanent.
    NotRetryable,
    /// `max_retries` retries were already made.
    AttemptsExhausted,
    /// Sleeping for the next delay would overrun the budget.
    DelayExceedsBudget,
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Give up and surface the error.
    Stop(StopReason),
}

/// State tracking for one retried call.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Retries made so far (the initial attempt is not counted).
    pub retries: u32,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total attempts made so far, assuming the current failure was one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Decides what to do after a failure.
    ///
    /// Rules are checked in order: budget, predicate, attempt count,
    /// delay against the remaining budget.
    pub fn decide(
        &mut self,
        policy: &RetryPolicy,
        elapsed: Duration,
        retryable: bool,
    ) -> RetryDecision {
        let budget = policy.max_total_time();
        if elapsed >= budget {
            return RetryDecision::Stop(StopReason::BudgetExhausted);
        }
        if !retryable {
            return RetryDecision::Stop(StopReason::NotRetryable);
        }
        if self.retries >= policy.config.max_retries {
            return RetryDecision::Stop(StopReason::AttemptsExhausted);
        }

        let delay = policy.delay_for(self.retries);
        if delay > budget - elapsed {
            return RetryDecision::Stop(StopReason::DelayExceedsBudget);
        }

        self.retries += 1;
        RetryDecision::Retry(delay)
    }
}

/// A validated, named retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    name: String,
    config: RetryPolicyConfig,
}

impl RetryPolicy {
    /// Creates a policy, failing fast on invalid configuration.
    pub fn new(name: impl Into<String>, config: RetryPolicyConfig) -> Result<Self, ConfigError> {
        let name = name.into();
        config.validate().map_err(|err| match err {
            ConfigError::Invalid { field, message } => {
                ConfigError::invalid(format!("{name}.{field}"), message)
            }
            other => other,
        })?;
        Ok(Self { name, config })
    }

    /// Builds a policy from a config known to be valid (built-in defaults).
    pub(crate) fn from_validated(name: &str, config: RetryPolicyConfig) -> Self {
        debug_assert!(config.validate().is_ok());
        Self {
            name: name.to_string(),
            config,
        }
    }

    /// Returns the policy name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// Returns the total time budget.
    #[must_use]
    pub fn max_total_time(&self) -> Duration {
        seconds(self.config.max_total_time)
    }

    /// Delay before retry number `attempt` (zero-based), without jitter.
    #[must_use]
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        seconds(self.config.base_delay * self.config.multiplier.powi(exponent))
    }

    /// Delay before retry number `attempt` (zero-based), jittered if enabled.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        if !self.config.jitter {
            return base;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(0.0..MAX_JITTER_FRACTION);
        seconds(base.as_secs_f64() * factor)
    }

    /// Runs `operation` under this policy with the default predicate.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: TransientError + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_with(|err: &E| err.is_transient(), operation).await
    }

    /// Runs `operation` under this policy, asking `is_retryable` about
    /// each failure. The last error is returned unchanged on give-up.
    pub async fn call_with<T, E, P, F, Fut>(&self, is_retryable: P, mut operation: F) -> Result<T, E>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut state = RetryState::new();

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if state.retries > 0 {
                        tracing::info!(
                            policy = %self.name,
                            attempts = state.attempts(),
                            "Call succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let retryable = is_retryable(&err);
            match state.decide(self, started.elapsed(), retryable) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        policy = %self.name,
                        attempt = state.retries,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Stop(StopReason::NotRetryable) => {
                    tracing::debug!(policy = %self.name, error = %err, "Error is not retryable");
                    return Err(err);
                }
                RetryDecision::Stop(reason) => {
                    tracing::error!(
                        policy = %self.name,
                        attempts = state.attempts(),
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        ?reason,
                        error = %err,
                        "Giving up after retries"
                    );
                    return Err(err);
                }
            }
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}
