//! Worker pool scaling thresholds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

fn default_min_workers() -> u32 {
    1
}

fn default_max_workers() -> u32 {
    10
}

fn default_scale_up_threshold() -> u64 {
    50
}

fn default_scale_down_threshold() -> u64 {
    5
}

fn default_step() -> u32 {
    1
}

fn default_cooldown_seconds() -> u64 {
    120
}

/// Elasticity bounds for one worker pool.
///
/// Read by an external autoscaler. Nothing here scales anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    /// Never run fewer workers than this.
    #[serde(default = "default_min_workers")]
    pub min_workers: u32,
    /// Never run more workers than this.
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    /// Queue depth at or above which the pool grows.
    #[serde(default = "default_scale_up_threshold")]
    pub scale_up_threshold: u64,
    /// Queue depth at or below which the pool shrinks.
    #[serde(default = "default_scale_down_threshold")]
    pub scale_down_threshold: u64,
    /// Workers added per scale-up.
    #[serde(default = "default_step")]
    pub scale_up_step: u32,
    /// Workers removed per scale-down.
    #[serde(default = "default_step")]
    pub scale_down_step: u32,
    /// Minimum time between two scaling actions.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            scale_up_threshold: default_scale_up_threshold(),
            scale_down_threshold: default_scale_down_threshold(),
            scale_up_step: default_step(),
            scale_down_step: default_step(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

/// What an autoscaler should do with a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingDecision {
    /// Leave the pool alone.
    Hold,
    /// Grow the pool to `target` workers.
    ScaleUp {
        /// Desired worker count.
        target: u32,
    },
    /// Shrink the pool to `target` workers.
    ScaleDown {
        /// Desired worker count.
        target: u32,
    },
}

impl ScalingPolicy {
    /// Creates a policy with the given bounds and default thresholds.
    #[must_use]
    pub fn new(min_workers: u32, max_workers: u32) -> Self {
        Self {
            min_workers,
            max_workers,
            ..Self::default()
        }
    }

    /// Sets the queue depth thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, scale_up: u64, scale_down: u64) -> Self {
        self.scale_up_threshold = scale_up;
        self.scale_down_threshold = scale_down;
        self
    }

    /// Sets the step sizes.
    #[must_use]
    pub fn with_steps(mut self, up: u32, down: u32) -> Self {
        self.scale_up_step = up;
        self.scale_down_step = down;
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_seconds = cooldown.as_secs();
        self
    }

    /// The cooldown as a duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// Checks the bounds and thresholds are coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("max_workers", "must be at least 1"));
        }
        if self.min_workers > self.max_workers {
            return Err(ConfigError::invalid(
                "min_workers",
                format!(
                    "{} exceeds max_workers {}",
                    self.min_workers, self.max_workers
                ),
            ));
        }
        if self.scale_down_threshold >= self.scale_up_threshold {
            return Err(ConfigError::invalid(
                "scale_down_threshold",
                format!(
                    "{} must be below scale_up_threshold {}",
                    self.scale_down_threshold, self.scale_up_threshold
                ),
            ));
        }
        if self.scale_up_step == 0 || self.scale_down_step == 0 {
            return Err(ConfigError::invalid("scale_step", "steps must be at least 1"));
        }
        Ok(())
    }

    /// Recommends an action for a pool of `current_workers` facing
    /// `queue_depth` pending tasks.
    ///
    /// Out-of-bounds pools are corrected immediately. Otherwise nothing
    /// happens while `since_last_scale` is inside the cooldown.
    #[must_use]
    pub fn evaluate(
        &self,
        current_workers: u32,
        queue_depth: u64,
        since_last_scale: Option<Duration>,
    ) -> ScalingDecision {
        if current_workers < self.min_workers {
            return ScalingDecision::ScaleUp {
                target: self.min_workers,
            };
        }
        if current_workers > self.max_workers {
            return ScalingDecision::ScaleDown {
                target: self.max_workers,
            };
        }
        if since_last_scale.is_some_and(|elapsed| elapsed < self.cooldown()) {
            return ScalingDecision::Hold;
        }

        if queue_depth >= self.scale_up_threshold && current_workers < self.max_workers {
            let target = current_workers
                .saturating_add(self.scale_up_step)
                .min(self.max_workers);
            return ScalingDecision::ScaleUp { target };
        }
        if queue_depth <= self.scale_down_threshold && current_workers > self.min_workers {
            let target = current_workers
                .saturating_sub(self.scale_down_step)
                .max(self.min_workers);
            return ScalingDecision::ScaleDown { target };
        }
        ScalingDecision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ScalingPolicy {
        ScalingPolicy::new(2, 8)
            .with_thresholds(100, 10)
            .with_steps(3, 1)
            .with_cooldown(Duration::from_secs(60))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(ScalingPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(ScalingPolicy::new(5, 2).validate().is_err());
        assert!(ScalingPolicy::new(0, 0).validate().is_err());
        assert!(policy().with_thresholds(10, 10).validate().is_err());
        assert!(policy().with_steps(0, 1).validate().is_err());
    }

    #[test]
    fn test_scale_up_is_capped() {
        let p = policy();
        assert_eq!(p.evaluate(4, 150, None), ScalingDecision::ScaleUp { target: 7 });
        assert_eq!(p.evaluate(7, 150, None), ScalingDecision::ScaleUp { target: 8 });
        assert_eq!(p.evaluate(8, 150, None), ScalingDecision::Hold);
    }

    #[test]
    fn test_scale_down_respects_min() {
        let p = policy();
        assert_eq!(p.evaluate(4, 0, None), ScalingDecision::ScaleDown { target: 3 });
        assert_eq!(p.evaluate(2, 0, None), ScalingDecision::Hold);
    }

    #[test]
    fn test_between_thresholds_holds() {
        assert_eq!(policy().evaluate(4, 50, None), ScalingDecision::Hold);
    }

    #[test]
    fn test_cooldown() {
        let p = policy();
        assert_eq!(
            p.evaluate(4, 500, Some(Duration::from_secs(30))),
            ScalingDecision::Hold
        );
        assert_eq!(
            p.evaluate(4, 500, Some(Duration::from_secs(60))),
            ScalingDecision::ScaleUp { target: 7 }
        );
    }

    #[test]
    fn test_out_of_bounds_ignores_cooldown() {
        let p = policy();
        let recent = Some(Duration::from_secs(1));
        assert_eq!(p.evaluate(0, 0, recent), ScalingDecision::ScaleUp { target: 2 });
        assert_eq!(p.evaluate(12, 500, recent), ScalingDecision::ScaleDown { target: 8 });
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let p: ScalingPolicy = serde_json::from_str(r#"{"max_workers": 4}"#).unwrap();
        assert_eq!(p.max_workers, 4);
        assert_eq!(p.min_workers, 1);
        assert_eq!(p.cooldown(), Duration::from_secs(120));
    }
}
