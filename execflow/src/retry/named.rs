//! Named retry policies, one per call-site family.

use std::collections::HashMap;

use super::{RetryPolicy, RetryPolicyConfig};
use crate::errors::ConfigError;

/// Policy for calls to the platform service.
pub const PLATFORM_SERVICE: &str = "platform_service";
/// Policy for calls to the prompt service.
pub const PROMPT_SERVICE: &str = "prompt_service";

const PLATFORM_SERVICE_ENV_PREFIX: &str = "PLATFORM_SERVICE";
const PROMPT_SERVICE_ENV_PREFIX: &str = "PROMPT_SERVICE";

fn platform_service_defaults() -> RetryPolicyConfig {
    RetryPolicyConfig::default()
}

fn prompt_service_defaults() -> RetryPolicyConfig {
    // Prompt calls are slower; give them a longer budget.
    RetryPolicyConfig::default().with_max_total_time(120.0)
}

/// The set of retry policies a worker uses, each independently tunable.
#[derive(Debug, Clone)]
pub struct RetryPolicies {
    platform_service: RetryPolicy,
    prompt_service: RetryPolicy,
    custom: HashMap<String, RetryPolicy>,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            platform_service: RetryPolicy::from_validated(
                PLATFORM_SERVICE,
                platform_service_defaults(),
            ),
            prompt_service: RetryPolicy::from_validated(PROMPT_SERVICE, prompt_service_defaults()),
            custom: HashMap::new(),
        }
    }
}

impl RetryPolicies {
    /// Creates the built-in policies with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the built-in policies, overlaying `PLATFORM_SERVICE_*` and
    /// `PROMPT_SERVICE_*` variables.
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let platform = platform_service_defaults()
            .overlay_from_lookup(PLATFORM_SERVICE_ENV_PREFIX, lookup)?;
        let prompt =
            prompt_service_defaults().overlay_from_lookup(PROMPT_SERVICE_ENV_PREFIX, lookup)?;

        Ok(Self {
            platform_service: RetryPolicy::new(PLATFORM_SERVICE, platform)?,
            prompt_service: RetryPolicy::new(PROMPT_SERVICE, prompt)?,
            custom: HashMap::new(),
        })
    }

    /// Adds or replaces a policy under its own name.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        match policy.name() {
            PLATFORM_SERVICE => self.platform_service = policy,
            PROMPT_SERVICE => self.prompt_service = policy,
            name => {
                self.custom.insert(name.to_string(), policy);
            }
        }
        self
    }

    /// The platform service policy.
    #[must_use]
    pub fn platform_service(&self) -> &RetryPolicy {
        &self.platform_service
    }

    /// The prompt service policy.
    #[must_use]
    pub fn prompt_service(&self) -> &RetryPolicy {
        &self.prompt_service
    }

    /// Looks up a policy by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RetryPolicy> {
        match name {
            PLATFORM_SERVICE => Some(&self.platform_service),
            PROMPT_SERVICE => Some(&self.prompt_service),
            other => self.custom.get(other),
        }
    }
}
