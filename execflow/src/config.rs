//! Process configuration.
//!
//! Everything is read once at startup. Loaders take a `lookup` closure
//! (`&str -> Option<String>`) so they can be driven from the process
//! environment in production and from a plain map in tests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::retry::RetryPolicies;
use crate::routing::RoutingConfig;
use crate::tracker::TrackerConfig;

/// Environment variable naming a JSON routing document.
pub const ROUTING_CONFIG_VAR: &str = "WORKER_ROUTING_CONFIG";
/// Environment variable for the log filter.
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// Environment variable switching logs to JSON.
pub const LOG_JSON_VAR: &str = "LOG_JSON";

/// Reads a variable from the process environment.
#[must_use]
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reads and parses an optional variable.
///
/// Empty values count as unset.
pub fn parse_var<T, L>(lookup: &L, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::parse(key, raw.as_str(), e.to_string())),
        _ => Ok(None),
    }
}

/// Reads an optional boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub fn parse_flag<L>(lookup: &L, key: &str) -> Result<Option<bool>, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::parse(key, raw.as_str(), "expected a boolean")),
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Aggregated worker settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Status tracker settings.
    pub tracker: TrackerConfig,
    /// Named retry policies.
    pub retry: RetryPolicies,
    /// Queue routing and scaling table.
    pub routing: RoutingConfig,
    /// Logging settings.
    pub log: LogSettings,
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    /// Loads settings using `lookup` for every variable.
    ///
    /// The routing table is read from the file named by
    /// `WORKER_ROUTING_CONFIG` when set, otherwise the built-in table is used.
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let routing = match lookup(ROUTING_CONFIG_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => RoutingConfig::from_file(path.trim())?,
            None => RoutingConfig::default(),
        };
        routing.validate()?;

        let defaults = LogSettings::default();
        let log = LogSettings {
            level: lookup(LOG_LEVEL_VAR)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.level),
            json: parse_flag(lookup, LOG_JSON_VAR)?.unwrap_or(defaults.json),
        };

        Ok(Self {
            tracker: TrackerConfig::from_lookup(lookup)?,
            retry: RetryPolicies::from_lookup(lookup)?,
            routing,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_var() {
        let lookup = lookup_from(&[("N", " 42 "), ("BAD", "x"), ("EMPTY", "")]);
        assert_eq!(parse_var::<u32, _>(&lookup, "N").unwrap(), Some(42));
        assert_eq!(parse_var::<u32, _>(&lookup, "EMPTY").unwrap(), None);
        assert_eq!(parse_var::<u32, _>(&lookup, "MISSING").unwrap(), None);
        assert!(matches!(
            parse_var::<u32, _>(&lookup, "BAD"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_var_rejects_negative_unsigned() {
        let lookup = lookup_from(&[("RETRIES", "-1")]);
        assert!(parse_var::<u32, _>(&lookup, "RETRIES").is_err());
    }

    #[test]
    fn test_parse_flag() {
        let lookup = lookup_from(&[("A", "Yes"), ("B", "0"), ("C", "maybe")]);
        assert_eq!(parse_flag(&lookup, "A").unwrap(), Some(true));
        assert_eq!(parse_flag(&lookup, "B").unwrap(), Some(false));
        assert_eq!(parse_flag(&lookup, "MISSING").unwrap(), None);
        assert!(parse_flag(&lookup, "C").is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(settings.log, LogSettings::default());
        assert_eq!(settings.tracker, TrackerConfig::default());
        assert_eq!(settings.routing.default_queue, "celery");
    }

    #[test]
    fn test_settings_overrides() {
        let settings = Settings::from_lookup(&lookup_from(&[
            ("LOG_LEVEL", "debug"),
            ("LOG_JSON", "true"),
            ("FILE_EXECUTION_TRACKER_TTL_IN_SECOND", "600"),
            ("PLATFORM_SERVICE_MAX_RETRIES", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.log.level, "debug");
        assert!(settings.log.json);
        assert_eq!(settings.tracker.default_ttl_seconds, 600);
        assert_eq!(settings.retry.platform_service().config().max_retries, 5);
    }

    #[test]
    fn test_settings_routing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "default_queue": "general",
                "queues": [{{"name": "general", "worker_type": "general"}}]
            }}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let settings =
            Settings::from_lookup(&lookup_from(&[("WORKER_ROUTING_CONFIG", path.as_str())]))
                .unwrap();
        assert_eq!(settings.routing.default_queue, "general");
    }

    #[test]
    fn test_settings_bad_retry_value_fails() {
        let result = Settings::from_lookup(&lookup_from(&[("PROMPT_SERVICE_BASE_DELAY", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
