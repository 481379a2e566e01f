//! The file execution stage state machine over a [`HashStore`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::data::{fields, validate_ids, FileExecutionData, FileExecutionStageData};
use super::store::HashStore;
use crate::config::parse_var;
use crate::errors::{ConfigError, ExecflowError, StageTransitionError};

/// Variable overriding the default record TTL, in seconds.
pub const TRACKER_TTL_VAR: &str = "FILE_EXECUTION_TRACKER_TTL_IN_SECOND";
/// Variable overriding the key prefix.
pub const TRACKER_KEY_PREFIX_VAR: &str = "FILE_EXECUTION_TRACKER_KEY_PREFIX";

fn default_key_prefix() -> String {
    "file_execution".to_string()
}

fn default_ttl_seconds() -> u64 {
    86_400
}

/// Tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Prefix of every record key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// TTL applied when a caller does not pass one.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl TrackerConfig {
    /// Loads the config, overlaying the tracker variables.
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ttl) = parse_var::<u64, _>(lookup, TRACKER_TTL_VAR)? {
            if ttl == 0 {
                return Err(ConfigError::invalid(TRACKER_TTL_VAR, "must be positive"));
            }
            config.default_ttl_seconds = ttl;
        }
        if let Some(prefix) = parse_var::<String, _>(lookup, TRACKER_KEY_PREFIX_VAR)? {
            config.key_prefix = prefix;
        }
        Ok(config)
    }

    /// The default TTL as a duration.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

/// Tracks where each file is in its pipeline.
///
/// Records live under `{prefix}:{execution_id}:{file_execution_id}` and
/// every write refreshes their TTL, so records left behind by crashed
/// workers expire on their own.
///
/// Stage transitions are read-then-write. Two workers racing to the same
/// later stage both succeed; a worker moving backwards always fails.
#[derive(Clone)]
pub struct FileExecutionStatusTracker {
    store: Arc<dyn HashStore>,
    config: TrackerConfig,
}

impl std::fmt::Debug for FileExecutionStatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileExecutionStatusTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FileExecutionStatusTracker {
    /// Creates a tracker with default settings.
    #[must_use]
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self {
            store,
            config: TrackerConfig::default(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Builds the record key.
    #[must_use]
    pub fn cache_key(&self, execution_id: &str, file_execution_id: &str) -> String {
        format!(
            "{}:{execution_id}:{file_execution_id}",
            self.config.key_prefix
        )
    }

    fn ttl(&self, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or_else(|| self.config.default_ttl())
    }

    /// Writes the full record and resets its TTL.
    pub async fn set_data(
        &self,
        data: &FileExecutionData,
        ttl: Option<Duration>,
    ) -> Result<(), ExecflowError> {
        data.validate_ids()?;
        let key = self.cache_key(&data.execution_id, &data.file_execution_id);
        self.store
            .set_fields(&key, data.to_fields()?, self.ttl(ttl))
            .await?;
        debug!(key = %key, stage = %data.stage_status.stage(), "Stored file execution data");
        Ok(())
    }

    /// Reads a record. Absent, expired and headless records are `None`.
    pub async fn get_data(
        &self,
        execution_id: &str,
        file_execution_id: &str,
    ) -> Result<Option<FileExecutionData>, ExecflowError> {
        validate_ids(execution_id, file_execution_id)?;
        let key = self.cache_key(execution_id, file_execution_id);
        let raw = self.store.get_all(&key).await?;
        Ok(FileExecutionData::from_fields(&key, &raw)?)
    }

    /// Records a new stage status and returns the updated record.
    ///
    /// * No record, or only single-field writes so far: one is created with
    ///   `new_status` as head and as the only history entry, keeping any
    ///   organization, container name or error already written.
    /// * Same stage as the head: the head is replaced in place.
    /// * Later stage: the old head moves to the front of the history. If
    ///   the front already holds the same stage it is replaced, so every
    ///   stage appears in the history once, with its last status.
    /// * Earlier stage: [`StageTransitionError`], nothing is written.
    ///
    /// The sticky error is only replaced by a non-empty error.
    pub async fn update_stage_status(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        new_status: FileExecutionStageData,
        ttl: Option<Duration>,
    ) -> Result<FileExecutionData, ExecflowError> {
        validate_ids(execution_id, file_execution_id)?;
        let key = self.cache_key(execution_id, file_execution_id);
        let ttl = self.ttl(ttl);

        let raw = self.store.get_all(&key).await?;
        let Some(mut data) = FileExecutionData::from_fields(&key, &raw)? else {
            // Legacy writers never create records explicitly, and single-field
            // updates may land before the first stage.
            let data =
                FileExecutionData::bootstrap(execution_id, file_execution_id, new_status, &raw);
            self.store.set_fields(&key, data.to_fields()?, ttl).await?;
            info!(
                key = %key,
                stage = %data.stage_status.stage(),
                status = %data.stage_status.status(),
                kept_fields = raw.len(),
                "Created file execution record on first stage update"
            );
            return Ok(data);
        };

        let current = data.stage_status.clone();
        let mut changes = HashMap::new();

        if new_status.stage() == current.stage() {
            debug!(
                key = %key,
                stage = %current.stage(),
                from = %current.status(),
                to = %new_status.status(),
                "Updating stage status in place"
            );
        } else if new_status.stage().is_after(current.stage()) {
            match data.status_history.first_mut() {
                Some(front) if front.stage() == current.stage() => *front = current.clone(),
                _ => data.status_history.insert(0, current.clone()),
            }
            changes.insert(
                fields::STATUS_HISTORY.to_string(),
                serde_json::to_string(&data.status_history)?,
            );
            info!(
                key = %key,
                from = %current.stage(),
                to = %new_status.stage(),
                status = %new_status.status(),
                "Advanced file execution stage"
            );
        } else {
            let err = StageTransitionError::new(
                execution_id,
                file_execution_id,
                current.stage(),
                new_status.stage(),
            );
            error!(
                key = %key,
                current = %err.current,
                attempted = %err.attempted,
                "Rejected backwards stage transition"
            );
            return Err(err.into());
        }

        if let Some(error) = new_status.error() {
            data.error = Some(error.to_string());
            changes.insert(fields::ERROR.to_string(), error.to_string());
        }
        changes.insert(
            fields::STAGE_STATUS.to_string(),
            serde_json::to_string(&new_status)?,
        );
        data.stage_status = new_status;

        self.store.set_fields(&key, changes, ttl).await?;
        Ok(data)
    }

    /// Records the container running the tool. Empty names are ignored.
    pub async fn update_tool_container_name(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        tool_container_name: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ExecflowError> {
        self.update_field(
            execution_id,
            file_execution_id,
            fields::TOOL_CONTAINER_NAME,
            tool_container_name,
            ttl,
        )
        .await
    }

    /// Records an error without touching the stage. Empty errors are
    /// ignored so a previous error sticks.
    pub async fn update_error(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        error: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ExecflowError> {
        self.update_field(execution_id, file_execution_id, fields::ERROR, error, ttl)
            .await
    }

    /// Records the owning organization. Empty IDs are ignored.
    pub async fn update_organization_id(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        organization_id: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ExecflowError> {
        self.update_field(
            execution_id,
            file_execution_id,
            fields::ORGANIZATION_ID,
            organization_id,
            ttl,
        )
        .await
    }

    async fn update_field(
        &self,
        execution_id: &str,
        file_execution_id: &str,
        field: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ExecflowError> {
        validate_ids(execution_id, file_execution_id)?;
        if value.is_empty() {
            return Ok(());
        }
        let key = self.cache_key(execution_id, file_execution_id);
        self.store
            .set_field(&key, field, value, self.ttl(ttl))
            .await?;
        debug!(key = %key, field, "Updated file execution field");
        Ok(())
    }

    /// Removes a record. Removing a missing record succeeds.
    pub async fn delete_data(
        &self,
        execution_id: &str,
        file_execution_id: &str,
    ) -> Result<(), ExecflowError> {
        validate_ids(execution_id, file_execution_id)?;
        let key = self.cache_key(execution_id, file_execution_id);
        self.store.delete(&key).await?;
        debug!(key = %key, "Deleted file execution data");
        Ok(())
    }
}
