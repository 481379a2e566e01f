//! Hash store contract and an in-memory implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::StoreError;

/// A shared key-value store holding one hash per key, each with a TTL.
///
/// Mirrors the `HSET` / `HGETALL` / `EXPIRE` / `DEL` subset of a Redis-like
/// store. Every write refreshes the key's TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Sets several fields at once, merging into any existing hash.
    async fn set_fields(
        &self,
        key: &str,
        fields: HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Reads every field. A missing or expired key yields an empty map.
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Sets one field.
    async fn set_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Removes the key. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct Entry {
    fields: HashMap<String, String>,
    // None when the TTL overflows the clock.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local [`HashStore`] for tests and single-worker deployments.
///
/// Expiry uses the tokio clock, so paused-time tests can advance it.
#[derive(Debug, Default)]
pub struct InMemoryHashStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryHashStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Returns true if there are no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `key` is live.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Returns the remaining TTL of a live key.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let entry = entries.get(key).filter(|entry| !entry.is_expired(now))?;
        Some(
            entry
                .expires_at
                .map_or(Duration::MAX, |at| at.saturating_duration_since(now)),
        )
    }

    fn write(&self, key: &str, ttl: Duration, apply: impl FnOnce(&mut HashMap<String, String>)) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            fields: HashMap::new(),
            expires_at: None,
        });
        if entry.is_expired(now) {
            entry.fields.clear();
        }
        apply(&mut entry.fields);
        entry.expires_at = now.checked_add(ttl);
    }
}

#[async_trait]
impl HashStore for InMemoryHashStore {
    async fn set_fields(
        &self,
        key: &str,
        fields: HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.write(key, ttl, |existing| existing.extend(fields));
        Ok(())
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(HashMap::new())
            }
            Some(entry) => Ok(entry.fields.clone()),
            None => Ok(HashMap::new()),
        }
    }

    async fn set_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.write(key, ttl, |existing| {
            existing.insert(field.to_string(), value.to_string());
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
