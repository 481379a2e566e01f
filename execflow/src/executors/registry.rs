//! Name to executor factory registry.

use dashmap::DashMap;
use std::sync::Arc;

use super::Executor;

/// Builds a fresh executor for one unit of work.
pub type ExecutorFactory = Arc<dyn Fn() -> Arc<dyn Executor> + Send + Sync>;

/// Maps executor names to factories.
///
/// Registering a name twice replaces the earlier factory. The registry is
/// an ordinary value: share it with `Arc` and give each test its own.
#[derive(Default)]
pub struct ExecutorRegistry {
    factories: DashMap<String, ExecutorFactory>,
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}

impl ExecutorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Executor> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .factories
            .insert(name.clone(), Arc::new(factory))
            .is_some()
        {
            tracing::info!(executor = %name, "Replaced executor registration");
        } else {
            tracing::info!(executor = %name, "Registered executor");
        }
    }

    /// Registers a shared instance under its own name.
    pub fn register_instance(&self, executor: Arc<dyn Executor>) {
        let name = executor.name().to_string();
        self.register(name, move || Arc::clone(&executor));
    }

    /// Instantiates the executor registered under `name`.
    ///
    /// The factory runs after the map lock is released.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Executor>> {
        let factory = self.factories.get(name).map(|entry| Arc::clone(entry.value()))?;
        Some(factory())
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
