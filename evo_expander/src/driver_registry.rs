//! Driver registry for expander backends.
//!
//! Provides a `DriverRegistry` struct for registering backend factories by
//! name and building the selected one. This uses constructor-injection rather
//! than global state.

use evo_common::expander::config::LoaderConfig;
use evo_common::expander::driver::{BusLookup, DriverError, ExpanderDriver, IndicatorDriver};
use std::collections::HashMap;
use std::sync::Arc;

/// The three collaborators a loader acquires resources through.
#[derive(Clone)]
pub struct Backend {
    /// Bus lookup.
    pub buses: Arc<dyn BusLookup>,
    /// Expander instantiation.
    pub expanders: Arc<dyn ExpanderDriver>,
    /// Indicator bank instantiation.
    pub indicators: Arc<dyn IndicatorDriver>,
}

impl Backend {
    /// Use one object for all three roles.
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: BusLookup + ExpanderDriver + IndicatorDriver + 'static,
    {
        Self {
            buses: backend.clone(),
            expanders: backend.clone(),
            indicators: backend,
        }
    }
}

/// Factory function type for creating backend instances.
pub type BackendFactory = fn(&LoaderConfig) -> Result<Backend, DriverError>;

/// Registry of available backends.
///
/// Constructed at startup, populated via `register()`, and consulted once to
/// build the backend handed to `Loader`.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_backends(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Build a backend by name.
    ///
    /// # Errors
    /// Returns `DriverError::NotFound`, naming the registered backends, if no
    /// backend with the given name is registered, or whatever the factory
    /// reports.
    pub fn create_backend(
        &self,
        name: &str,
        config: &LoaderConfig,
    ) -> Result<Backend, DriverError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| {
                DriverError::NotFound(format!(
                    "backend '{name}' (available: {})",
                    self.list_backends().join(", ")
                ))
            })?;
        factory(config)
    }

    /// List all registered backend names, sorted.
    pub fn list_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
