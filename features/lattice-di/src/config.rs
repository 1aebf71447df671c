use std::sync::{Arc, Mutex};

use futures::FutureExt;
use serde_json::Value;

use lattice_config::{ConfigError, ConfigOverlay};

use crate::depends::Dependency;
use crate::types::Injectable;

/// A dependency-returning handle over a configuration overlay.
///
/// Mutations apply immediately (and fail while the overlay is locked);
/// reads come back as [`Dependency`] values that look at the live overlay
/// at resolution time, so a node observes whatever the configuration holds
/// when it actually resolves.
#[derive(Debug, Clone)]
pub struct Config {
    overlay: Arc<Mutex<ConfigOverlay>>,
}

impl Config {
    /// A fresh configuration from an initial JSON object.
    pub fn new(initial: Value) -> Result<Self, ConfigError> {
        Ok(Self::from_overlay(Arc::new(Mutex::new(
            ConfigOverlay::from_value(initial)?,
        ))))
    }

    pub(crate) fn from_overlay(overlay: Arc<Mutex<ConfigOverlay>>) -> Self {
        Self { overlay }
    }

    /// Shallow-merge a partial record at the top level.
    pub fn update(&self, partial: Value) -> Result<&Self, ConfigError> {
        self.overlay.lock().unwrap().update(partial)?;
        Ok(self)
    }

    /// Replace the whole record.
    pub fn replace(&self, full: Value) -> Result<&Self, ConfigError> {
        self.overlay.lock().unwrap().replace(full)?;
        Ok(self)
    }

    /// Set a single top-level key.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<&Self, ConfigError> {
        self.overlay.lock().unwrap().set(key, value)?;
        Ok(self)
    }

    pub fn has(&self, key: &str) -> bool {
        self.overlay.lock().unwrap().has(key)
    }

    /// A single top-level key as a lazily-resolved dependency. A key that
    /// is absent at resolution time resolves to `Value::Null`.
    pub fn get(&self, key: impl Into<String>) -> Dependency<Value> {
        let overlay = self.overlay.clone();
        let key = key.into();
        Dependency::from_thunk(move || {
            let value = overlay
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or(Value::Null);
            async move { Ok(value) }.boxed()
        })
    }

    /// Apply an arbitrary projection to the live configuration at
    /// resolution time.
    pub fn select<T, F>(&self, selector: F) -> Dependency<T>
    where
        T: Injectable + Clone,
        F: Fn(&Value) -> T + Send + Sync + 'static,
    {
        let overlay = self.overlay.clone();
        Dependency::from_thunk(move || {
            let snapshot = overlay.lock().unwrap().snapshot();
            let value = selector(&snapshot);
            async move { Ok(value) }.boxed()
        })
    }

    /// The whole configuration as a snapshot dependency.
    pub fn all(&self) -> Dependency<Value> {
        let overlay = self.overlay.clone();
        Dependency::from_thunk(move || {
            let snapshot = overlay.lock().unwrap().snapshot();
            async move { Ok(snapshot) }.boxed()
        })
    }

    /// Mark the configuration read-only. Mutating calls fail until
    /// [`Config::unlock`].
    pub fn lock(&self) {
        self.overlay.lock().unwrap().lock();
    }

    pub fn unlock(&self) {
        self.overlay.lock().unwrap().unlock();
    }

    pub fn is_locked(&self) -> bool {
        self.overlay.lock().unwrap().is_locked()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn get_reads_the_live_overlay() {
        let config = Config::new(json!({ "port": 8080 })).unwrap();
        let port = config.get("port");

        assert_eq!(block_on(port.resolve()).unwrap(), json!(8080));
        config.set("port", json!(9090)).unwrap();
        assert_eq!(block_on(port.resolve()).unwrap(), json!(9090));
    }

    #[test]
    fn get_of_a_missing_key_is_null() {
        let config = Config::new(json!({})).unwrap();
        assert_eq!(block_on(config.get("missing").resolve()).unwrap(), Value::Null);
    }

    #[test]
    fn select_projects_at_resolution_time() {
        let config = Config::new(json!({ "name": "lattice" })).unwrap();
        let upper = config.select(|cfg| {
            cfg["name"].as_str().unwrap_or_default().to_uppercase()
        });

        assert_eq!(block_on(upper.resolve()).unwrap(), "LATTICE");
        config.set("name", json!("graph")).unwrap();
        assert_eq!(block_on(upper.resolve()).unwrap(), "GRAPH");
    }

    #[test]
    fn all_returns_a_snapshot() {
        let config = Config::new(json!({ "a": 1 })).unwrap();
        let all = config.all();
        assert_eq!(block_on(all.resolve()).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn lock_rejects_mutation_and_unlock_restores_it() {
        let config = Config::new(json!({ "a": 1 })).unwrap();
        config.lock();
        assert!(config.is_locked());

        assert_eq!(config.update(json!({ "a": 2 })).unwrap_err(), ConfigError::Locked);
        assert_eq!(config.replace(json!({ "b": 3 })).unwrap_err(), ConfigError::Locked);
        assert_eq!(config.set("c", json!(4)).unwrap_err(), ConfigError::Locked);
        assert_eq!(block_on(config.all().resolve()).unwrap(), json!({ "a": 1 }));

        config.unlock();
        config.update(json!({ "a": 2 })).unwrap();
        assert_eq!(block_on(config.all().resolve()).unwrap(), json!({ "a": 2 }));
    }

    #[test]
    fn mutations_chain() {
        let config = Config::new(json!({})).unwrap();
        config
            .set("a", json!(1))
            .unwrap()
            .update(json!({ "b": 2 }))
            .unwrap();
        assert!(config.has("a"));
        assert!(config.has("b"));
    }
}
