use serde_json::{Map, Value};

use crate::errors::ConfigError;

/// The overlay's top-level record type.
pub type ConfigMap = Map<String, Value>;

/// A deep-mergeable configuration record with a lock flag.
///
/// The overlay starts empty, accepts any number of layers during setup and
/// is queryable from then on. Once [`ConfigOverlay::lock`] has been called
/// every mutating operation fails with [`ConfigError::Locked`] and leaves
/// the data untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverlay {
    data: ConfigMap,
    locked: bool,
}

impl ConfigOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from an initial JSON object.
    pub fn from_value(initial: Value) -> Result<Self, ConfigError> {
        Ok(Self {
            data: into_object(initial)?,
            locked: false,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    fn ensure_unlocked(&self) -> Result<(), ConfigError> {
        if self.locked {
            return Err(ConfigError::Locked);
        }
        Ok(())
    }

    /// Deep-merge a configuration layer into the overlay.
    ///
    /// Objects merge recursively, arrays concatenate, anything else is
    /// replaced by the incoming value.
    pub fn merge(&mut self, layer: Value) -> Result<(), ConfigError> {
        self.ensure_unlocked()?;
        let layer = into_object(layer)?;
        tracing::debug!("Merging configuration layer with {} keys", layer.len());
        for (key, value) in layer {
            match self.data.get_mut(&key) {
                Some(existing) => deep_merge(existing, value),
                None => {
                    self.data.insert(key, value);
                }
            }
        }
        Ok(())
    }

    /// Shallow-merge a partial record at the top level.
    pub fn update(&mut self, partial: Value) -> Result<(), ConfigError> {
        self.ensure_unlocked()?;
        let partial = into_object(partial)?;
        for (key, value) in partial {
            self.data.insert(key, value);
        }
        Ok(())
    }

    /// Replace the whole record.
    pub fn replace(&mut self, full: Value) -> Result<(), ConfigError> {
        self.ensure_unlocked()?;
        self.data = into_object(full)?;
        Ok(())
    }

    /// Set a single top-level key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), ConfigError> {
        self.ensure_unlocked()?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    /// Get a single top-level key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// A snapshot of the whole record as a JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

/// Merge `src` into `dst`: objects recurse, arrays concatenate, everything
/// else is replaced.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            dst.extend(src);
        }
        (dst, src) => *dst = src,
    }
}

fn into_object(value: Value) -> Result<ConfigMap, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::NotAnObject(json_type_name(&other))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
