use serde_json::Value;

use crate::errors::ConfigError;
use crate::query::{query_all, query_one};

/// What a selector extracts from the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// The whole configuration record.
    Whole,
    /// A path query producing a single value.
    One(String),
    /// A path query producing every match as an array.
    Many(String),
}

/// A parsed config attach key.
///
/// Attach keys prefixed with a sigil address the configuration overlay
/// instead of a graph node:
///
/// - `$key` injects the whole record under `key`.
/// - `$key=path.expr` injects a single-value path query under `key`.
/// - `$$key=path.expr` injects every path match, as an array, under `key`.
///
/// Anything else starting with `$` is an invalid config item. Parsing
/// happens at registration time so malformed keys fail before any
/// resolution starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSelector {
    alias: String,
    query: Query,
}

impl ConfigSelector {
    /// Does this attach key address the configuration overlay?
    pub fn is_sigil(key: &str) -> bool {
        key.starts_with('$')
    }

    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidSelector(key.to_string());

        let rest = key.strip_prefix('$').ok_or_else(invalid)?;
        let (multiple, rest) = match rest.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let (alias, path) = match rest.split_once('=') {
            Some((alias, path)) if !path.is_empty() => (alias, Some(path)),
            Some(_) => return Err(invalid()),
            None => (rest, None),
        };

        if alias.is_empty() || !alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        let query = match (multiple, path) {
            (false, None) => Query::Whole,
            (false, Some(path)) => Query::One(path.to_string()),
            (true, Some(path)) => Query::Many(path.to_string()),
            // `$$key` without a query has nothing to collect.
            (true, None) => return Err(invalid()),
        };

        Ok(Self {
            alias: alias.to_string(),
            query,
        })
    }

    /// The context key the selected value is injected under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Evaluate the selector against an overlay snapshot.
    pub fn evaluate(&self, root: &Value) -> Result<Value, ConfigError> {
        match &self.query {
            Query::Whole => Ok(root.clone()),
            Query::One(path) => query_one(root, path),
            Query::Many(path) => Ok(Value::Array(query_all(root, path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_whole_record_selector() {
        let sel = ConfigSelector::parse("$cfg").unwrap();
        assert_eq!(sel.alias(), "cfg");
        assert_eq!(sel.query(), &Query::Whole);
    }

    #[test]
    fn parses_single_and_multi_queries() {
        let one = ConfigSelector::parse("$toy=dog.play.toy").unwrap();
        assert_eq!(one.alias(), "toy");
        assert_eq!(one.query(), &Query::One("dog.play.toy".to_string()));

        let many = ConfigSelector::parse("$$toys=dogs.*.toy").unwrap();
        assert_eq!(many.alias(), "toys");
        assert_eq!(many.query(), &Query::Many("dogs.*.toy".to_string()));
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in ["$", "$$", "$$toys", "$to y", "$toy=", "$to-y=a.b", "$=a.b"] {
            assert_eq!(
                ConfigSelector::parse(key),
                Err(ConfigError::InvalidSelector(key.to_string())),
                "expected '{key}' to be invalid"
            );
        }
    }

    #[test]
    fn evaluates_against_a_snapshot() {
        let root = json!({
            "dog": { "play": { "toy": "squeaker" } },
            "dogs": { "rex": { "toy": "ball" }, "fido": { "toy": "rope" } },
        });

        let whole = ConfigSelector::parse("$cfg").unwrap();
        assert_eq!(whole.evaluate(&root).unwrap(), root);

        let one = ConfigSelector::parse("$toy=dog.play.toy").unwrap();
        assert_eq!(one.evaluate(&root).unwrap(), json!("squeaker"));

        let many = ConfigSelector::parse("$$toys=dogs.*.toy").unwrap();
        let Value::Array(toys) = many.evaluate(&root).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(toys.len(), 2);
    }
}
