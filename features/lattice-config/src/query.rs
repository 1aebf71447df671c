use jsonpath_rust::JsonPath;
use serde_json::Value;

use crate::errors::ConfigError;

/// Normalize a path expression to a full JSONPath query.
///
/// The sigil grammar allows bare dotted paths such as `dog.play.toy`; those
/// are queries rooted at the overlay, so they gain a `$.` prefix. Anything
/// already starting with `$` passes through untouched.
fn normalize(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    }
}

/// Run a path query and return every match.
pub fn query_all(root: &Value, path: &str) -> Result<Vec<Value>, ConfigError> {
    let expr = normalize(path);
    let matches = root.query(&expr).map_err(|e| ConfigError::QueryFailed {
        query: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(matches.into_iter().cloned().collect())
}

/// Run a path query expected to produce a single value.
pub fn query_one(root: &Value, path: &str) -> Result<Value, ConfigError> {
    let mut matches = query_all(root, path)?;
    if matches.is_empty() {
        return Err(ConfigError::NoMatch(path.to_string()));
    }
    Ok(matches.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fixture() -> Value {
        json!({
            "dog": {
                "play": { "toy": "squeaker" },
                "eat": { "food": "treat" },
            },
            "dogs": {
                "rex": { "toy": "ball" },
                "fido": { "toy": "rope" },
            },
        })
    }

    #[test]
    fn queries_a_dotted_path() {
        let value = query_one(&fixture(), "dog.play.toy").unwrap();
        assert_eq!(value, json!("squeaker"));
    }

    #[test]
    fn accepts_explicit_jsonpath() {
        let value = query_one(&fixture(), "$.dog.eat.food").unwrap();
        assert_eq!(value, json!("treat"));
    }

    #[test]
    fn collects_multiple_matches() {
        let values = query_all(&fixture(), "dogs.*.toy").unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&json!("ball")));
        assert!(values.contains(&json!("rope")));
    }

    #[test]
    fn missing_path_is_no_match() {
        assert_eq!(
            query_one(&fixture(), "dog.play.bone"),
            Err(ConfigError::NoMatch("dog.play.bone".to_string()))
        );
    }
}
