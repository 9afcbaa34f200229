//! Dotted-path access into nested configuration mappings.
//!
//! `null` values are treated as absent.

use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// Returns the value at `key`, or `None` if any segment is missing or null.
pub fn get<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in key.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Returns true if a non-null value exists at `key`.
pub fn contains(root: &Value, key: &str) -> bool {
    get(root, key).is_some()
}

/// Inserts `value` at `key`, creating intermediate mappings as needed.
///
/// Fails if an intermediate segment holds a non-mapping value.
pub fn insert(root: &mut Value, key: &str, value: Value) -> Result<()> {
    if root.is_null() {
        *root = Value::Object(Map::new());
    }

    let segments: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(EngineError::InvalidConfig("empty configuration key".to_string()));
    };

    let mut current = root;
    for segment in parents {
        let map = current.as_object_mut().ok_or_else(|| not_a_mapping(key, segment))?;
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }

    let map = current.as_object_mut().ok_or_else(|| not_a_mapping(key, last))?;
    map.insert(last.to_string(), value);
    Ok(())
}

fn not_a_mapping(key: &str, segment: &str) -> EngineError {
    EngineError::InvalidConfig(format!(
        "cannot set '{}': '{}' is not a mapping",
        key, segment
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested() {
        let config = json!({"turbine": {"hub_height": 110.0}});
        assert_eq!(get(&config, "turbine.hub_height"), Some(&json!(110.0)));
        assert_eq!(get(&config, "turbine"), Some(&json!({"hub_height": 110.0})));
    }

    #[test]
    fn test_get_missing_and_null() {
        let config = json!({"turbine": {"hub_height": null}, "site": 4});
        assert!(get(&config, "turbine.hub_height").is_none());
        assert!(get(&config, "turbine.rotor_diameter").is_none());
        assert!(get(&config, "site.depth").is_none());
        assert!(!contains(&config, "plant"));
    }

    #[test]
    fn test_insert_creates_parents() {
        let mut config = json!({});
        insert(&mut config, "plant.layout.spacing", json!(7)).unwrap();
        assert_eq!(config, json!({"plant": {"layout": {"spacing": 7}}}));
    }

    #[test]
    fn test_insert_preserves_siblings() {
        let mut config = json!({"site": {"depth": 30}});
        insert(&mut config, "site.distance", json!(50)).unwrap();
        assert_eq!(config, json!({"site": {"depth": 30, "distance": 50}}));
    }

    #[test]
    fn test_insert_into_scalar_fails() {
        let mut config = json!({"site": 4});
        let result = insert(&mut config, "site.depth", json!(30));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_insert_replaces_null_parent() {
        let mut config = json!({"site": null});
        insert(&mut config, "site.depth", json!(30)).unwrap();
        assert_eq!(get(&config, "site.depth"), Some(&json!(30)));
    }
}
