//! Values handling with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Parse a YAML payload that must be a mapping
    ///
    /// An empty payload yields empty values. Scalars and sequences at the top
    /// level are rejected since they cannot be merged into a values tree.
    pub fn from_yaml_mapping(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }

        match Self::from_yaml(yaml)?.0 {
            JsonValue::Null => Ok(Self::new()),
            value @ JsonValue::Object(_) => Ok(Self(value)),
            other => Err(CoreError::ValuesMerge {
                message: format!("expected a mapping at the top level, got {}", type_name(&other)),
            }),
        }
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    /// - Type conflicts: overlay replaces base
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g., "image.tag")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::ValuesMerge {
                message: format!("Invalid path '{}': empty segment", path),
            });
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Set a raw string at a dotted path, inferring its scalar type
    pub fn set_raw(&mut self, path: &str, raw: &str) -> Result<()> {
        self.set(path, parse_scalar(raw))
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path, creating intermediate objects
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Infer a scalar from its textual form, falling back to a string
fn parse_scalar(raw: &str) -> JsonValue {
    if raw == "true" {
        JsonValue::Bool(true)
    } else if raw == "false" {
        JsonValue::Bool(false)
    } else if raw == "null" {
        JsonValue::Null
    } else if let Ok(num) = raw.parse::<i64>() {
        JsonValue::Number(num.into())
    } else if let Some(num) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        JsonValue::Number(num)
    } else {
        JsonValue::String(raw.to_string())
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "nginx");
        assert_eq!(base.get("image.tag").unwrap(), "2.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_merge_type_conflict_overlay_wins() {
        let mut base = Values::from_yaml("istio:\n  enabled: true\n").unwrap();
        let overlay = Values::from_yaml("istio: disabled\n").unwrap();

        base.merge(&overlay);
        assert_eq!(base.get("istio").unwrap(), "disabled");

        let scalar_then_map = Values::from_yaml("istio:\n  enabled: false\n").unwrap();
        base.merge(&scalar_then_map);
        assert_eq!(base.get("istio.enabled").unwrap(), false);
    }

    #[test]
    fn test_arrays_are_replaced() {
        let mut base = Values::from_yaml("hosts: [a, b]\n").unwrap();
        base.merge(&Values::from_yaml("hosts: [c]\n").unwrap());
        assert_eq!(base.get("hosts").unwrap(), &serde_json::json!(["c"]));
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values.set("image.tag", JsonValue::String("v1".into())).unwrap();
        values.set("replicas", JsonValue::Number(3.into())).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v1");
        assert_eq!(values.get("replicas").unwrap(), 3);
        assert!(values.set("image..tag", JsonValue::Null).is_err());
    }

    #[test]
    fn test_set_raw_infers_types() {
        let mut values = Values::new();
        values.set_raw("a.enabled", "true").unwrap();
        values.set_raw("a.count", "5").unwrap();
        values.set_raw("a.ratio", "0.5").unwrap();
        values.set_raw("a.name", "registry1").unwrap();

        assert_eq!(values.get("a.enabled").unwrap(), true);
        assert_eq!(values.get("a.count").unwrap(), 5);
        assert_eq!(values.get("a.ratio").unwrap(), 0.5);
        assert_eq!(values.get("a.name").unwrap(), "registry1");
    }

    #[test]
    fn test_from_yaml_mapping() {
        assert!(Values::from_yaml_mapping("").unwrap().is_empty());
        assert!(Values::from_yaml_mapping("~\n").unwrap().is_empty());
        assert_eq!(
            Values::from_yaml_mapping("a: 1\n").unwrap().get("a").unwrap(),
            1
        );
        assert!(Values::from_yaml_mapping("- a\n- b\n").is_err());
        assert!(Values::from_yaml_mapping("just a string").is_err());
    }
}
