//! Namespaced object identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// The `(namespace, name)` pair identifying a release, source or config object
///
/// Rendered as `namespace/name`, which is also its serialized form so that
/// keys can be used directly as JSON/YAML map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedKey {
    pub namespace: String,
    pub name: String,
}

impl NamespacedKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build a key from a reference whose namespace may be omitted
    ///
    /// An absent or empty namespace falls back to `default_namespace`, which is
    /// normally the namespace of the object holding the reference.
    pub fn with_default(namespace: Option<&str>, name: &str, default_namespace: &str) -> Self {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => default_namespace,
        };
        Self::new(namespace, name)
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for NamespacedKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s.split_once('/').ok_or_else(|| CoreError::InvalidKey {
            input: s.to_string(),
            reason: "expected 'namespace/name'".to_string(),
        })?;

        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(CoreError::InvalidKey {
                input: s.to_string(),
                reason: "namespace and name must be non-empty and contain no '/'".to_string(),
            });
        }

        Ok(Self::new(namespace, name))
    }
}

impl Serialize for NamespacedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NamespacedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
