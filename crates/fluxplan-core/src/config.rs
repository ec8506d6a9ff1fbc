//! Planner configuration
//!
//! Everything the planner needs from its caller that is not part of the
//! manifest itself: namespace and branch fallbacks, the release that receives
//! caller-supplied value overrides, and readiness naming conventions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::NamespacedKey;

/// Kind of configuration object a values reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKind {
    /// A `v1/Secret`
    #[serde(rename = "Secret")]
    SecretLike,
    /// A `v1/ConfigMap`
    #[serde(rename = "ConfigMap")]
    ConfigLike,
}

impl ConfigKind {
    /// Map a Kubernetes kind name to a config kind
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "Secret" => Some(Self::SecretLike),
            "ConfigMap" => Some(Self::ConfigLike),
            _ => None,
        }
    }

    /// The Kubernetes kind name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::SecretLike => "Secret",
            Self::ConfigLike => "ConfigMap",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// Reference from a release to a Secret or ConfigMap holding values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesReference {
    pub kind: ConfigKind,

    pub name: String,

    /// Namespace of the referenced object (defaults to the referrer's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Data key holding the values payload
    #[serde(default = "default_values_key")]
    pub values_key: String,

    /// Dotted path the raw payload is written to instead of being merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,

    /// Missing referents are expected and not worth a warning
    #[serde(default)]
    pub optional: bool,
}

impl ValuesReference {
    pub fn new(kind: ConfigKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
            values_key: default_values_key(),
            target_path: None,
            optional: false,
        }
    }

    /// Resolve the referenced object's key
    pub fn key(&self, default_namespace: &str) -> NamespacedKey {
        NamespacedKey::with_default(self.namespace.as_deref(), &self.name, default_namespace)
    }
}

/// Alternate readiness target for a release name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessOverride {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Namespace assumed for objects whose metadata omits one
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Revision used when a source pins nothing
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Release that receives `extra_values` after its own references
    #[serde(default = "default_aggregate_release")]
    pub aggregate_release: Option<NamespacedKey>,

    /// Caller-supplied value overrides, applied in order
    #[serde(default)]
    pub extra_values: Vec<ValuesReference>,

    /// Parse semver selectors and warn when they are invalid
    #[serde(default = "default_true")]
    pub validate_semver: bool,

    /// Release name -> alternate readiness target
    #[serde(default = "default_readiness_overrides")]
    pub readiness_overrides: BTreeMap<String, ReadinessOverride>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            default_branch: default_branch(),
            aggregate_release: default_aggregate_release(),
            extra_values: Vec::new(),
            validate_semver: true,
            readiness_overrides: default_readiness_overrides(),
        }
    }
}

impl PlannerConfig {
    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a caller-supplied values reference
    pub fn with_extra_values(mut self, reference: ValuesReference) -> Self {
        self.extra_values.push(reference);
        self
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_values_key() -> String {
    "values.yaml".to_string()
}

fn default_aggregate_release() -> Option<NamespacedKey> {
    Some(NamespacedKey::new("bigbang", "bigbang"))
}

fn default_true() -> bool {
    true
}

fn default_readiness_overrides() -> BTreeMap<String, ReadinessOverride> {
    // metrics-server is only deployed when the cluster lacks one, so its
    // HelmRelease may never exist; the APIService is what callers wait on.
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "metrics-server".to_string(),
        ReadinessOverride {
            kind: "APIService".to_string(),
            name: "v1beta1.metrics.k8s.io".to_string(),
            namespace: None,
            condition: None,
            description: Some("K8s metric server to exist or be deployed".to_string()),
        },
    );
    overrides
}
