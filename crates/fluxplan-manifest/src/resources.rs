//! Typed shapes for the resources the planner tracks
//!
//! Only the fields the planner reads are modelled; everything else in a
//! document is ignored during decoding. `kind` is kept on the Flux shapes
//! so the classifier can check it against the expected discriminator.

use std::collections::BTreeMap;

use fluxplan_core::{ConfigKind, NamespacedKey};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind name of a Flux HelmRelease
pub const HELM_RELEASE_KIND: &str = "HelmRelease";
/// Kind name of a Flux GitRepository
pub const GIT_REPOSITORY_KIND: &str = "GitRepository";

/// Build the key of an object from its metadata
///
/// Objects without a name cannot be referenced and yield `None`.
pub fn object_key(metadata: &ObjectMeta, default_namespace: &str) -> Option<NamespacedKey> {
    let name = metadata.name.as_deref().filter(|n| !n.is_empty())?;
    Some(NamespacedKey::with_default(
        metadata.namespace.as_deref(),
        name,
        default_namespace,
    ))
}

// =========================================================================
// HelmRelease
// =========================================================================

/// A Flux `HelmRelease`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmRelease {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: HelmReleaseSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseSpec {
    #[serde(default)]
    pub chart: Option<HelmChartTemplate>,

    /// Releases that must be ready before this one
    #[serde(default)]
    pub depends_on: Vec<DependencyRef>,

    /// Secrets/ConfigMaps merged into the chart values, in order
    #[serde(default)]
    pub values_from: Vec<ValuesFromRef>,

    /// Inline values, applied after `values_from`
    #[serde(default)]
    pub values: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmChartTemplate {
    #[serde(default)]
    pub spec: HelmChartSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartSpec {
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source_ref: Option<ChartSourceRef>,
}

/// Reference from a chart to the source it is fetched from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSourceRef {
    #[serde(default)]
    pub kind: Option<String>,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesFromRef {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub values_key: Option<String>,
    #[serde(default)]
    pub target_path: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

impl HelmRelease {
    /// The chart source reference, if the release declares one
    pub fn source_ref(&self) -> Option<&ChartSourceRef> {
        self.spec.chart.as_ref()?.spec.source_ref.as_ref()
    }
}

// =========================================================================
// GitRepository
// =========================================================================

/// A Flux `GitRepository`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: GitRepositorySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitRepositorySpec {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "ref")]
    pub reference: Option<GitReference>,
}

/// Revision pins of a GitRepository; several may be set at once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitReference {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub semver: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

// =========================================================================
// Secret / ConfigMap
// =========================================================================

/// A Secret or ConfigMap reduced to its string payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigObject {
    pub key: NamespacedKey,
    pub kind: ConfigKind,
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    /// Normalize a Secret
    ///
    /// `data` arrives base64-decoded from the typed Secret; entries that are
    /// not UTF-8 are dropped. `stringData` entries override `data`.
    pub fn from_secret(key: NamespacedKey, secret: Secret) -> Self {
        let mut data = BTreeMap::new();

        for (k, bytes) in secret.data.unwrap_or_default() {
            match String::from_utf8(bytes.0) {
                Ok(text) => {
                    data.insert(k, text);
                }
                Err(_) => {
                    tracing::debug!("Secret {} key '{}' is not UTF-8, ignoring", key, k);
                }
            }
        }
        data.extend(secret.string_data.unwrap_or_default());

        Self {
            key,
            kind: ConfigKind::SecretLike,
            data,
        }
    }

    /// Normalize a ConfigMap (binary data is ignored)
    pub fn from_config_map(key: NamespacedKey, config_map: ConfigMap) -> Self {
        Self {
            key,
            kind: ConfigKind::ConfigLike,
            data: config_map.data.unwrap_or_default(),
        }
    }

    pub fn get(&self, data_key: &str) -> Option<&str> {
        self.data.get(data_key).map(String::as_str)
    }
}
