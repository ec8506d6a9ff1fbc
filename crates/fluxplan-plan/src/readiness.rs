//! Readiness naming conventions
//!
//! Consumers wait for each release of a plan, in order, before moving on.
//! By default they wait on the HelmRelease itself; some releases are known
//! by name to need a different target.

use std::collections::BTreeMap;

use serde::Serialize;

use fluxplan_core::{NamespacedKey, ReadinessOverride};
use fluxplan_manifest::resources::HELM_RELEASE_KIND;

/// What a consumer should wait on for one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessTarget {
    pub release: NamespacedKey,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub description: String,
}

/// Release name -> alternate readiness target
#[derive(Debug, Clone, Default)]
pub struct ReadinessConventions {
    overrides: BTreeMap<String, ReadinessOverride>,
}

impl ReadinessConventions {
    pub fn new(overrides: BTreeMap<String, ReadinessOverride>) -> Self {
        Self { overrides }
    }

    /// The target to wait on for `release`
    pub fn target_for(&self, release: &NamespacedKey) -> ReadinessTarget {
        match self.overrides.get(&release.name) {
            Some(alt) => ReadinessTarget {
                release: release.clone(),
                kind: alt.kind.clone(),
                name: alt.name.clone(),
                namespace: alt.namespace.clone(),
                condition: alt.condition.clone(),
                description: alt.description.clone().unwrap_or_else(|| {
                    format!("{} `{}` to exist for release `{}`", alt.kind, alt.name, release.name)
                }),
            },
            None => ReadinessTarget {
                release: release.clone(),
                kind: HELM_RELEASE_KIND.to_string(),
                name: release.name.clone(),
                namespace: Some(release.namespace.clone()),
                condition: Some("ready".to_string()),
                description: format!("Helm Release `{}` to be ready", release.name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxplan_core::PlannerConfig;

    #[test]
    fn test_default_target_is_the_release() {
        let conventions = ReadinessConventions::default();
        let target = conventions.target_for(&NamespacedKey::new("bigbang", "istio"));

        assert_eq!(target.kind, "HelmRelease");
        assert_eq!(target.name, "istio");
        assert_eq!(target.namespace.as_deref(), Some("bigbang"));
        assert_eq!(target.condition.as_deref(), Some("ready"));
        assert_eq!(target.description, "Helm Release `istio` to be ready");
    }

    #[test]
    fn test_metrics_server_convention() {
        let conventions = ReadinessConventions::new(PlannerConfig::default().readiness_overrides);
        let target = conventions.target_for(&NamespacedKey::new("bigbang", "metrics-server"));

        assert_eq!(target.kind, "APIService");
        assert_eq!(target.name, "v1beta1.metrics.k8s.io");
        assert_eq!(target.namespace, None);
        assert_eq!(target.condition, None);
        assert_eq!(target.release, NamespacedKey::new("bigbang", "metrics-server"));
    }

    #[test]
    fn test_override_without_description() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "gatekeeper".to_string(),
            ReadinessOverride {
                kind: "Deployment".to_string(),
                name: "gatekeeper-controller-manager".to_string(),
                namespace: Some("gatekeeper-system".to_string()),
                condition: Some("available".to_string()),
                description: None,
            },
        );
        let target = ReadinessConventions::new(overrides)
            .target_for(&NamespacedKey::new("bigbang", "gatekeeper"));

        assert_eq!(
            target.description,
            "Deployment `gatekeeper-controller-manager` to exist for release `gatekeeper`"
        );
        assert_eq!(target.condition.as_deref(), Some("available"));
    }
}
