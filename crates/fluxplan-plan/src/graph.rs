//! Release dependency graph
//!
//! Nodes live in an arena (`IndexMap`) keyed by [`NamespacedKey`], in the
//! order releases were first seen in the manifest. Edges point from a
//! release to the releases it depends on.

use indexmap::{IndexMap, IndexSet};

use fluxplan_core::{ConfigKind, NamespacedKey, Values, ValuesReference};
use fluxplan_manifest::resources::{GIT_REPOSITORY_KIND, HELM_RELEASE_KIND};
use fluxplan_manifest::{HelmRelease, Inventory};

use crate::error::PlanWarning;

/// A release as seen by the planner
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseNode {
    pub key: NamespacedKey,
    /// Releases this one depends on, in declaration order
    pub depends_on: IndexSet<NamespacedKey>,
    /// GitRepository the chart is fetched from
    pub source_ref: Option<NamespacedKey>,
    /// Values references, in declaration order, namespaces resolved
    pub value_refs: Vec<ValuesReference>,
    /// Inline `spec.values`
    pub inline_values: Option<Values>,
}

impl ReleaseNode {
    /// Build a node from a typed release
    ///
    /// References that omit a namespace resolve against the release's own
    /// namespace. Unsupported valuesFrom kinds are dropped and reported.
    pub fn from_release(key: NamespacedKey, release: &HelmRelease) -> (Self, Vec<PlanWarning>) {
        let own_namespace = key.namespace.as_str();
        let mut warnings = Vec::new();

        let depends_on = release
            .spec
            .depends_on
            .iter()
            .map(|dep| NamespacedKey::with_default(dep.namespace.as_deref(), &dep.name, own_namespace))
            .collect();

        let source_ref = release.source_ref().and_then(|source| {
            match source.kind.as_deref() {
                None | Some(GIT_REPOSITORY_KIND) => Some(NamespacedKey::with_default(
                    source.namespace.as_deref(),
                    &source.name,
                    own_namespace,
                )),
                Some(other) => {
                    tracing::debug!("{}: source kind '{}' is not tracked", key, other);
                    None
                }
            }
        });

        let mut value_refs = Vec::with_capacity(release.spec.values_from.len());
        for entry in &release.spec.values_from {
            let Some(kind) = ConfigKind::from_kind(&entry.kind) else {
                warnings.push(PlanWarning::UnsupportedValuesKind {
                    release: key.clone(),
                    kind: entry.kind.clone(),
                    name: entry.name.clone(),
                });
                continue;
            };

            let mut reference = ValuesReference::new(kind, entry.name.clone());
            reference.namespace = Some(own_namespace.to_string());
            if let Some(values_key) = entry.values_key.as_deref().filter(|k| !k.is_empty()) {
                reference.values_key = values_key.to_string();
            }
            reference.target_path = entry.target_path.clone().filter(|p| !p.is_empty());
            reference.optional = entry.optional;
            value_refs.push(reference);
        }

        let inline_values = release
            .spec
            .values
            .clone()
            .map(Values)
            .filter(|values| !values.is_empty());

        let node = Self {
            key,
            depends_on,
            source_ref,
            value_refs,
            inline_values,
        };
        (node, warnings)
    }
}

/// Dependency graph over all releases of a bundle
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<NamespacedKey, ReleaseNode>,
    warnings: Vec<PlanWarning>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every classified release
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut graph = Self::new();

        for (key, release) in &inventory.releases {
            let (node, warnings) = ReleaseNode::from_release(key.clone(), release);
            graph.warnings.extend(warnings);
            graph.add(node);
        }

        let dangling: Vec<PlanWarning> = graph
            .edges()
            .filter(|(_, dependency)| !graph.contains(dependency))
            .map(|(dependent, dependency)| PlanWarning::DanglingReference {
                release: dependent.clone(),
                kind: HELM_RELEASE_KIND.to_string(),
                target: dependency.clone(),
            })
            .collect();
        for warning in &dangling {
            tracing::warn!("{}", warning);
        }
        graph.warnings.extend(dangling);

        graph
    }

    /// Add a node, replacing any node with the same key in place
    pub fn add(&mut self, node: ReleaseNode) {
        self.nodes.insert(node.key.clone(), node);
    }

    pub fn node(&self, key: &NamespacedKey) -> Option<&ReleaseNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &NamespacedKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// First-seen position of a node
    pub fn position(&self, key: &NamespacedKey) -> Option<usize> {
        self.nodes.get_index_of(key)
    }

    /// Nodes in first-seen order
    pub fn nodes(&self) -> impl Iterator<Item = &ReleaseNode> {
        self.nodes.values()
    }

    /// All declared edges as `(dependent, dependency)`, including dangling ones
    pub fn edges(&self) -> impl Iterator<Item = (&NamespacedKey, &NamespacedKey)> {
        self.nodes
            .values()
            .flat_map(|node| node.depends_on.iter().map(move |dep| (&node.key, dep)))
    }

    /// Problems found while building the graph
    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
