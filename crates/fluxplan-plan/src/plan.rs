//! Deployment planning pipeline
//!
//! Ties the stages together: split, classify, build the graph, order it,
//! resolve sources and compose values. The result is either a complete
//! [`DeploymentPlan`] or a single fatal [`PlanError`](crate::PlanError).

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use fluxplan_core::{NamespacedKey, PlannerConfig, Values};
use fluxplan_manifest::{Classifier, Document, Inventory, split_bytes, split_documents};

use crate::compose::ValuesComposer;
use crate::error::{PlanWarning, Result};
use crate::graph::DependencyGraph;
use crate::readiness::{ReadinessConventions, ReadinessTarget};
use crate::sort::topological_order;
use crate::source::{SourceRecord, SourceResolver};

/// Deployment order, sources and values for a release bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    /// Releases in deployment order
    pub order: Vec<NamespacedKey>,
    /// Release key -> where its chart comes from
    pub resolved_sources: IndexMap<NamespacedKey, SourceRecord>,
    /// Release key -> final values (keys follow `order`)
    pub composed_values: IndexMap<NamespacedKey, Values>,
    /// Non-fatal problems
    pub warnings: Vec<PlanWarning>,
    /// Documents that matched no tracked kind
    pub skipped_documents: usize,
}

impl DeploymentPlan {
    /// Position of a release in the deployment order
    pub fn position(&self, key: &NamespacedKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// `url@revision` for every resolved source, in deployment order, deduplicated
    pub fn fetch_addresses(&self) -> Vec<String> {
        let addresses: IndexSet<String> = self
            .order
            .iter()
            .filter_map(|key| self.resolved_sources.get(key))
            .map(SourceRecord::fetch_address)
            .collect();
        addresses.into_iter().collect()
    }

    /// One readiness target per release, in deployment order
    pub fn readiness_targets(&self, conventions: &ReadinessConventions) -> Vec<ReadinessTarget> {
        self.order.iter().map(|key| conventions.target_for(key)).collect()
    }

    /// Summarize for display
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            steps: self
                .order
                .iter()
                .map(|key| PlanStep {
                    release: key.to_string(),
                    source: self.resolved_sources.get(key).map(SourceRecord::fetch_address),
                })
                .collect(),
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
            skipped_documents: self.skipped_documents,
        }
    }
}

/// Summary of a deployment plan for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub steps: Vec<PlanStep>,
    pub warnings: Vec<String>,
    pub skipped_documents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub release: String,
    pub source: Option<String>,
}

impl PlanSummary {
    /// Format as a human-readable string
    pub fn display(&self) -> String {
        let mut lines = vec![format!(
            "Deployment Plan: {} releases ({} documents skipped)",
            self.steps.len(),
            self.skipped_documents
        )];

        for (i, step) in self.steps.iter().enumerate() {
            match &step.source {
                Some(source) => lines.push(format!("  {}. {} <- {}", i + 1, step.release, source)),
                None => lines.push(format!("  {}. {}", i + 1, step.release)),
            }
        }

        if !self.warnings.is_empty() {
            lines.push("  Warnings:".to_string());
            for warning in &self.warnings {
                lines.push(format!("    - {}", warning));
            }
        }

        lines.join("\n")
    }
}

/// Builds deployment plans from rendered manifests
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
    workers: usize,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config, workers: 1 }
    }

    /// Classify documents on up to `workers` threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Readiness conventions from the configuration
    pub fn readiness_conventions(&self) -> ReadinessConventions {
        ReadinessConventions::new(self.config.readiness_overrides.clone())
    }

    /// Plan a rendered manifest
    pub fn plan(&self, manifest: &str) -> Result<DeploymentPlan> {
        self.plan_documents(&split_documents(manifest))
    }

    /// Plan a rendered manifest given as raw bytes
    pub fn plan_bytes(&self, manifest: &[u8]) -> Result<DeploymentPlan> {
        let docs = split_bytes(manifest)?;
        self.plan_documents(&docs)
    }

    /// Plan already split documents
    pub fn plan_documents(&self, docs: &[Document]) -> Result<DeploymentPlan> {
        let classifier = Classifier::new(self.config.default_namespace.clone());
        let inventory = if self.workers > 1 {
            classifier.classify_parallel(docs, self.workers)
        } else {
            classifier.classify(docs)
        };
        self.plan_inventory(&inventory)
    }

    /// Plan a classified inventory
    pub fn plan_inventory(&self, inventory: &Inventory) -> Result<DeploymentPlan> {
        let graph = DependencyGraph::from_inventory(inventory);
        let order = topological_order(&graph)?;

        let mut warnings: Vec<PlanWarning> = graph.warnings().to_vec();

        let sources = SourceResolver::new(&self.config.default_branch)
            .validate_semver(self.config.validate_semver)
            .resolve(&graph, inventory);
        warnings.extend(sources.warnings);

        let composer = ValuesComposer::new(inventory)
            .with_extra_values(self.config.aggregate_release.as_ref(), &self.config.extra_values);

        let mut composed_values = IndexMap::with_capacity(order.len());
        for key in &order {
            let Some(node) = graph.node(key) else {
                continue;
            };
            let (values, node_warnings) = composer.compose(node);
            warnings.extend(node_warnings);
            composed_values.insert(key.clone(), values);
        }

        let resolved_sources: IndexMap<NamespacedKey, SourceRecord> = order
            .iter()
            .filter_map(|key| {
                sources
                    .records
                    .get(key)
                    .map(|record| (key.clone(), record.clone()))
            })
            .collect();

        tracing::info!(
            "Planned {} releases ({} with sources, {} warnings, {} documents skipped)",
            order.len(),
            resolved_sources.len(),
            warnings.len(),
            inventory.skipped
        );

        Ok(DeploymentPlan {
            order,
            resolved_sources,
            composed_values,
            warnings,
            skipped_documents: inventory.skipped,
        })
    }
}

/// Plan a rendered manifest with the given configuration
pub fn plan(manifest: &str, config: &PlannerConfig) -> Result<DeploymentPlan> {
    Planner::new(config.clone()).plan(manifest)
}
