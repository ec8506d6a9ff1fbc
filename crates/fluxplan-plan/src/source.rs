//! Source resolution
//!
//! Maps each release's `sourceRef` to the GitRepository it names and picks
//! the revision to fetch: commit, then semver range, then tag, then branch,
//! then the configured default branch.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use fluxplan_core::NamespacedKey;
use fluxplan_manifest::resources::GIT_REPOSITORY_KIND;
use fluxplan_manifest::{GitRepository, Inventory};

use crate::error::PlanWarning;
use crate::graph::DependencyGraph;

/// Which pin of a GitRepository produced the revision selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RevisionKind {
    Commit,
    SemVer,
    Tag,
    Branch,
    DefaultBranch,
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Commit => "commit",
            Self::SemVer => "semver",
            Self::Tag => "tag",
            Self::Branch => "branch",
            Self::DefaultBranch => "default branch",
        };
        f.write_str(s)
    }
}

/// A fetchable source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// Key of the GitRepository
    pub key: NamespacedKey,
    pub url: String,
    pub revision_selector: String,
    pub revision_kind: RevisionKind,
}

impl SourceRecord {
    /// Build a record from a GitRepository using the selector precedence
    pub fn from_repository(key: NamespacedKey, repo: &GitRepository, default_branch: &str) -> Self {
        let pins = repo.spec.reference.clone().unwrap_or_default();

        let (revision_kind, revision_selector) = if let Some(commit) = pinned(pins.commit) {
            (RevisionKind::Commit, commit)
        } else if let Some(range) = pinned(pins.semver) {
            (RevisionKind::SemVer, range)
        } else if let Some(tag) = pinned(pins.tag) {
            (RevisionKind::Tag, tag)
        } else if let Some(branch) = pinned(pins.branch) {
            (RevisionKind::Branch, branch)
        } else {
            (RevisionKind::DefaultBranch, default_branch.to_string())
        };

        Self {
            key,
            url: repo.spec.url.clone(),
            revision_selector,
            revision_kind,
        }
    }

    /// Address in `url@revision` form
    pub fn fetch_address(&self) -> String {
        format!("{}@{}", self.url, self.revision_selector)
    }
}

fn pinned(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Check a semver range the way downstream tooling reads it
///
/// Accepts comma- or space-separated comparators and `||` alternatives.
pub fn validate_semver_range(range: &str) -> std::result::Result<(), String> {
    for alternative in range.split("||") {
        let normalized = normalize_comparators(alternative);
        if normalized.is_empty() {
            return Err("empty version range".to_string());
        }
        semver::VersionReq::parse(&normalized).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Join space-separated comparators with commas (`>=1.0 <2.0` -> `>=1.0, <2.0`)
fn normalize_comparators(range: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in range.split([' ', ',']).filter(|t| !t.is_empty()) {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
        } else {
            comparators.push(format!("{}{}", std::mem::take(&mut pending_op), token));
        }
    }
    if !pending_op.is_empty() {
        comparators.push(pending_op);
    }

    comparators.join(", ")
}

/// Resolved sources plus the problems found along the way
#[derive(Debug, Clone, Default)]
pub struct SourceResolution {
    /// Release key -> source record
    pub records: IndexMap<NamespacedKey, SourceRecord>,
    pub warnings: Vec<PlanWarning>,
}

/// Resolves release source references against the classified sources
#[derive(Debug, Clone)]
pub struct SourceResolver<'a> {
    default_branch: &'a str,
    validate_semver: bool,
}

impl<'a> SourceResolver<'a> {
    pub fn new(default_branch: &'a str) -> Self {
        Self {
            default_branch,
            validate_semver: true,
        }
    }

    pub fn validate_semver(mut self, validate: bool) -> Self {
        self.validate_semver = validate;
        self
    }

    /// Resolve every release with a source reference
    ///
    /// Releases whose reference names no classified source are simply absent
    /// from the result. An unparseable semver selector is reported but the
    /// record is still produced.
    pub fn resolve(&self, graph: &DependencyGraph, inventory: &Inventory) -> SourceResolution {
        let mut resolution = SourceResolution::default();

        for node in graph.nodes() {
            let Some(source_key) = &node.source_ref else {
                continue;
            };

            let Some(repo) = inventory.sources.get(source_key) else {
                tracing::warn!("{}: GitRepository {} not found in bundle", node.key, source_key);
                resolution.warnings.push(PlanWarning::DanglingReference {
                    release: node.key.clone(),
                    kind: GIT_REPOSITORY_KIND.to_string(),
                    target: source_key.clone(),
                });
                continue;
            };

            let record = SourceRecord::from_repository(source_key.clone(), repo, self.default_branch);

            if self.validate_semver
                && record.revision_kind == RevisionKind::SemVer
                && let Err(reason) = validate_semver_range(&record.revision_selector)
            {
                tracing::warn!(
                    "{}: semver selector '{}' is invalid: {}",
                    source_key,
                    record.revision_selector,
                    reason
                );
                let warning = PlanWarning::InvalidRevisionSelector {
                    source: source_key.clone(),
                    selector: record.revision_selector.clone(),
                    reason,
                };
                if !resolution.warnings.contains(&warning) {
                    resolution.warnings.push(warning);
                }
            }

            tracing::debug!(
                "{} -> {} ({})",
                node.key,
                record.fetch_address(),
                record.revision_kind
            );
            resolution.records.insert(node.key.clone(), record);
        }

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxplan_manifest::{Classifier, split_documents};

    fn repo(reference: &str) -> GitRepository {
        serde_yaml::from_str(&format!(
            "kind: GitRepository\nmetadata:\n  name: repo\nspec:\n  url: https://example.com/repo.git\n  ref:\n{}",
            reference
        ))
        .unwrap()
    }

    fn record(reference: &str) -> SourceRecord {
        SourceRecord::from_repository(NamespacedKey::new("ns", "repo"), &repo(reference), "master")
    }

    #[test]
    fn test_selector_precedence() {
        let all = "    commit: abc123\n    semver: '>=1.0.0'\n    tag: v1.2.3\n    branch: main\n";
        assert_eq!(record(all).revision_selector, "abc123");
        assert_eq!(record(all).revision_kind, RevisionKind::Commit);

        let no_commit = "    semver: '>=1.0.0'\n    tag: v1.2.3\n    branch: main\n";
        assert_eq!(record(no_commit).revision_selector, ">=1.0.0");

        let tag_and_branch = "    tag: v1.2.3\n    branch: main\n";
        assert_eq!(record(tag_and_branch).revision_selector, "v1.2.3");
        assert_eq!(record(tag_and_branch).revision_kind, RevisionKind::Tag);

        let branch = "    branch: main\n";
        assert_eq!(record(branch).revision_selector, "main");
    }

    #[test]
    fn test_default_branch_when_unpinned() {
        let empty_pins = record("    tag: \"\"\n");
        assert_eq!(empty_pins.revision_selector, "master");
        assert_eq!(empty_pins.revision_kind, RevisionKind::DefaultBranch);

        let no_ref: GitRepository = serde_yaml::from_str(
            "kind: GitRepository\nmetadata:\n  name: repo\nspec:\n  url: https://example.com/repo.git\n",
        )
        .unwrap();
        let record = SourceRecord::from_repository(NamespacedKey::new("ns", "repo"), &no_ref, "main");
        assert_eq!(record.fetch_address(), "https://example.com/repo.git@main");
    }

    #[test]
    fn test_validate_semver_range() {
        assert!(validate_semver_range(">=1.0.0").is_ok());
        assert!(validate_semver_range(">=1.0.0, <2.0.0").is_ok());
        assert!(validate_semver_range(">= 1.0.0 < 2.0.0").is_ok());
        assert!(validate_semver_range("~1.2 || ^2.0").is_ok());
        assert!(validate_semver_range("1.x").is_ok());

        assert!(validate_semver_range("not-a-version").is_err());
        assert!(validate_semver_range("").is_err());
        assert!(validate_semver_range(">=1.0.0 ||").is_err());
    }

    #[test]
    fn test_resolve_against_inventory() {
        let manifest = r#"
kind: HelmRelease
metadata: {name: db, namespace: ns}
spec:
  chart:
    spec:
      chart: ./chart
      sourceRef: {kind: GitRepository, name: repo}
---
kind: HelmRelease
metadata: {name: app, namespace: ns}
spec:
  chart:
    spec:
      chart: ./chart
      sourceRef: {kind: GitRepository, name: missing}
---
kind: HelmRelease
metadata: {name: inline, namespace: ns}
---
kind: GitRepository
metadata: {name: repo, namespace: ns}
spec:
  url: https://example.com/repo.git
  ref: {tag: v1.2.3}
"#;
        let inventory = Classifier::new("default").classify(&split_documents(manifest));
        let graph = DependencyGraph::from_inventory(&inventory);
        let resolution = SourceResolver::new("master").resolve(&graph, &inventory);

        assert_eq!(resolution.records.len(), 1);
        let db = &resolution.records[&NamespacedKey::new("ns", "db")];
        assert_eq!(db.revision_selector, "v1.2.3");
        assert_eq!(db.key, NamespacedKey::new("ns", "repo"));

        assert_eq!(
            resolution.warnings,
            vec![PlanWarning::DanglingReference {
                release: NamespacedKey::new("ns", "app"),
                kind: "GitRepository".to_string(),
                target: NamespacedKey::new("ns", "missing"),
            }]
        );
    }

    #[test]
    fn test_invalid_semver_is_reported_not_fatal() {
        let manifest = r#"
kind: HelmRelease
metadata: {name: a, namespace: ns}
spec:
  chart:
    spec:
      sourceRef: {name: repo}
---
kind: HelmRelease
metadata: {name: b, namespace: ns}
spec:
  chart:
    spec:
      sourceRef: {name: repo}
---
kind: GitRepository
metadata: {name: repo, namespace: ns}
spec:
  url: https://example.com/repo.git
  ref: {semver: "latest please"}
"#;
        let inventory = Classifier::new("default").classify(&split_documents(manifest));
        let graph = DependencyGraph::from_inventory(&inventory);

        let resolution = SourceResolver::new("master").resolve(&graph, &inventory);
        assert_eq!(resolution.records.len(), 2);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(matches!(
            &resolution.warnings[0],
            PlanWarning::InvalidRevisionSelector { selector, .. } if selector == "latest please"
        ));

        let unchecked = SourceResolver::new("master")
            .validate_semver(false)
            .resolve(&graph, &inventory);
        assert!(unchecked.warnings.is_empty());
    }
}
