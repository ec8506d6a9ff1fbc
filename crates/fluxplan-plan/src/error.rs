//! Error and warning types for planning
//!
//! Only graph-structural failures abort planning. Everything else is
//! reported as a [`PlanWarning`] on the finished plan.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use fluxplan_core::NamespacedKey;
use fluxplan_manifest::ManifestError;

/// Result type for planning operations
pub type Result<T> = std::result::Result<T, PlanError>;

/// Fatal planning errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum PlanError {
    /// The release dependency graph has no valid order
    #[error("cyclic dependency between releases: {}", format_cycle(.cycle))]
    #[diagnostic(
        code(fluxplan::plan::cyclic_dependency),
        help("remove one of the dependsOn entries along the cycle")
    )]
    CyclicDependency {
        /// A release participating in the cycle
        node: NamespacedKey,
        /// The cycle, starting and ending at `node`
        cycle: Vec<NamespacedKey>,
    },

    /// The manifest stream could not be read at all
    #[error(transparent)]
    #[diagnostic(code(fluxplan::manifest::unreadable))]
    Manifest(#[from] ManifestError),
}

fn format_cycle(cycle: &[NamespacedKey]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Non-fatal problems found while planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlanWarning {
    /// A release references an object that is not in the bundle
    DanglingReference {
        release: NamespacedKey,
        kind: String,
        target: NamespacedKey,
    },

    /// A semver selector that downstream tooling will not be able to parse
    InvalidRevisionSelector {
        source: NamespacedKey,
        selector: String,
        reason: String,
    },

    /// A valuesFrom entry of a kind other than Secret/ConfigMap
    UnsupportedValuesKind {
        release: NamespacedKey,
        kind: String,
        name: String,
    },

    /// The referenced object exists but lacks the values key
    MissingValuesKey {
        release: NamespacedKey,
        object: NamespacedKey,
        kind: String,
        values_key: String,
    },

    /// The values payload could not be merged
    InvalidValues {
        release: NamespacedKey,
        object: NamespacedKey,
        kind: String,
        reason: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference {
                release,
                kind,
                target,
            } => write!(f, "{}: {} '{}' not found in bundle", release, kind, target),
            Self::InvalidRevisionSelector {
                source,
                selector,
                reason,
            } => write!(
                f,
                "{}: invalid semver selector '{}': {}",
                source, selector, reason
            ),
            Self::UnsupportedValuesKind {
                release,
                kind,
                name,
            } => write!(
                f,
                "{}: valuesFrom kind '{}' is not supported (name '{}')",
                release, kind, name
            ),
            Self::MissingValuesKey {
                release,
                object,
                kind,
                values_key,
            } => write!(
                f,
                "{}: {} '{}' has no key '{}'",
                release, kind, object, values_key
            ),
            Self::InvalidValues {
                release,
                object,
                kind,
                reason,
            } => write!(
                f,
                "{}: values from {} '{}' ignored: {}",
                release, kind, object, reason
            ),
        }
    }
}
