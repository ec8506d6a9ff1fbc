//! Fluxplan Manifest - From rendered text to typed Flux resources
//!
//! This crate turns the output of a chart render into the four resource
//! collections the planner works on:
//! - **Splitting**: break a multi-document YAML stream into numbered documents
//! - **Resources**: typed shapes for `HelmRelease` and `GitRepository`, plus
//!   normalized Secret/ConfigMap payloads
//! - **Classification**: ordered, first-match-wins typed decoding into an
//!   [`Inventory`]; anything unrecognized is skipped

pub mod classify;
pub mod error;
pub mod resources;
pub mod split;

pub use classify::{Classified, Classifier, Inventory, Resource};
pub use error::{ManifestError, Result};
pub use resources::{
    ChartSourceRef, ConfigObject, DependencyRef, GitReference, GitRepository, GitRepositorySpec,
    HelmChartSpec, HelmChartTemplate, HelmRelease, HelmReleaseSpec, ValuesFromRef,
};
pub use split::{Document, split_bytes, split_documents};
