//! Fluxplan Plan - Deployment planning for Flux release bundles
//!
//! Given the rendered manifests of a bundle of Flux `HelmRelease`s, this
//! crate computes:
//! - **Order**: a dependency-respecting deployment order with a stable,
//!   manifest-order tie-break ([`sort`])
//! - **Sources**: the `url@revision` each release's chart is fetched from
//!   ([`source`])
//! - **Values**: the final values of each release, merged from its Secrets
//!   and ConfigMaps with last-write-wins semantics ([`compose`])
//!
//! ```no_run
//! use fluxplan_core::PlannerConfig;
//! use fluxplan_plan::Planner;
//!
//! let manifest = std::fs::read_to_string("rendered.yaml").unwrap();
//! let plan = Planner::new(PlannerConfig::default()).plan(&manifest).unwrap();
//! for key in &plan.order {
//!     println!("{}", key);
//! }
//! ```

pub mod compose;
pub mod error;
pub mod graph;
pub mod plan;
pub mod readiness;
pub mod sort;
pub mod source;

pub use compose::ValuesComposer;
pub use error::{PlanError, PlanWarning, Result};
pub use graph::{DependencyGraph, ReleaseNode};
pub use plan::{DeploymentPlan, PlanStep, PlanSummary, Planner, plan};
pub use readiness::{ReadinessConventions, ReadinessTarget};
pub use sort::topological_order;
pub use source::{RevisionKind, SourceRecord, SourceResolution, SourceResolver, validate_semver_range};
