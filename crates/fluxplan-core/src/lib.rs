//! Fluxplan Core - Core types shared by the manifest and planning crates
//!
//! This crate provides the foundational types used throughout fluxplan:
//! - `NamespacedKey`: The `(namespace, name)` identity of every tracked object
//! - `Values`: Configuration values with deep merge support
//! - `PlannerConfig`: Caller-supplied knobs (default namespace/branch, extra overrides)

pub mod config;
pub mod error;
pub mod key;
pub mod values;

pub use config::{ConfigKind, PlannerConfig, ReadinessOverride, ValuesReference};
pub use error::{CoreError, Result};
pub use key::NamespacedKey;
pub use values::Values;
