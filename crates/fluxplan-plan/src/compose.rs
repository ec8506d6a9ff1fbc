//! Values composition
//!
//! A release's final values are built by walking its values references in
//! declared order and deep-merging each referenced payload into an initially
//! empty map. Caller-supplied overrides follow for the aggregate release, and
//! inline `spec.values` are merged last.

use fluxplan_core::{NamespacedKey, Values, ValuesReference};
use fluxplan_manifest::Inventory;

use crate::error::PlanWarning;
use crate::graph::ReleaseNode;

/// Composes per-release values from Secrets and ConfigMaps
#[derive(Debug, Clone)]
pub struct ValuesComposer<'a> {
    inventory: &'a Inventory,
    aggregate_release: Option<&'a NamespacedKey>,
    extra_values: &'a [ValuesReference],
}

impl<'a> ValuesComposer<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self {
            inventory,
            aggregate_release: None,
            extra_values: &[],
        }
    }

    /// Apply `extra_values` to `release` after its own references
    pub fn with_extra_values(
        mut self,
        release: Option<&'a NamespacedKey>,
        extra_values: &'a [ValuesReference],
    ) -> Self {
        self.aggregate_release = release;
        self.extra_values = extra_values;
        self
    }

    /// Compose the values of one release
    ///
    /// Missing objects and keys are skipped. They are reported as warnings
    /// unless the reference is marked optional.
    pub fn compose(&self, node: &ReleaseNode) -> (Values, Vec<PlanWarning>) {
        let mut values = Values::new();
        let mut warnings = Vec::new();

        let extra: &[ValuesReference] = match self.aggregate_release {
            Some(aggregate) if *aggregate == node.key => self.extra_values,
            _ => &[],
        };

        for reference in node.value_refs.iter().chain(extra) {
            if let Err(warning) = self.apply(&node.key, reference, &mut values) {
                warnings.push(warning);
            }
        }

        if let Some(inline) = &node.inline_values {
            values.merge(inline);
        }

        (values, warnings)
    }

    /// Merge one reference into `values`
    ///
    /// `Ok(())` covers both a successful merge and a silently skipped optional
    /// reference.
    fn apply(
        &self,
        release: &NamespacedKey,
        reference: &ValuesReference,
        values: &mut Values,
    ) -> std::result::Result<(), PlanWarning> {
        let object_key = reference.key(&release.namespace);
        let kind = reference.kind.kind_name().to_string();

        let Some(object) = self.inventory.config_object(reference.kind, &object_key) else {
            if reference.optional {
                tracing::debug!("{}: optional {} {} not found", release, kind, object_key);
                return Ok(());
            }
            tracing::warn!("{}: {} {} not found, skipping", release, kind, object_key);
            return Err(PlanWarning::DanglingReference {
                release: release.clone(),
                kind,
                target: object_key,
            });
        };

        let Some(payload) = object.get(&reference.values_key) else {
            if reference.optional {
                return Ok(());
            }
            return Err(PlanWarning::MissingValuesKey {
                release: release.clone(),
                object: object_key,
                kind,
                values_key: reference.values_key.clone(),
            });
        };

        let invalid = |reason: String| PlanWarning::InvalidValues {
            release: release.clone(),
            object: object_key.clone(),
            kind: kind.clone(),
            reason,
        };

        match &reference.target_path {
            Some(path) => values
                .set_raw(path, payload.trim_end_matches('\n'))
                .map_err(|e| invalid(e.to_string())),
            None => {
                let overlay = Values::from_yaml_mapping(payload).map_err(|e| invalid(e.to_string()))?;
                values.merge(&overlay);
                Ok(())
            }
        }
    }
}
