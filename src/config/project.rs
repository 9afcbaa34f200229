//! Project Configuration
//!
//! The canonical, validated configuration produced by
//! [`merge`](super::merge::merge). It is immutable once built and shared
//! read-only by every phase of a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::phase::{PhaseInputs, PhaseSpec};

use super::path;

/// Where a configuration value came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// Set explicitly in the user configuration
    User,
    /// Filled from a declared default
    Default,
}

/// Immutable, validated project configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    values: Value,
    sources: BTreeMap<String, FieldSource>,
    design_phases: Vec<String>,
    install_phases: Vec<String>,
    fixed_costs: BTreeMap<String, f64>,
}

impl ProjectConfig {
    pub(crate) fn new(
        values: Value,
        sources: BTreeMap<String, FieldSource>,
        design_phases: Vec<String>,
        install_phases: Vec<String>,
        fixed_costs: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            values,
            sources,
            design_phases,
            install_phases,
            fixed_costs,
        }
    }

    /// Value at a dotted key; `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        path::get(&self.values, key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn contains(&self, key: &str) -> bool {
        path::contains(&self.values, key)
    }

    /// Design phases in execution order, duplicates preserved.
    pub fn design_phases(&self) -> &[String] {
        &self.design_phases
    }

    /// Install phases in execution order, duplicates preserved.
    pub fn install_phases(&self) -> &[String] {
        &self.install_phases
    }

    /// Project-level fixed costs from `project_parameters`.
    pub fn fixed_costs(&self) -> &BTreeMap<String, f64> {
        &self.fixed_costs
    }

    /// Provenance of a schema key, if it was recorded during merge.
    pub fn source_of(&self, key: &str) -> Option<FieldSource> {
        self.sources.get(key).copied()
    }

    /// True if the user set `key` explicitly.
    ///
    /// Keys outside the compiled schema have no recorded source; for those
    /// any present value counts as user supplied.
    pub fn is_user_supplied(&self, key: &str) -> bool {
        match self.sources.get(key) {
            Some(source) => *source == FieldSource::User,
            None => self.contains(key),
        }
    }

    /// The full configuration mapping, defaults included.
    pub fn as_value(&self) -> &Value {
        &self.values
    }

    /// Builds the input view of one phase.
    ///
    /// Only the keys `spec` declares are visible. Values in `overrides`
    /// replace the configuration value of the same key.
    pub fn view(&self, spec: &PhaseSpec, overrides: &BTreeMap<String, Value>) -> Result<PhaseInputs> {
        let mut values = Value::Object(Map::new());

        for field in &spec.inputs {
            let value = overrides.get(&field.key).or_else(|| self.get(&field.key));
            if let Some(value) = value {
                path::insert(&mut values, &field.key, value.clone())?;
            }
        }

        Ok(PhaseInputs::new(spec.name.clone(), values))
    }
}
