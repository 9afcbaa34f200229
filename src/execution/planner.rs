//! Execution Planner
//!
//! Resolves the phase lists of a [`ProjectConfig`] into an ordered plan and
//! tracks phase status during a run:
//! - Name resolution and category checks
//! - Cost currency checks
//! - Required design inputs
//! - Run progress

use std::collections::BTreeMap;

use log::{debug, info};

use crate::config::{validate_phase_selection, PhaseSelection, ProjectConfig};
use crate::error::{EngineError, MissingField, Result};
use crate::phase::{PhaseCategory, PhaseRegistry, RegisteredPhase};

/// One entry of the plan.
#[derive(Debug, Clone)]
pub struct PlannedPhase {
    /// Position within its group
    pub index: usize,
    pub category: PhaseCategory,
    pub phase: RegisteredPhase,
}

impl PlannedPhase {
    pub fn name(&self) -> &str {
        &self.phase.spec.name
    }
}

fn resolve_group(
    registry: &PhaseRegistry,
    names: &[String],
    category: PhaseCategory,
) -> Result<Vec<PlannedPhase>> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            Ok(PlannedPhase {
                index,
                category,
                phase: registry.resolve(name)?.clone(),
            })
        })
        .collect()
}

/// Resolved, validated execution order of a project.
#[derive(Debug)]
pub struct ExecutionPlan {
    design: Vec<PlannedPhase>,
    install: Vec<PlannedPhase>,
    completed: usize,
}

impl ExecutionPlan {
    /// Builds the plan for `config`.
    ///
    /// Fails before anything runs if a phase is unknown or listed under the
    /// wrong category, a cost field is declared in another currency than
    /// `currency`, or a required design input is absent.
    ///
    /// # Arguments
    ///
    /// * `registry` - Catalog to resolve phase names against
    /// * `config` - The merged project configuration
    /// * `currency` - Project currency
    pub fn new(registry: &PhaseRegistry, config: &ProjectConfig, currency: &str) -> Result<Self> {
        let selection = PhaseSelection {
            design: config.design_phases().to_vec(),
            install: config.install_phases().to_vec(),
        };
        validate_phase_selection(registry, &selection)?;

        let design = resolve_group(registry, &selection.design, PhaseCategory::Design)?;
        let install = resolve_group(registry, &selection.install, PhaseCategory::Install)?;

        let plan = Self {
            design,
            install,
            completed: 0,
        };

        plan.check_currency(currency)?;
        plan.check_design_inputs(config)?;

        info!(
            "Execution plan: {} design, {} install phases",
            plan.design.len(),
            plan.install.len()
        );
        Ok(plan)
    }

    fn check_currency(&self, currency: &str) -> Result<()> {
        for planned in self.phases() {
            if let Some(cost) = planned
                .phase
                .spec
                .cost_fields
                .iter()
                .find(|cost| cost.currency != currency)
            {
                return Err(EngineError::CurrencyMismatch {
                    phase: planned.name().to_string(),
                    field: cost.name.clone(),
                    currency: cost.currency.clone(),
                    expected: currency.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Design phases only see the configuration, so every required input
    /// must already be present.
    fn check_design_inputs(&self, config: &ProjectConfig) -> Result<()> {
        let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for planned in &self.design {
            for field in planned.phase.spec.required_inputs() {
                if !config.contains(&field.key) {
                    let phases = missing.entry(field.key.clone()).or_default();
                    if !phases.iter().any(|p| p == planned.name()) {
                        phases.push(planned.name().to_string());
                    }
                }
            }
        }

        if missing.is_empty() {
            debug!("All required design inputs present");
            return Ok(());
        }

        Err(EngineError::MissingRequiredField {
            fields: missing
                .into_iter()
                .map(|(key, phases)| MissingField { key, phases })
                .collect(),
        })
    }

    pub fn design(&self) -> &[PlannedPhase] {
        &self.design
    }

    pub fn install(&self) -> &[PlannedPhase] {
        &self.install
    }

    /// All planned phases, design first.
    pub fn phases(&self) -> impl Iterator<Item = &PlannedPhase> {
        self.design.iter().chain(self.install.iter())
    }

    pub fn len(&self) -> usize {
        self.design.len() + self.install.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts one more phase as completed.
    pub fn mark_completed(&mut self) {
        self.completed = (self.completed + 1).min(self.len());
    }

    /// Returns the current progress as (completed, total).
    pub fn progress(&self) -> (usize, usize) {
        (self.completed, self.len())
    }
}
