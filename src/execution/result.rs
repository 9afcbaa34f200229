//! Phase Results
//!
//! The per-run record of one executed phase.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::phase::{CostKind, PhaseCategory};

/// A declared cost field and the amount a phase reported for it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostLine {
    pub field: String,
    pub kind: CostKind,
    pub currency: String,
    pub amount: f64,
}

/// Execution log of a phase.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct PhaseLog {
    /// Warnings reported by the phase or raised while checking its outcome
    pub warnings: Vec<String>,
    /// Wall-clock time spent in the phase
    pub duration_ms: u128,
    /// Inputs whose values came from a design phase
    pub wired_inputs: Vec<String>,
}

/// Outcome of one executed phase.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub name: String,
    pub category: PhaseCategory,
    /// Position within its group (`design_phases` or `install_phases`)
    pub index: usize,
    pub outputs: BTreeMap<String, Value>,
    /// Declared cost fields the phase reported, in declaration order
    pub costs: Vec<CostLine>,
    /// Phase duration in hours
    pub phase_time: f64,
    pub details: BTreeMap<String, Value>,
    pub log: PhaseLog,
}

impl PhaseResult {
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }

    /// Amount of a cost field, if reported.
    pub fn cost(&self, field: &str) -> Option<f64> {
        self.costs
            .iter()
            .find(|line| line.field == field)
            .map(|line| line.amount)
    }

    /// Sum of capex fields.
    pub fn capex(&self) -> f64 {
        self.sum_of(CostKind::Capex)
    }

    /// Sum of opex fields.
    pub fn opex(&self) -> f64 {
        self.sum_of(CostKind::Opex)
    }

    fn sum_of(&self, kind: CostKind) -> f64 {
        self.costs
            .iter()
            .filter(|line| line.kind == kind)
            .map(|line| line.amount)
            .sum()
    }
}
