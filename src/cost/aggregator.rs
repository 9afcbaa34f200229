//! Cost Aggregation
//!
//! Rolls phase cost fields into project totals. All amounts are in the
//! project currency; nothing is converted.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::execution::PhaseResult;

/// Named totals understood by [`ProjectResult::total`].
pub const TOTAL_NAMES: &[&str] = &[
    "system_capex",
    "installation_capex",
    "project_capex",
    "total_capex",
    "total_opex",
    "total_phase_time",
];

/// Outcome of one project run: every phase result plus derived totals.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectResult {
    pub currency: String,
    pub design_results: Vec<PhaseResult>,
    pub install_results: Vec<PhaseResult>,
    /// Capex of design phases
    pub system_capex: f64,
    /// Capex of install phases
    pub installation_capex: f64,
    /// Project-level fixed costs, by name
    pub fixed_costs: BTreeMap<String, f64>,
    /// Sum of `fixed_costs`
    pub project_capex: f64,
    pub total_capex: f64,
    pub total_opex: f64,
    /// Sum of all phase times, in hours
    pub total_phase_time: f64,
}

/// Builds the project result from per-group phase results.
///
/// `total_capex` is `system_capex + installation_capex + project_capex`.
/// Cost fields a phase did not report contribute zero.
pub fn aggregate(
    design_results: Vec<PhaseResult>,
    install_results: Vec<PhaseResult>,
    fixed_costs: &BTreeMap<String, f64>,
    currency: &str,
) -> ProjectResult {
    let system_capex: f64 = design_results.iter().map(PhaseResult::capex).sum();
    let installation_capex: f64 = install_results.iter().map(PhaseResult::capex).sum();
    let project_capex: f64 = fixed_costs.values().sum();

    let all = || design_results.iter().chain(install_results.iter());
    let total_opex = all().map(PhaseResult::opex).sum();
    let total_phase_time = all().map(|result| result.phase_time).sum();

    ProjectResult {
        currency: currency.to_string(),
        system_capex,
        installation_capex,
        fixed_costs: fixed_costs.clone(),
        project_capex,
        total_capex: system_capex + installation_capex + project_capex,
        total_opex,
        total_phase_time,
        design_results,
        install_results,
    }
}

impl ProjectResult {
    /// Looks up a named total or a project fixed cost.
    pub fn total(&self, name: &str) -> Option<f64> {
        match name {
            "system_capex" => Some(self.system_capex),
            "installation_capex" => Some(self.installation_capex),
            "project_capex" => Some(self.project_capex),
            "total_capex" => Some(self.total_capex),
            "total_opex" => Some(self.total_opex),
            "total_phase_time" => Some(self.total_phase_time),
            other => self.fixed_costs.get(other).copied(),
        }
    }

    /// All phase results, design first, in declared order.
    pub fn results(&self) -> impl Iterator<Item = &PhaseResult> {
        self.design_results.iter().chain(self.install_results.iter())
    }

    /// First result of the phase called `name`.
    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.results().find(|result| result.name == name)
    }

    /// Capex per executed phase, in execution order.
    pub fn capex_breakdown(&self) -> Vec<(&str, f64)> {
        self.results()
            .map(|result| (result.name.as_str(), result.capex()))
            .collect()
    }

    /// Returns a human-readable summary of the totals.
    pub fn summary(&self) -> String {
        if self.design_results.is_empty() && self.install_results.is_empty() {
            return "No phases executed".to_string();
        }

        format!(
            "Project Costs ({}):\n  System CapEx: {:.2}\n  Installation CapEx: {:.2}\n  Project CapEx: {:.2}\n  Total CapEx: {:.2}\n  Total OpEx: {:.2}\n  Phase Time: {:.1} h",
            self.currency,
            self.system_capex,
            self.installation_capex,
            self.project_capex,
            self.total_capex,
            self.total_opex,
            self.total_phase_time
        )
    }
}
