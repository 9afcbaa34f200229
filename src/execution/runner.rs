//! Individual Phase Execution
//!
//! Runs a single planned phase against its input view and checks the
//! outcome against the phase's declaration:
//! - Every declared output is present
//! - Cost amounts and phase time are finite
//! - Undeclared cost fields are dropped with a warning

use std::time::Instant;

use log::{debug, warn};

use crate::error::PhaseError;
use crate::phase::{PhaseCategory, PhaseInputs, PhaseOutcome, PhaseSpec};
use crate::weather::WeatherSeries;

use super::planner::PlannedPhase;
use super::result::{CostLine, PhaseLog, PhaseResult};

/// Executes a single planned phase.
///
/// A fresh instance is created from the registered factory. Design phases
/// never see the weather series.
///
/// # Arguments
///
/// * `planned` - The phase to execute
/// * `inputs` - Input view restricted to the phase's declared inputs
/// * `weather` - Weather series of the project, if any
/// * `wired_inputs` - Inputs whose values came from design outputs
///
/// # Returns
///
/// * `Ok(PhaseResult)` - Phase completed and honoured its declaration
/// * `Err(PhaseError)` - Phase failed or broke its output contract
pub fn execute_phase(
    planned: &PlannedPhase,
    inputs: &PhaseInputs,
    weather: Option<&WeatherSeries>,
    wired_inputs: Vec<String>,
) -> Result<PhaseResult, PhaseError> {
    let spec = planned.phase.spec.as_ref();
    let weather = match planned.category {
        PhaseCategory::Design => None,
        PhaseCategory::Install => weather,
    };

    let mut phase = planned.phase.instantiate();
    let started = Instant::now();
    let outcome = phase.run(inputs, weather)?;
    let duration_ms = started.elapsed().as_millis();

    debug!(
        "Phase '{}' returned {} outputs, {} costs in {} ms",
        spec.name,
        outcome.outputs.len(),
        outcome.costs.len(),
        duration_ms
    );

    check_outcome(spec, &outcome)?;

    let PhaseOutcome {
        mut outputs,
        costs,
        phase_time,
        details,
        mut warnings,
    } = outcome;

    for name in costs.keys().filter(|name| spec.cost_field(name).is_none()) {
        warn!(
            "Phase '{}' reported undeclared cost field '{}'; ignored for totals",
            spec.name, name
        );
        warnings.push(format!("undeclared cost field '{}' ignored", name));
    }

    let cost_lines = spec
        .cost_fields
        .iter()
        .filter_map(|field| {
            costs.get(&field.name).map(|amount| CostLine {
                field: field.name.clone(),
                kind: field.kind,
                currency: field.currency.clone(),
                amount: *amount,
            })
        })
        .collect();

    // Only declared outputs are visible downstream
    outputs.retain(|key, _| spec.output_field(key).is_some());

    Ok(PhaseResult {
        name: spec.name.clone(),
        category: planned.category,
        index: planned.index,
        outputs,
        costs: cost_lines,
        phase_time,
        details,
        log: PhaseLog {
            warnings,
            duration_ms,
            wired_inputs,
        },
    })
}

/// Checks an outcome against the output contract of `spec`.
fn check_outcome(spec: &PhaseSpec, outcome: &PhaseOutcome) -> Result<(), PhaseError> {
    if let Some(missing) = spec
        .outputs
        .iter()
        .find(|output| !outcome.outputs.contains_key(&output.key))
    {
        return Err(PhaseError::MissingOutput(missing.key.clone()));
    }

    if let Some((name, amount)) = outcome.costs.iter().find(|(_, amount)| !amount.is_finite()) {
        return Err(PhaseError::Computation(format!(
            "cost field '{}' is not finite ({})",
            name, amount
        )));
    }

    if !outcome.phase_time.is_finite() {
        return Err(PhaseError::Computation(format!(
            "phase time is not finite ({})",
            outcome.phase_time
        )));
    }

    Ok(())
}
