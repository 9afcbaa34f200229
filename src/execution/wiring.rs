//! Design-to-Install Wiring
//!
//! Binds install inputs to the design outputs they consume. Bindings come
//! only from explicit wire declarations on install specs. When several
//! design phases produce the wired key, the last one in `design_phases`
//! order wins. All issues are collected before any phase runs.

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::config::ProjectConfig;
use crate::error::{EngineError, Result, WiringIssue};

use super::planner::ExecutionPlan;
use super::result::PhaseResult;

/// One install input bound to a design output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBinding {
    /// Install-side key
    pub input: String,
    /// Design-side key
    pub output: String,
    pub source_phase: String,
    /// Index of the producing phase within `design_phases`
    pub source_index: usize,
}

/// Bindings for every install phase of a plan, indexed like
/// `install_phases`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WiringPlan {
    bindings: Vec<Vec<WireBinding>>,
}

impl WiringPlan {
    /// Resolves every wire of every install phase in `plan`.
    ///
    /// Fails with [`EngineError::IncoherentWiring`] listing every issue:
    /// unit mismatches between a wired input and its producing output, and
    /// required install inputs that are neither configured nor wired.
    pub fn build(plan: &ExecutionPlan, config: &ProjectConfig) -> Result<Self> {
        let mut issues = Vec::new();
        let mut bindings = Vec::with_capacity(plan.install().len());

        for install in plan.install() {
            let spec = &install.phase.spec;
            let mut phase_bindings = Vec::new();
            let mut mismatched = Vec::new();

            for wire in &spec.wires {
                let producer = plan
                    .design()
                    .iter()
                    .rev()
                    .find_map(|design| {
                        design
                            .phase
                            .spec
                            .output_field(&wire.output)
                            .map(|output| (design, output))
                    });

                let Some((design, output)) = producer else {
                    debug!(
                        "{}: no selected design phase produces '{}'",
                        spec.name, wire.output
                    );
                    continue;
                };

                if let Some(input) = spec.input_field(&wire.input) {
                    if input.unit != output.unit {
                        issues.push(WiringIssue::UnitMismatch {
                            phase: spec.name.clone(),
                            input: input.key.clone(),
                            input_unit: input.unit.clone(),
                            source_phase: design.name().to_string(),
                            output: output.key.clone(),
                            output_unit: output.unit.clone(),
                        });
                        mismatched.push(input.key.as_str());
                        continue;
                    }
                }

                debug!(
                    "{}: '{}' <- {}[{}] '{}'",
                    spec.name,
                    wire.input,
                    design.name(),
                    design.index,
                    wire.output
                );
                phase_bindings.push(WireBinding {
                    input: wire.input.clone(),
                    output: wire.output.clone(),
                    source_phase: design.name().to_string(),
                    source_index: design.index,
                });
            }

            for field in spec.required_inputs() {
                let wired = phase_bindings.iter().any(|b| b.input == field.key)
                    || mismatched.contains(&field.key.as_str());
                if !wired && !config.contains(&field.key) {
                    issues.push(WiringIssue::NoSource {
                        phase: spec.name.clone(),
                        input: field.key.clone(),
                    });
                }
            }

            bindings.push(phase_bindings);
        }

        if !issues.is_empty() {
            return Err(EngineError::IncoherentWiring { issues });
        }

        Ok(Self { bindings })
    }

    /// Bindings of the install phase at `install_index`.
    pub fn bindings_for(&self, install_index: usize) -> &[WireBinding] {
        self.bindings
            .get(install_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Values design phases supply to the install phase at `install_index`.
    ///
    /// Keys the user set explicitly are skipped; the user value wins.
    /// Returns the overrides and the list of inputs they cover.
    pub fn overrides_for(
        &self,
        install_index: usize,
        design_results: &[PhaseResult],
        config: &ProjectConfig,
    ) -> (BTreeMap<String, Value>, Vec<String>) {
        let mut overrides = BTreeMap::new();
        let mut wired = Vec::new();

        for binding in self.bindings_for(install_index) {
            if config.is_user_supplied(&binding.input) {
                debug!(
                    "Keeping user value for '{}' over output of {}",
                    binding.input, binding.source_phase
                );
                continue;
            }

            let value = design_results
                .iter()
                .find(|result| result.index == binding.source_index)
                .and_then(|result| result.output(&binding.output));

            if let Some(value) = value {
                overrides.insert(binding.input.clone(), value.clone());
                wired.push(binding.input.clone());
            }
        }

        (overrides, wired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::result::PhaseLog;
    use crate::phase::{FieldSpec, PhaseCategory, PhaseSpec};
    use crate::test_support::{config_for, noop_registry};
    use serde_json::json;

    fn registry() -> crate::phase::PhaseRegistry {
        noop_registry(vec![
            PhaseSpec::design("MonopileDesign")
                .input(FieldSpec::required("site.depth", "m"))
                .output("monopile.length", "m")
                .output("monopile.mass", "t"),
            PhaseSpec::design("HeavyMonopileDesign").output("monopile.length", "m"),
            PhaseSpec::design("ImperialDesign").output("monopile.length", "ft"),
            PhaseSpec::install("MonopileInstallation")
                .input(FieldSpec::required("monopile.length", "m"))
                .input(FieldSpec::required("monopile.mass", "t"))
                .input(FieldSpec::required("site.distance", "km"))
                .consumes("monopile.length")
                .consumes("monopile.mass"),
        ])
    }

    fn design_result(name: &str, index: usize, outputs: Value) -> PhaseResult {
        PhaseResult {
            name: name.to_string(),
            category: PhaseCategory::Design,
            index,
            outputs: serde_json::from_value(outputs).unwrap(),
            costs: Vec::new(),
            phase_time: 0.0,
            details: BTreeMap::new(),
            log: PhaseLog::default(),
        }
    }

    fn build(config: &ProjectConfig) -> Result<WiringPlan> {
        let registry = registry();
        let plan = ExecutionPlan::new(&registry, config, "USD")?;
        WiringPlan::build(&plan, config)
    }

    #[test]
    fn test_last_producer_wins() {
        let config = config_for(json!({
            "design_phases": ["MonopileDesign", "HeavyMonopileDesign"],
            "install_phases": ["MonopileInstallation"],
            "site": {"depth": 30, "distance": 40}
        }));

        let wiring = build(&config).unwrap();
        let bindings = wiring.bindings_for(0);

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].input, "monopile.length");
        assert_eq!(bindings[0].source_phase, "HeavyMonopileDesign");
        assert_eq!(bindings[0].source_index, 1);
        assert_eq!(bindings[1].source_phase, "MonopileDesign");
    }

    #[test]
    fn test_wiring_is_deterministic() {
        let config = config_for(json!({
            "design_phases": ["MonopileDesign", "HeavyMonopileDesign", "MonopileDesign"],
            "install_phases": ["MonopileInstallation", "MonopileInstallation"],
            "site": {"depth": 30, "distance": 40}
        }));

        let first = build(&config).unwrap();
        for _ in 0..5 {
            assert_eq!(build(&config).unwrap(), first);
        }
        assert_eq!(first.bindings_for(1)[0].source_index, 2);
    }

    #[test]
    fn test_unit_mismatch_detected() {
        let config = config_for(json!({
            "design_phases": ["MonopileDesign", "ImperialDesign"],
            "install_phases": ["MonopileInstallation"],
            "site": {"depth": 30, "distance": 40}
        }));

        match build(&config) {
            Err(EngineError::IncoherentWiring { issues }) => {
                assert_eq!(issues.len(), 1);
                assert!(matches!(
                    &issues[0],
                    WiringIssue::UnitMismatch { source_phase, output_unit, .. }
                        if source_phase == "ImperialDesign" && output_unit == "ft"
                ));
            }
            other => panic!("expected IncoherentWiring, got {:?}", other),
        }
    }

    #[test]
    fn test_unsourced_inputs_reported_together() {
        let config = config_for(json!({
            "install_phases": ["MonopileInstallation"],
            "site": {"distance": 40}
        }));

        match build(&config) {
            Err(EngineError::IncoherentWiring { issues }) => {
                let inputs: Vec<&str> = issues
                    .iter()
                    .map(|issue| match issue {
                        WiringIssue::NoSource { input, .. } => input.as_str(),
                        other => panic!("unexpected issue {:?}", other),
                    })
                    .collect();
                assert_eq!(inputs, vec!["monopile.length", "monopile.mass"]);
            }
            other => panic!("expected IncoherentWiring, got {:?}", other),
        }
    }

    #[test]
    fn test_user_value_wins_over_design_output() {
        let config = config_for(json!({
            "design_phases": ["MonopileDesign"],
            "install_phases": ["MonopileInstallation"],
            "site": {"depth": 30, "distance": 40},
            "monopile": {"length": 5.0}
        }));

        let wiring = build(&config).unwrap();
        let results = vec![design_result(
            "MonopileDesign",
            0,
            json!({"monopile.length": 10.0, "monopile.mass": 800.0}),
        )];

        let (overrides, wired) = wiring.overrides_for(0, &results, &config);

        assert!(!overrides.contains_key("monopile.length"));
        assert_eq!(overrides["monopile.mass"], json!(800.0));
        assert_eq!(wired, vec!["monopile.mass"]);
    }
}
