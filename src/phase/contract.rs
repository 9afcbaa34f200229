//! Phase Contract
//!
//! The interface every design or install module implements, together with
//! the input view handed to a phase and the outcome it returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::path;
use crate::error::PhaseError;
use crate::weather::WeatherSeries;

/// A design or install module.
///
/// Instances are created fresh for every run by the factory registered
/// with the [`PhaseRegistry`](super::PhaseRegistry). Install phases receive
/// the project's weather series (if any) for window queries; design phases
/// always receive `None`.
pub trait Phase {
    fn run(
        &mut self,
        inputs: &PhaseInputs,
        weather: Option<&WeatherSeries>,
    ) -> Result<PhaseOutcome, PhaseError>;
}

/// Creates phase instances.
pub type PhaseFactory = Arc<dyn Fn() -> Box<dyn Phase> + Send + Sync>;

/// Signature of closure-based phases.
pub type PhaseFn =
    dyn Fn(&PhaseInputs, Option<&WeatherSeries>) -> Result<PhaseOutcome, PhaseError> + Send + Sync;

/// Adapts a closure into a [`Phase`].
pub struct FnPhase {
    func: Arc<PhaseFn>,
}

impl FnPhase {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&PhaseInputs, Option<&WeatherSeries>) -> Result<PhaseOutcome, PhaseError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Wraps an already shared closure.
    pub fn from_shared(func: Arc<PhaseFn>) -> Self {
        Self { func }
    }
}

impl Phase for FnPhase {
    fn run(
        &mut self,
        inputs: &PhaseInputs,
        weather: Option<&WeatherSeries>,
    ) -> Result<PhaseOutcome, PhaseError> {
        (self.func)(inputs, weather)
    }
}

/// Read-only view of the configuration restricted to a phase's declared
/// inputs, with wired design outputs already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInputs {
    phase: String,
    values: Value,
}

impl PhaseInputs {
    pub fn new(phase: impl Into<String>, values: Value) -> Self {
        Self {
            phase: phase.into(),
            values,
        }
    }

    /// Name of the phase this view was built for.
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// The underlying nested mapping.
    pub fn as_value(&self) -> &Value {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        path::get(&self.values, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value at `key` or [`PhaseError::MissingInput`].
    pub fn require(&self, key: &str) -> Result<&Value, PhaseError> {
        self.get(key)
            .ok_or_else(|| PhaseError::MissingInput(key.to_string()))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, PhaseError> {
        as_f64(key, self.require(key)?)
    }

    pub fn get_u64(&self, key: &str) -> Result<u64, PhaseError> {
        as_u64(key, self.require(key)?)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, PhaseError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| invalid(key, "a string"))
    }

    /// Like [`get_f64`](Self::get_f64) but absent values yield `None`.
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, PhaseError> {
        self.get(key).map(|v| as_f64(key, v)).transpose()
    }
}

fn as_f64(key: &str, value: &Value) -> Result<f64, PhaseError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(key, "a finite number"))
}

fn as_u64(key: &str, value: &Value) -> Result<u64, PhaseError> {
    if let Some(v) = value.as_u64() {
        return Ok(v);
    }
    // Accept whole floats such as `4.0` from YAML
    match value.as_f64() {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(invalid(key, "a non-negative integer")),
    }
}

fn invalid(key: &str, expected: &'static str) -> PhaseError {
    PhaseError::InvalidInput {
        key: key.to_string(),
        expected,
    }
}

/// What a phase reports after running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutcome {
    /// Produced values keyed by declared output key
    pub outputs: BTreeMap<String, Value>,
    /// Monetary values keyed by cost field name
    pub costs: BTreeMap<String, f64>,
    /// Phase duration in hours
    pub phase_time: f64,
    /// Free-form diagnostic values
    pub details: BTreeMap<String, Value>,
    pub warnings: Vec<String>,
}

impl PhaseOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_cost(mut self, field: impl Into<String>, amount: f64) -> Self {
        self.costs.insert(field.into(), amount);
        self
    }

    pub fn with_time(mut self, hours: f64) -> Self {
        self.phase_time = hours;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs() -> PhaseInputs {
        PhaseInputs::new(
            "Test",
            json!({
                "site": {"depth": 35.0, "name": "North"},
                "plant": {"num_turbines": 50, "spacing": 7.0},
                "bad": {"neg": -2, "nan": "x"}
            }),
        )
    }

    #[test]
    fn test_typed_accessors() {
        let inputs = inputs();
        assert_eq!(inputs.phase(), "Test");
        assert_eq!(inputs.get_f64("site.depth").unwrap(), 35.0);
        assert_eq!(inputs.get_u64("plant.num_turbines").unwrap(), 50);
        assert_eq!(inputs.get_u64("plant.spacing").unwrap(), 7);
        assert_eq!(inputs.get_str("site.name").unwrap(), "North");
    }

    #[test]
    fn test_missing_input() {
        let result = inputs().get_f64("turbine.hub_height");
        assert!(matches!(result, Err(PhaseError::MissingInput(key)) if key == "turbine.hub_height"));
    }

    #[test]
    fn test_invalid_input_types() {
        let inputs = inputs();
        assert!(matches!(
            inputs.get_f64("bad.nan"),
            Err(PhaseError::InvalidInput { .. })
        ));
        assert!(matches!(
            inputs.get_u64("bad.neg"),
            Err(PhaseError::InvalidInput { .. })
        ));
        assert!(inputs.get_str("site.depth").is_err());
    }

    #[test]
    fn test_optional_accessors() {
        let inputs = inputs();
        assert_eq!(inputs.opt_f64("port.monthly_rate").unwrap(), None);
        assert_eq!(inputs.opt_f64("site.depth").unwrap(), Some(35.0));
    }

    #[test]
    fn test_outcome_builder() {
        let outcome = PhaseOutcome::new()
            .with_output("monopile.diameter", 9.0)
            .with_cost("total_phase_cost", 1.0e6)
            .with_time(12.0)
            .with_detail("trips", 3)
            .with_warning("approximate");

        assert_eq!(outcome.outputs["monopile.diameter"], json!(9.0));
        assert_eq!(outcome.costs["total_phase_cost"], 1.0e6);
        assert_eq!(outcome.phase_time, 12.0);
        assert_eq!(outcome.details["trips"], json!(3));
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_fn_phase_delegates() {
        let mut phase = FnPhase::new(|inputs, _| {
            let depth = inputs.get_f64("site.depth")?;
            Ok(PhaseOutcome::new().with_cost("total_phase_cost", depth * 2.0))
        });

        let outcome = phase.run(&inputs(), None).unwrap();
        assert_eq!(outcome.costs["total_phase_cost"], 70.0);
    }
}
