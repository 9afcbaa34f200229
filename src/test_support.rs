//! Shared fixtures for unit tests: scripted phases, registries, configs
//! and weather series.

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::{merge, InputSchema, ProjectConfig};
use crate::error::PhaseError;
use crate::phase::{PhaseInputs, PhaseOutcome, PhaseRegistry, PhaseSpec};
use crate::weather::{WeatherRecord, WeatherSeries};

/// Inputs seen by recorded phases, as (phase name, input view).
pub(crate) type Recorder = Arc<Mutex<Vec<(String, Value)>>>;

pub(crate) fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

/// Names of the phases a recorder saw, in call order.
pub(crate) fn recorded_names(recorder: &Recorder) -> Vec<String> {
    recorder
        .lock()
        .unwrap()
        .iter()
        .map(|(name, _)| name.clone())
        .collect()
}

/// An outcome with every declared output set to `1.0` and every declared
/// cost field set to `0.0`.
pub(crate) fn placeholder_outcome(spec: &PhaseSpec) -> PhaseOutcome {
    let outcome = spec
        .outputs
        .iter()
        .fold(PhaseOutcome::new(), |outcome, output| {
            outcome.with_output(output.key.clone(), 1.0)
        });
    spec.cost_fields
        .iter()
        .fold(outcome, |outcome, cost| outcome.with_cost(cost.name.clone(), 0.0))
}

/// Registers `spec` with a phase that always returns `outcome`.
pub(crate) fn register_constant(registry: &mut PhaseRegistry, spec: PhaseSpec, outcome: PhaseOutcome) {
    registry
        .register_fn(spec, move |_inputs: &PhaseInputs, _weather: Option<&WeatherSeries>| {
            Ok(outcome.clone())
        })
        .unwrap();
}

/// Registers `spec` with a phase that logs its inputs into `recorder` and
/// returns `outcome`.
pub(crate) fn register_recording(
    registry: &mut PhaseRegistry,
    spec: PhaseSpec,
    outcome: PhaseOutcome,
    recorder: &Recorder,
) {
    let recorder = Arc::clone(recorder);
    registry
        .register_fn(spec, move |inputs: &PhaseInputs, _weather: Option<&WeatherSeries>| {
            recorder
                .lock()
                .unwrap()
                .push((inputs.phase().to_string(), inputs.as_value().clone()));
            Ok(outcome.clone())
        })
        .unwrap();
}

/// Registers `spec` with a phase that always fails with `message`.
pub(crate) fn register_failing(registry: &mut PhaseRegistry, spec: PhaseSpec, message: &str) {
    let message = message.to_string();
    registry
        .register_fn(spec, move |_inputs: &PhaseInputs, _weather: Option<&WeatherSeries>| {
            Err(PhaseError::Computation(message.clone()))
        })
        .unwrap();
}

/// A registry where every spec runs a phase returning its
/// [`placeholder_outcome`].
pub(crate) fn noop_registry(specs: Vec<PhaseSpec>) -> PhaseRegistry {
    let mut registry = PhaseRegistry::new();
    for spec in specs {
        let outcome = placeholder_outcome(&spec);
        register_constant(&mut registry, spec, outcome);
    }
    registry
}

/// Merges `user` without any schema, so only the user's own values and
/// phase lists are present.
pub(crate) fn config_for(user: Value) -> ProjectConfig {
    merge(&user, &InputSchema::default()).unwrap()
}

pub(crate) fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly series starting at [`t0`] with one record per windspeed and a
/// calm sea.
pub(crate) fn hourly_weather(windspeeds: &[f64]) -> WeatherSeries {
    let records = windspeeds
        .iter()
        .enumerate()
        .map(|(hour, speed)| {
            WeatherRecord::new(t0() + Duration::hours(hour as i64))
                .with("windspeed", *speed)
                .with("waveheight", 1.0)
        })
        .collect();
    WeatherSeries::new(records).unwrap()
}
