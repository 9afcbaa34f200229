//! Error Types
//!
//! Structured errors for configuration compilation, phase resolution,
//! wiring, execution and weather handling. Every variant identifies the
//! field, phase or wiring relation that failed.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::execution::PhaseResult;
use crate::phase::PhaseCategory;

/// Convenience alias used across the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// A required configuration field that is still absent after defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// Dotted configuration key (e.g. `turbine.hub_height`)
    pub key: String,
    /// Phases that declared the field as required
    pub phases: Vec<String>,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (required by {})", self.key, self.phases.join(", "))
    }
}

/// A single incoherent wiring relation between a design output and an
/// install input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiringIssue {
    /// The install input has neither a user value nor a producing design phase.
    NoSource { phase: String, input: String },
    /// The producing design phase declares a different unit for the value.
    UnitMismatch {
        phase: String,
        input: String,
        input_unit: String,
        source_phase: String,
        output: String,
        output_unit: String,
    },
}

impl fmt::Display for WiringIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSource { phase, input } => write!(
                f,
                "phase '{}' requires '{}' but no configuration value or design phase provides it",
                phase, input
            ),
            Self::UnitMismatch {
                phase,
                input,
                input_unit,
                source_phase,
                output,
                output_unit,
            } => write!(
                f,
                "phase '{}' expects '{}' in [{}] but '{}' produces '{}' in [{}]",
                phase, input, input_unit, source_phase, output, output_unit
            ),
        }
    }
}

/// Errors returned by phase implementations.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("missing input '{0}'")]
    MissingInput(String),

    #[error("input '{key}' must be {expected}")]
    InvalidInput { key: String, expected: &'static str },

    #[error("declared output '{0}' was not produced")]
    MissingOutput(String),

    #[error("no feasible weather window for '{operation}' ({duration_hours:.2} h)")]
    NoFeasibleWindow {
        operation: String,
        duration_hours: f64,
    },

    #[error("{0}")]
    Computation(String),
}

/// Errors raised while constructing a weather series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeatherError {
    #[error("duplicate timestamp {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("record {index} at {current} is earlier than its predecessor at {previous}")]
    Unordered {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("resolution must be positive")]
    InvalidResolution,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing required configuration fields: {}", join_display(.fields))]
    MissingRequiredField { fields: Vec<MissingField> },

    #[error("unknown phase '{name}'")]
    UnknownPhase { name: String },

    #[error("phase '{name}' is listed in {expected}_phases but its category is {actual}")]
    WrongCategory {
        name: String,
        expected: PhaseCategory,
        actual: PhaseCategory,
    },

    #[error("{stage} phase '{phase}' failed: {source}")]
    PhaseExecution {
        phase: String,
        stage: PhaseCategory,
        #[source]
        source: PhaseError,
        /// Results of the phases that completed before the failure
        completed: Vec<PhaseResult>,
    },

    #[error("incoherent wiring: {}", join_display(.issues))]
    IncoherentWiring { issues: Vec<WiringIssue> },

    #[error("phase '{0}' is already registered")]
    DuplicatePhase(String),

    #[error("invalid spec for phase '{name}': {reason}")]
    InvalidPhaseSpec { name: String, reason: String },

    #[error("cost field '{field}' of phase '{phase}' is in {currency}, project currency is {expected}")]
    CurrencyMismatch {
        phase: String,
        field: String,
        currency: String,
        expected: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid weather series: {0}")]
    Weather(#[from] WeatherError),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("the global phase registry is already initialised")]
    RegistryAlreadyInitialised,
}

impl EngineError {
    /// Returns the results of phases that completed before a failed run.
    ///
    /// Empty for every error other than [`EngineError::PhaseExecution`].
    pub fn completed_results(&self) -> &[PhaseResult] {
        match self {
            Self::PhaseExecution { completed, .. } => completed,
            _ => &[],
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_lists_every_key() {
        let err = EngineError::MissingRequiredField {
            fields: vec![
                MissingField {
                    key: "turbine.hub_height".to_string(),
                    phases: vec!["MonopileDesign".to_string()],
                },
                MissingField {
                    key: "site.depth".to_string(),
                    phases: vec!["MonopileDesign".to_string(), "MooringSystemDesign".to_string()],
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("turbine.hub_height"));
        assert!(message.contains("site.depth"));
        assert!(message.contains("MooringSystemDesign"));
    }

    #[test]
    fn test_wrong_category_display() {
        let err = EngineError::WrongCategory {
            name: "MooringSystemDesign".to_string(),
            expected: PhaseCategory::Install,
            actual: PhaseCategory::Design,
        };
        assert_eq!(
            err.to_string(),
            "phase 'MooringSystemDesign' is listed in install_phases but its category is design"
        );
    }

    #[test]
    fn test_completed_results_empty_for_config_errors() {
        let err = EngineError::UnknownPhase {
            name: "Ghost".to_string(),
        };
        assert!(err.completed_results().is_empty());
    }

    #[test]
    fn test_wiring_issue_display() {
        let issue = WiringIssue::UnitMismatch {
            phase: "Install".to_string(),
            input: "monopile.mass".to_string(),
            input_unit: "t".to_string(),
            source_phase: "Design".to_string(),
            output: "monopile.mass".to_string(),
            output_unit: "kg".to_string(),
        };
        let message = issue.to_string();
        assert!(message.contains("[t]"));
        assert!(message.contains("[kg]"));
    }
}
