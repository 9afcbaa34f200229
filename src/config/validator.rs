//! Selection Validation
//!
//! Checks the phase lists of a configuration against the registry before
//! any schema work:
//! - Names are non-empty
//! - Every name is registered
//! - Every phase is listed under its own category

use std::fmt;

use log::{debug, info};
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::phase::{PhaseCategory, PhaseRegistry};

use super::merge::{self, read_fixed_costs, read_phase_selection, PhaseSelection};
use super::schema::compile_input_schema;

/// A single problem with a phase selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionIssue {
    EmptyName { list: &'static str, index: usize },
    Unknown(String),
    WrongCategory {
        name: String,
        expected: PhaseCategory,
        actual: PhaseCategory,
    },
}

impl fmt::Display for SelectionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName { list, index } => {
                write!(f, "{}[{}] is empty or whitespace-only", list, index)
            }
            Self::Unknown(name) => write!(f, "Unknown phase '{}'", name),
            Self::WrongCategory {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Phase '{}' is listed in {}_phases but its category is {}",
                name, expected, actual
            ),
        }
    }
}

impl From<SelectionIssue> for EngineError {
    fn from(issue: SelectionIssue) -> Self {
        match issue {
            SelectionIssue::EmptyName { .. } => EngineError::InvalidConfig(issue.to_string()),
            SelectionIssue::Unknown(name) => EngineError::UnknownPhase { name },
            SelectionIssue::WrongCategory {
                name,
                expected,
                actual,
            } => EngineError::WrongCategory {
                name,
                expected,
                actual,
            },
        }
    }
}

/// Collects every selection problem, ordered by kind: empty names, then
/// unknown names (design list first), then category mismatches.
fn selection_issues(registry: &PhaseRegistry, selection: &PhaseSelection) -> Vec<SelectionIssue> {
    let lists = [
        (merge::DESIGN_PHASES_KEY, PhaseCategory::Design, &selection.design),
        (merge::INSTALL_PHASES_KEY, PhaseCategory::Install, &selection.install),
    ];

    let mut empty = Vec::new();
    let mut unknown = Vec::new();
    let mut misplaced = Vec::new();

    for (list, expected, names) in lists {
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                empty.push(SelectionIssue::EmptyName { list, index });
                continue;
            }

            match registry.spec(name) {
                None => unknown.push(SelectionIssue::Unknown(name.clone())),
                Some(spec) if spec.category != expected => {
                    misplaced.push(SelectionIssue::WrongCategory {
                        name: name.clone(),
                        expected,
                        actual: spec.category,
                    })
                }
                Some(_) => {}
            }
        }
    }

    empty.into_iter().chain(unknown).chain(misplaced).collect()
}

/// Validates a phase selection against the registry.
///
/// Returns the first issue in the order documented on this module, so an
/// unknown install phase is reported before any design phase could run.
pub fn validate_phase_selection(registry: &PhaseRegistry, selection: &PhaseSelection) -> Result<()> {
    info!(
        "Validating selection: {} design, {} install phases",
        selection.design.len(),
        selection.install.len()
    );

    if let Some(issue) = selection_issues(registry, selection).into_iter().next() {
        return Err(issue.into());
    }

    debug!("Phase selection is valid");
    Ok(())
}

/// Quick validation that returns a list of error messages.
///
/// Useful for tooling that wants every problem at once instead of the
/// first failure.
pub fn quick_validate(user: &Value, registry: &PhaseRegistry) -> Vec<String> {
    let mut errors = Vec::new();

    let selection = match read_phase_selection(user) {
        Ok(selection) => selection,
        Err(e) => {
            errors.push(e.to_string());
            return errors;
        }
    };

    if let Err(e) = read_fixed_costs(user) {
        errors.push(e.to_string());
    }

    let issues = selection_issues(registry, &selection);
    if !issues.is_empty() {
        errors.extend(issues.iter().map(|issue| issue.to_string()));
        return errors;
    }

    let schema = match compile_input_schema(registry, &selection.all()) {
        Ok(schema) => schema,
        Err(e) => {
            errors.push(e.to_string());
            return errors;
        }
    };

    if let Err(EngineError::MissingRequiredField { fields }) = merge::merge(user, &schema) {
        errors.extend(
            fields
                .iter()
                .map(|field| format!("Missing required field {}", field)),
        );
    }

    errors
}
