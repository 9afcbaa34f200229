//! Configuration Merge
//!
//! Combines a user configuration with a compiled [`InputSchema`] into a
//! [`ProjectConfig`]: user values are kept as-is, absent optional fields
//! receive their declared defaults and every still-absent required field is
//! reported at once.

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::error::{EngineError, MissingField, Result};

use super::path;
use super::project::{FieldSource, ProjectConfig};
use super::schema::{InputSchema, SchemaRequirement};

/// Top-level key listing design phases in execution order.
pub const DESIGN_PHASES_KEY: &str = "design_phases";
/// Top-level key listing install phases in execution order.
pub const INSTALL_PHASES_KEY: &str = "install_phases";
/// Top-level mapping of project-level fixed costs.
pub const PROJECT_PARAMETERS_KEY: &str = "project_parameters";

/// Phase names selected by a user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseSelection {
    pub design: Vec<String>,
    pub install: Vec<String>,
}

impl PhaseSelection {
    /// All selected names, design first, duplicates preserved.
    pub fn all(&self) -> Vec<&str> {
        self.design
            .iter()
            .chain(self.install.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Reads `design_phases` and `install_phases` from a user configuration.
///
/// Absent or `null` lists are empty. Entries must be strings.
pub fn read_phase_selection(user: &Value) -> Result<PhaseSelection> {
    let root = user.as_object().ok_or_else(|| {
        EngineError::InvalidConfig("configuration root must be a mapping".to_string())
    })?;

    Ok(PhaseSelection {
        design: read_phase_list(root.get(DESIGN_PHASES_KEY), DESIGN_PHASES_KEY)?,
        install: read_phase_list(root.get(INSTALL_PHASES_KEY), INSTALL_PHASES_KEY)?,
    })
}

fn read_phase_list(value: Option<&Value>, key: &str) -> Result<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(EngineError::InvalidConfig(format!(
                "'{}' must be a list of phase names, got {}",
                key, other
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "{}[{}] must be a phase name, got {}",
                    key, index, item
                ))
            })
        })
        .collect()
}

/// Reads the numeric fixed costs under `project_parameters`.
pub fn read_fixed_costs(user: &Value) -> Result<BTreeMap<String, f64>> {
    let params = match user.get(PROJECT_PARAMETERS_KEY) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(params)) => params,
        Some(other) => {
            return Err(EngineError::InvalidConfig(format!(
                "'{}' must be a mapping, got {}",
                PROJECT_PARAMETERS_KEY, other
            )))
        }
    };

    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            value
                .as_f64()
                .filter(|amount| amount.is_finite())
                .map(|amount| (name.clone(), amount))
                .ok_or_else(|| {
                    EngineError::InvalidConfig(format!(
                        "{}.{} must be a number, got {}",
                        PROJECT_PARAMETERS_KEY, name, value
                    ))
                })
        })
        .collect()
}

/// Merges a user configuration with a compiled schema.
///
/// Pure: the user configuration is not modified, and merging the output
/// again with the same schema yields the same values.
///
/// # Arguments
///
/// * `user` - User configuration mapping
/// * `schema` - Schema compiled for the selected phases
///
/// # Returns
///
/// * `Ok(ProjectConfig)` - Canonical configuration with defaults filled
/// * `Err(EngineError::MissingRequiredField)` - Every required key still absent
/// * `Err(EngineError::InvalidConfig)` - Malformed reserved keys
pub fn merge(user: &Value, schema: &InputSchema) -> Result<ProjectConfig> {
    let selection = read_phase_selection(user)?;
    let fixed_costs = read_fixed_costs(user)?;

    let mut values = user.clone();
    let mut sources = BTreeMap::new();
    let mut missing = Vec::new();

    for (key, field) in &schema.fields {
        if path::contains(user, key) {
            sources.insert(key.clone(), FieldSource::User);
            continue;
        }

        match (&field.requirement, field.requirement.default_value()) {
            (_, Some(default)) => {
                debug!("Filling '{}' with default {}", key, default);
                path::insert(&mut values, key, default.clone())?;
                sources.insert(key.clone(), FieldSource::Default);
            }
            (SchemaRequirement::Required, None) => missing.push(MissingField {
                key: key.clone(),
                phases: field.phases.clone(),
            }),
            _ => {}
        }
    }

    if !missing.is_empty() {
        return Err(EngineError::MissingRequiredField { fields: missing });
    }

    Ok(ProjectConfig::new(
        values,
        sources,
        selection.design,
        selection.install,
        fixed_costs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SchemaField;
    use serde_json::json;

    fn field(requirement: SchemaRequirement, phases: &[&str]) -> SchemaField {
        SchemaField {
            unit: "-".to_string(),
            requirement,
            phases: phases.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn schema() -> InputSchema {
        InputSchema {
            phases: vec!["A".to_string(), "B".to_string()],
            fields: BTreeMap::from([
                (
                    "site.depth".to_string(),
                    field(SchemaRequirement::Required, &["A"]),
                ),
                (
                    "turbine.hub_height".to_string(),
                    field(SchemaRequirement::Required, &["A", "B"]),
                ),
                (
                    "site.mean_windspeed".to_string(),
                    field(
                        SchemaRequirement::Optional {
                            default: Some(json!(9.0)),
                        },
                        &["B"],
                    ),
                ),
                (
                    "site.name".to_string(),
                    field(SchemaRequirement::Optional { default: None }, &["B"]),
                ),
                (
                    "monopile.length".to_string(),
                    field(
                        SchemaRequirement::Wired {
                            from: vec!["A".to_string()],
                            default: None,
                        },
                        &["B"],
                    ),
                ),
            ]),
        }
    }

    #[test]
    fn test_merge_fills_defaults_and_keeps_user_values() {
        let user = json!({
            "design_phases": ["A"],
            "install_phases": ["B"],
            "site": {"depth": 30.0},
            "turbine": {"hub_height": 110.0},
            "extra": {"ignored": true}
        });

        let config = merge(&user, &schema()).unwrap();

        assert_eq!(config.get_f64("site.depth"), Some(30.0));
        assert_eq!(config.get_f64("site.mean_windspeed"), Some(9.0));
        assert_eq!(config.source_of("site.mean_windspeed"), Some(FieldSource::Default));
        assert_eq!(config.source_of("site.depth"), Some(FieldSource::User));
        assert!(config.get("site.name").is_none());
        assert!(config.get("monopile.length").is_none());
        assert_eq!(config.design_phases(), ["A"]);
        assert_eq!(config.install_phases(), ["B"]);
        // Unknown keys are carried along
        assert_eq!(config.get("extra.ignored"), Some(&json!(true)));
    }

    #[test]
    fn test_merge_reports_every_missing_field() {
        let user = json!({"design_phases": ["A"], "site": {"depth": null}});

        match merge(&user, &schema()) {
            Err(EngineError::MissingRequiredField { fields }) => {
                let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
                assert_eq!(keys, vec!["site.depth", "turbine.hub_height"]);
                assert_eq!(fields[1].phases, vec!["A", "B"]);
            }
            other => panic!("expected MissingRequiredField, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let user = json!({
            "site": {"depth": 30.0},
            "turbine": {"hub_height": 110.0}
        });

        let once = merge(&user, &schema()).unwrap();
        let twice = merge(once.as_value(), &schema()).unwrap();

        assert_eq!(once.as_value(), twice.as_value());
    }

    #[test]
    fn test_merge_does_not_touch_input() {
        let user = json!({"site": {"depth": 30.0}, "turbine": {"hub_height": 110.0}});
        let before = user.clone();
        merge(&user, &schema()).unwrap();
        assert_eq!(user, before);
    }

    #[test]
    fn test_missing_phase_lists_are_empty() {
        let selection = read_phase_selection(&json!({"design_phases": null})).unwrap();
        assert!(selection.design.is_empty());
        assert!(selection.install.is_empty());
    }

    #[test]
    fn test_phase_list_must_hold_strings() {
        let result = read_phase_selection(&json!({"install_phases": ["A", 3]}));
        assert!(matches!(result, Err(EngineError::InvalidConfig(msg)) if msg.contains("install_phases[1]")));

        let result = read_phase_selection(&json!({"design_phases": "A"}));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let result = merge(&json!([1, 2]), &InputSchema::default());
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_fixed_costs() {
        let costs = read_fixed_costs(&json!({
            "project_parameters": {"site_auction_price": 100e6, "site_assessment_cost": 50e6}
        }))
        .unwrap();
        assert_eq!(costs["site_auction_price"], 100e6);
        assert_eq!(costs.len(), 2);

        let result = read_fixed_costs(&json!({"project_parameters": {"commissioning": "high"}}));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_selection_all() {
        let selection = PhaseSelection {
            design: vec!["A".to_string(), "A".to_string()],
            install: vec!["B".to_string()],
        };
        assert_eq!(selection.all(), vec!["A", "A", "B"]);
    }
}
