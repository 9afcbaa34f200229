//! Input Schema
//!
//! Union of the inputs declared by a set of selected phases. Each key is
//! annotated with its unit, the phases that declare it and whether the user
//! must supply it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::phase::{PhaseCategory, PhaseRegistry, PhaseSpec};

/// Merged requirement of a configuration key across selected phases.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaRequirement {
    /// The user must supply the value
    Required,
    /// The value may be omitted and is filled with `default` if one exists
    Optional {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    /// Supplied by the design phases in `from` unless the user sets it
    Wired {
        from: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
}

impl SchemaRequirement {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Self::Required => None,
            Self::Optional { default } | Self::Wired { default, .. } => default.as_ref(),
        }
    }
}

/// One key of the compiled schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub unit: String,
    pub requirement: SchemaRequirement,
    /// Phases declaring this key, sorted
    pub phases: Vec<String>,
}

/// Compiled input schema for a selection of phases.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct InputSchema {
    /// Selected phase names, sorted and deduplicated
    pub phases: Vec<String>,
    pub fields: BTreeMap<String, SchemaField>,
}

impl InputSchema {
    pub fn field(&self, key: &str) -> Option<&SchemaField> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Keys the user must supply.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, field)| field.requirement.is_required())
            .map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-key state while folding phase declarations together.
struct FieldAccumulator {
    unit: String,
    default: Option<Value>,
    needs_user: bool,
    wired_from: BTreeSet<String>,
    phases: BTreeSet<String>,
}

impl FieldAccumulator {
    fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
            default: None,
            needs_user: false,
            wired_from: BTreeSet::new(),
            phases: BTreeSet::new(),
        }
    }

    fn finish(self) -> SchemaField {
        let requirement = if self.needs_user {
            SchemaRequirement::Required
        } else if !self.wired_from.is_empty() {
            SchemaRequirement::Wired {
                from: self.wired_from.into_iter().collect(),
                default: self.default,
            }
        } else {
            SchemaRequirement::Optional {
                default: self.default,
            }
        };

        SchemaField {
            unit: self.unit,
            requirement,
            phases: self.phases.into_iter().collect(),
        }
    }
}

/// Compiles the input schema of the selected phases.
///
/// The result depends only on the set of names: order and duplicates are
/// irrelevant. When several phases declare the same key, a required
/// declaration dominates, the first default (in phase name order) wins and
/// the first unit is kept. Required install inputs that are wired to an
/// output of a selected design phase are reported as
/// [`SchemaRequirement::Wired`] and are not demanded from the user.
///
/// # Arguments
///
/// * `registry` - Catalog to resolve names against
/// * `names` - Selected phase names (design and install)
///
/// # Returns
///
/// * `Ok(InputSchema)` - Union of the declared inputs
/// * `Err(EngineError::UnknownPhase)` - A name is not registered
pub fn compile_input_schema<S: AsRef<str>>(
    registry: &PhaseRegistry,
    names: &[S],
) -> Result<InputSchema> {
    let selected: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();

    let specs: Vec<Arc<PhaseSpec>> = selected
        .iter()
        .map(|name| registry.resolve(name).map(|phase| Arc::clone(&phase.spec)))
        .collect::<Result<_>>()?;

    // Output key -> design phases producing it
    let mut producers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for spec in specs.iter().filter(|s| s.category == PhaseCategory::Design) {
        for output in &spec.outputs {
            producers
                .entry(output.key.as_str())
                .or_default()
                .push(spec.name.as_str());
        }
    }

    let mut fields: BTreeMap<String, FieldAccumulator> = BTreeMap::new();

    for spec in &specs {
        for field in &spec.inputs {
            let wired_by = spec
                .wires
                .iter()
                .find(|wire| wire.input == field.key)
                .and_then(|wire| producers.get(wire.output.as_str()));

            let acc = fields
                .entry(field.key.clone())
                .or_insert_with(|| FieldAccumulator::new(&field.unit));

            if acc.unit != field.unit {
                warn!(
                    "'{}' is declared in [{}] by {} but in [{}] earlier; keeping [{}]",
                    field.key, field.unit, spec.name, acc.unit, acc.unit
                );
            }

            if let Some(default) = field.default_value() {
                if let Some(existing) = &acc.default {
                    if existing != default {
                        warn!(
                            "Conflicting defaults for '{}': keeping {}, ignoring {} from {}",
                            field.key, existing, default, spec.name
                        );
                    }
                } else {
                    acc.default = Some(default.clone());
                }
            }

            match wired_by {
                Some(from) => {
                    debug!("'{}' of {} is wired from {:?}", field.key, spec.name, from);
                    acc.wired_from.extend(from.iter().map(|name| name.to_string()));
                }
                None if field.is_required() => acc.needs_user = true,
                None => {}
            }

            acc.phases.insert(spec.name.clone());
        }
    }

    let schema = InputSchema {
        phases: selected.iter().map(|name| name.to_string()).collect(),
        fields: fields
            .into_iter()
            .map(|(key, acc)| (key, acc.finish()))
            .collect(),
    };

    debug!(
        "Compiled input schema: {} phases, {} keys ({} required)",
        schema.phases.len(),
        schema.len(),
        schema.required_keys().count()
    );

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, PhaseError};
    use crate::phase::{FieldSpec, PhaseInputs, PhaseOutcome};
    use crate::weather::WeatherSeries;
    use serde_json::json;

    fn noop(
        _inputs: &PhaseInputs,
        _weather: Option<&WeatherSeries>,
    ) -> std::result::Result<PhaseOutcome, PhaseError> {
        Ok(PhaseOutcome::new())
    }

    fn registry() -> PhaseRegistry {
        let mut registry = PhaseRegistry::new();

        registry
            .register_fn(
                PhaseSpec::design("SiteDesign")
                    .input(FieldSpec::required("site.depth", "m"))
                    .input(FieldSpec::with_default("site.mean_windspeed", "m/s", 9.0))
                    .output("substructure.length", "m"),
                noop,
            )
            .unwrap();
        registry
            .register_fn(
                PhaseSpec::design("TurbineDesign")
                    .input(FieldSpec::required("turbine.turbine_rating", "MW"))
                    .input(FieldSpec::with_default("site.mean_windspeed", "m/s", 8.0)),
                noop,
            )
            .unwrap();
        registry
            .register_fn(
                PhaseSpec::install("SubstructureInstall")
                    .input(FieldSpec::required("site.depth", "m"))
                    .input(FieldSpec::required("substructure.length", "m"))
                    .input(FieldSpec::required("vessel.day_rate", "USD/day"))
                    .consumes("substructure.length"),
                noop,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_union_of_selected_phases() {
        let schema = compile_input_schema(&registry(), &["SiteDesign", "TurbineDesign"]).unwrap();

        assert_eq!(schema.phases, vec!["SiteDesign", "TurbineDesign"]);
        assert_eq!(
            schema.keys().collect::<Vec<_>>(),
            vec!["site.depth", "site.mean_windspeed", "turbine.turbine_rating"]
        );
        assert_eq!(
            schema.field("site.mean_windspeed").unwrap().phases,
            vec!["SiteDesign", "TurbineDesign"]
        );
    }

    #[test]
    fn test_unselected_phase_fields_excluded() {
        let schema = compile_input_schema(&registry(), &["TurbineDesign"]).unwrap();
        assert!(!schema.contains("site.depth"));
        assert!(!schema.contains("vessel.day_rate"));
    }

    #[test]
    fn test_first_default_wins_in_name_order() {
        let schema = compile_input_schema(&registry(), &["TurbineDesign", "SiteDesign"]).unwrap();
        assert_eq!(
            schema.field("site.mean_windspeed").unwrap().requirement,
            SchemaRequirement::Optional {
                default: Some(json!(9.0))
            }
        );
    }

    #[test]
    fn test_order_and_duplicates_irrelevant() {
        let reg = registry();
        let a = compile_input_schema(&reg, &["SiteDesign", "SubstructureInstall"]).unwrap();
        let b = compile_input_schema(
            &reg,
            &["SubstructureInstall", "SiteDesign", "SubstructureInstall"],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wired_input_not_required() {
        let schema =
            compile_input_schema(&registry(), &["SiteDesign", "SubstructureInstall"]).unwrap();

        assert_eq!(
            schema.field("substructure.length").unwrap().requirement,
            SchemaRequirement::Wired {
                from: vec!["SiteDesign".to_string()],
                default: None
            }
        );
        assert_eq!(
            schema.required_keys().collect::<Vec<_>>(),
            vec!["site.depth", "vessel.day_rate"]
        );
    }

    #[test]
    fn test_wire_without_selected_producer_is_required() {
        let schema = compile_input_schema(&registry(), &["SubstructureInstall"]).unwrap();
        assert!(schema
            .field("substructure.length")
            .unwrap()
            .requirement
            .is_required());
    }

    #[test]
    fn test_unknown_phase() {
        let result = compile_input_schema(&registry(), &["SiteDesign", "Nope"]);
        assert!(matches!(result, Err(EngineError::UnknownPhase { name }) if name == "Nope"));
    }

    #[test]
    fn test_empty_selection() {
        let names: [&str; 0] = [];
        let schema = compile_input_schema(&registry(), &names).unwrap();
        assert!(schema.is_empty());
        assert!(schema.phases.is_empty());
    }
}
