//! Phase Metadata
//!
//! Static declarations every phase registers alongside its factory:
//! the inputs it reads, the outputs it produces, the cost fields it
//! contributes and (for install phases) the design outputs it consumes.
//!
//! # Example
//!
//! ```
//! use orbiter::phase::{FieldSpec, PhaseSpec};
//!
//! let spec = PhaseSpec::install("MonopileInstallation")
//!     .input(FieldSpec::required("site.distance", "km"))
//!     .input(FieldSpec::required("monopile.mass", "t"))
//!     .input(FieldSpec::with_default("port.monthly_rate", "USD/month", 2.0e6))
//!     .consumes("monopile.mass")
//!     .capex("total_phase_cost");
//!
//! assert_eq!(spec.required_inputs().count(), 2);
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Currency used by cost fields that do not declare one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Whether a phase sizes a component or installs it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PhaseCategory {
    Design,
    Install,
}

impl fmt::Display for PhaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Design => write!(f, "design"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// How an input must be supplied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// Must be present in the user configuration (or wired, for install phases)
    Required,
    /// May be omitted; filled with `default` when one is declared
    Optional {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
}

/// Declaration of a single configuration input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Dotted configuration key
    pub key: String,
    /// Semantic unit or type (e.g. "m", "USD/day", "str")
    pub unit: String,
    pub requirement: Requirement,
}

impl FieldSpec {
    /// Declares a required input.
    pub fn required(key: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unit: unit.into(),
            requirement: Requirement::Required,
        }
    }

    /// Declares an optional input without a default.
    pub fn optional(key: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unit: unit.into(),
            requirement: Requirement::Optional { default: None },
        }
    }

    /// Declares an optional input with a default value.
    pub fn with_default(
        key: impl Into<String>,
        unit: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.into(),
            unit: unit.into(),
            requirement: Requirement::Optional {
                default: Some(default.into()),
            },
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.requirement, Requirement::Required)
    }

    /// Returns the declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        match &self.requirement {
            Requirement::Optional { default } => default.as_ref(),
            Requirement::Required => None,
        }
    }
}

/// Declaration of a value a phase produces.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub key: String,
    pub unit: String,
}

/// Capital or operational expenditure.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    Capex,
    Opex,
}

/// Declaration of a monetary result field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CostField {
    pub name: String,
    pub kind: CostKind,
    pub currency: String,
}

/// Routes a design output into an install input.
///
/// `output` is the design-side key, `input` the install-side key. Both are
/// usually identical.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WireSpec {
    pub input: String,
    pub output: String,
}

/// Static metadata describing a phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhaseSpec {
    /// Unique, case-sensitive phase name
    pub name: String,
    pub category: PhaseCategory,
    #[serde(default)]
    pub inputs: Vec<FieldSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub cost_fields: Vec<CostField>,
    /// Design outputs this phase consumes (install phases only)
    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

impl PhaseSpec {
    fn new(name: impl Into<String>, category: PhaseCategory) -> Self {
        Self {
            name: name.into().trim().to_string(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            cost_fields: Vec::new(),
            wires: Vec::new(),
        }
    }

    /// Starts the declaration of a design phase.
    pub fn design(name: impl Into<String>) -> Self {
        Self::new(name, PhaseCategory::Design)
    }

    /// Starts the declaration of an install phase.
    pub fn install(name: impl Into<String>) -> Self {
        Self::new(name, PhaseCategory::Install)
    }

    /// Adds an input declaration.
    pub fn input(mut self, field: FieldSpec) -> Self {
        self.inputs.push(field);
        self
    }

    /// Adds an output declaration.
    pub fn output(mut self, key: impl Into<String>, unit: impl Into<String>) -> Self {
        self.outputs.push(OutputSpec {
            key: key.into(),
            unit: unit.into(),
        });
        self
    }

    /// Adds a capex field in the default currency.
    pub fn capex(self, name: impl Into<String>) -> Self {
        self.cost(name, CostKind::Capex, DEFAULT_CURRENCY)
    }

    /// Adds an opex field in the default currency.
    pub fn opex(self, name: impl Into<String>) -> Self {
        self.cost(name, CostKind::Opex, DEFAULT_CURRENCY)
    }

    /// Adds a cost field with an explicit kind and currency.
    pub fn cost(
        mut self,
        name: impl Into<String>,
        kind: CostKind,
        currency: impl Into<String>,
    ) -> Self {
        self.cost_fields.push(CostField {
            name: name.into(),
            kind,
            currency: currency.into(),
        });
        self
    }

    /// Consumes the design output with the same key as the given input.
    pub fn consumes(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.consumes_as(key.clone(), key)
    }

    /// Consumes design output `output` as input `input`.
    pub fn consumes_as(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.wires.push(WireSpec {
            input: input.into(),
            output: output.into(),
        });
        self
    }

    /// Looks up an input declaration by key.
    pub fn input_field(&self, key: &str) -> Option<&FieldSpec> {
        self.inputs.iter().find(|f| f.key == key)
    }

    /// Looks up an output declaration by key.
    pub fn output_field(&self, key: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.key == key)
    }

    /// Looks up a cost field declaration by name.
    pub fn cost_field(&self, name: &str) -> Option<&CostField> {
        self.cost_fields.iter().find(|c| c.name == name)
    }

    /// Iterates over required inputs.
    pub fn required_inputs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.inputs.iter().filter(|f| f.is_required())
    }

    /// Checks internal consistency of the declaration.
    ///
    /// Keys must be non-empty dotted paths and unique within their group,
    /// and every wire must target a declared input of an install phase.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| EngineError::InvalidPhaseSpec {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("phase name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.inputs {
            if !is_valid_key(&field.key) {
                return Err(invalid(format!("invalid input key '{}'", field.key)));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(invalid(format!("input '{}' declared twice", field.key)));
            }
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !is_valid_key(&output.key) {
                return Err(invalid(format!("invalid output key '{}'", output.key)));
            }
            if !seen.insert(output.key.as_str()) {
                return Err(invalid(format!("output '{}' declared twice", output.key)));
            }
        }

        let mut seen = HashSet::new();
        for cost in &self.cost_fields {
            if cost.name.trim().is_empty() {
                return Err(invalid("cost field with empty name".to_string()));
            }
            if !seen.insert(cost.name.as_str()) {
                return Err(invalid(format!("cost field '{}' declared twice", cost.name)));
            }
        }

        if !self.wires.is_empty() && self.category == PhaseCategory::Design {
            return Err(invalid("design phases cannot consume design outputs".to_string()));
        }

        for wire in &self.wires {
            if self.input_field(&wire.input).is_none() {
                return Err(invalid(format!(
                    "wire targets undeclared input '{}'",
                    wire.input
                )));
            }
            if !is_valid_key(&wire.output) {
                return Err(invalid(format!("invalid wired output key '{}'", wire.output)));
            }
        }

        Ok(())
    }
}

/// Returns true if `key` is a dotted path with non-empty segments.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.split('.').all(|segment| !segment.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_install() -> PhaseSpec {
        PhaseSpec::install("Sample")
            .input(FieldSpec::required("site.distance", "km"))
            .input(FieldSpec::optional("port.name", "str"))
            .input(FieldSpec::with_default("port.monthly_rate", "USD/month", 2.0e6))
            .input(FieldSpec::required("monopile.mass", "t"))
            .consumes("monopile.mass")
            .capex("total_phase_cost")
    }

    #[test]
    fn test_builder_populates_spec() {
        let spec = sample_install();

        assert_eq!(spec.name, "Sample");
        assert_eq!(spec.category, PhaseCategory::Install);
        assert_eq!(spec.inputs.len(), 4);
        assert_eq!(spec.required_inputs().count(), 2);
        assert_eq!(spec.wires.len(), 1);
        assert_eq!(spec.cost_fields[0].currency, DEFAULT_CURRENCY);
        assert_eq!(spec.cost_fields[0].kind, CostKind::Capex);
    }

    #[test]
    fn test_field_defaults() {
        let spec = sample_install();

        let rate = spec.input_field("port.monthly_rate").unwrap();
        assert!(!rate.is_required());
        assert_eq!(rate.default_value(), Some(&Value::from(2.0e6)));

        let name = spec.input_field("port.name").unwrap();
        assert!(name.default_value().is_none());
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample_install().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_input() {
        let spec = PhaseSpec::design("Dup")
            .input(FieldSpec::required("site.depth", "m"))
            .input(FieldSpec::optional("site.depth", "m"));

        assert!(matches!(
            spec.validate(),
            Err(EngineError::InvalidPhaseSpec { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wire_to_undeclared_input() {
        let spec = PhaseSpec::install("Bad").consumes("monopile.mass");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wires_on_design_phase() {
        let spec = PhaseSpec::design("Bad")
            .input(FieldSpec::required("monopile.mass", "t"))
            .consumes("monopile.mass");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_keys() {
        let spec = PhaseSpec::design("Bad").output("monopile..mass", "t");
        assert!(spec.validate().is_err());

        let spec = PhaseSpec::design("Bad").input(FieldSpec::required("", "t"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("site"));
        assert!(is_valid_key("turbine.hub_height"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(".site"));
        assert!(!is_valid_key("site."));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(PhaseCategory::Design.to_string(), "design");
        assert_eq!(PhaseCategory::Install.to_string(), "install");
    }

    #[test]
    fn test_consumes_as_maps_different_names() {
        let spec = PhaseSpec::install("Renamed")
            .input(FieldSpec::required("substructure.mass", "t"))
            .consumes_as("substructure.mass", "monopile.mass");

        assert_eq!(spec.wires[0].input, "substructure.mass");
        assert_eq!(spec.wires[0].output, "monopile.mass");
        assert!(spec.validate().is_ok());
    }
}
