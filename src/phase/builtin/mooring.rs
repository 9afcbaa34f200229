//! Mooring system and anchor sizing for floating substructures.

use serde_json::Value;

use crate::error::PhaseError;
use crate::phase::{FieldSpec, Phase, PhaseInputs, PhaseOutcome, PhaseSpec};
use crate::weather::WeatherSeries;

pub const NAME: &str = "MooringSystemDesign";

/// A catalogue mooring line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LineType {
    /// m
    diameter: f64,
    /// t/m
    mass_per_m: f64,
    /// USD/m
    cost_rate: f64,
}

const LINE_TYPES: [LineType; 3] = [
    LineType {
        diameter: 0.09,
        mass_per_m: 0.161,
        cost_rate: 399.0,
    },
    LineType {
        diameter: 0.12,
        mass_per_m: 0.288,
        cost_rate: 721.0,
    },
    LineType {
        diameter: 0.15,
        mass_per_m: 0.450,
        cost_rate: 1088.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorType {
    SuctionPile,
    DragEmbedment,
}

impl AnchorType {
    fn parse(key: &str, value: &str) -> Result<Self, PhaseError> {
        match value {
            "Suction Pile" => Ok(Self::SuctionPile),
            "Drag Embedment" => Ok(Self::DragEmbedment),
            _ => Err(PhaseError::InvalidInput {
                key: key.to_string(),
                expected: "'Suction Pile' or 'Drag Embedment'",
            }),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::SuctionPile => "Suction Pile",
            Self::DragEmbedment => "Drag Embedment",
        }
    }
}

/// Declaration of [`MooringSystemDesign`].
pub fn spec() -> PhaseSpec {
    PhaseSpec::design(NAME)
        .input(FieldSpec::required("site.depth", "m"))
        .input(FieldSpec::required("turbine.turbine_rating", "MW"))
        .input(FieldSpec::required("plant.num_turbines", "int"))
        .input(FieldSpec::with_default("mooring_system_design.num_lines", "int", 4))
        .input(FieldSpec::with_default(
            "mooring_system_design.anchor_type",
            "str",
            "Suction Pile",
        ))
        .input(FieldSpec::with_default(
            "mooring_system_design.drag_embedment_fixed_length",
            "km",
            0.5,
        ))
        .input(FieldSpec::with_default("mooring_system_design.design_cost", "USD", 0.0))
        .input(FieldSpec::with_default("mooring_system_design.design_time", "h", 0.0))
        .output("mooring_system.num_lines", "int")
        .output("mooring_system.line_diam", "m")
        .output("mooring_system.line_mass", "t")
        .output("mooring_system.line_length", "m")
        .output("mooring_system.anchor_mass", "t")
        .output("mooring_system.anchor_type", "str")
        .capex("total_phase_cost")
}

/// Sizes mooring lines from turbine rating and water depth, and prices
/// lines plus anchors for the whole plant.
#[derive(Debug, Default)]
pub struct MooringSystemDesign;

impl MooringSystemDesign {
    pub fn new() -> Self {
        Self
    }
}

/// Picks the smallest catalogue line that fits the rating-based diameter.
fn select_line(turbine_rating: f64) -> LineType {
    let fit = -0.0004 * turbine_rating.powi(2) + 0.0132 * turbine_rating + 0.0536;
    LINE_TYPES
        .iter()
        .copied()
        .find(|line| fit <= line.diameter)
        .unwrap_or(LINE_TYPES[LINE_TYPES.len() - 1])
}

/// Minimum breaking load of a line (kN).
fn breaking_load(diameter: f64) -> f64 {
    419_449.0 * diameter.powi(2) + 93_415.0 * diameter - 3_577.9
}

/// Returns (anchor mass in t, anchor cost in USD).
fn anchor_mass_cost(anchor: AnchorType, breaking_load: f64) -> (f64, f64) {
    match anchor {
        AnchorType::DragEmbedment => (20.0, breaking_load / 9.81 / 20.0 * 2000.0),
        AnchorType::SuctionPile => (50.0, (breaking_load / 9.81 / 1250.0).sqrt() * 150_000.0),
    }
}

impl Phase for MooringSystemDesign {
    fn run(
        &mut self,
        inputs: &PhaseInputs,
        _weather: Option<&WeatherSeries>,
    ) -> Result<PhaseOutcome, PhaseError> {
        let depth = inputs.get_f64("site.depth")?;
        let rating = inputs.get_f64("turbine.turbine_rating")?;
        let num_turbines = inputs.get_u64("plant.num_turbines")?;
        let num_lines = inputs.get_u64("mooring_system_design.num_lines")?;

        let anchor_key = "mooring_system_design.anchor_type";
        let anchor = AnchorType::parse(anchor_key, inputs.get_str(anchor_key)?)?;

        let line = select_line(rating);
        let load = breaking_load(line.diameter);

        let fixed_length = match anchor {
            AnchorType::DragEmbedment => {
                inputs.get_f64("mooring_system_design.drag_embedment_fixed_length")?
            }
            AnchorType::SuctionPile => 0.0,
        };
        let line_length = 0.0002 * depth.powi(2) + 1.264 * depth + 47.776 + fixed_length;
        let line_mass = line_length * line.mass_per_m;

        let (anchor_mass, anchor_cost) = anchor_mass_cost(anchor, load);

        let system_cost = num_lines as f64
            * num_turbines as f64
            * (anchor_cost + line_length * line.cost_rate);
        let design_cost = inputs.get_f64("mooring_system_design.design_cost")?;

        Ok(PhaseOutcome::new()
            .with_output("mooring_system.num_lines", num_lines)
            .with_output("mooring_system.line_diam", line.diameter)
            .with_output("mooring_system.line_mass", line_mass)
            .with_output("mooring_system.line_length", line_length)
            .with_output("mooring_system.anchor_mass", anchor_mass)
            .with_output("mooring_system.anchor_type", Value::from(anchor.label()))
            .with_cost("total_phase_cost", system_cost + design_cost)
            .with_time(inputs.get_f64("mooring_system_design.design_time")?)
            .with_detail("breaking_load", load)
            .with_detail("anchor_cost", anchor_cost)
            .with_detail("system_cost", system_cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(anchor: &str) -> PhaseInputs {
        PhaseInputs::new(
            NAME,
            json!({
                "site": {"depth": 200.0},
                "turbine": {"turbine_rating": 12.0},
                "plant": {"num_turbines": 10},
                "mooring_system_design": {
                    "num_lines": 4,
                    "anchor_type": anchor,
                    "drag_embedment_fixed_length": 0.5,
                    "design_cost": 0.0,
                    "design_time": 0.0
                }
            }),
        )
    }

    #[test]
    fn test_spec_is_valid() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn test_select_line_by_rating() {
        assert_eq!(select_line(3.0).diameter, 0.09);
        assert_eq!(select_line(6.0).diameter, 0.12);
        assert_eq!(select_line(12.0).diameter, 0.15);
    }

    #[test]
    fn test_suction_pile_design() {
        let outcome = MooringSystemDesign::new()
            .run(&inputs("Suction Pile"), None)
            .unwrap();

        let length = outcome.outputs["mooring_system.line_length"].as_f64().unwrap();
        assert!((length - 308.576).abs() < 1e-9);
        assert_eq!(outcome.outputs["mooring_system.anchor_mass"], json!(50.0));
        assert_eq!(outcome.outputs["mooring_system.line_diam"], json!(0.15));

        let anchor_cost = (breaking_load(0.15) / 9.81 / 1250.0).sqrt() * 150_000.0;
        let expected = 40.0 * (anchor_cost + 308.576 * 1088.0);
        let total = outcome.costs["total_phase_cost"];
        assert!((total - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_drag_embedment_adds_fixed_length() {
        let outcome = MooringSystemDesign::new()
            .run(&inputs("Drag Embedment"), None)
            .unwrap();

        let length = outcome.outputs["mooring_system.line_length"].as_f64().unwrap();
        assert!((length - 309.076).abs() < 1e-9);
        assert_eq!(outcome.outputs["mooring_system.anchor_mass"], json!(20.0));
        assert_eq!(
            outcome.outputs["mooring_system.anchor_type"],
            json!("Drag Embedment")
        );
    }

    #[test]
    fn test_unknown_anchor_type() {
        let result = MooringSystemDesign::new().run(&inputs("Gravity"), None);
        assert!(matches!(result, Err(PhaseError::InvalidInput { .. })));
    }

    #[test]
    fn test_large_line_counts_do_not_overflow() {
        let small = MooringSystemDesign::new()
            .run(&inputs("Suction Pile"), None)
            .unwrap();

        let mut values = inputs("Suction Pile").as_value().clone();
        values["plant"]["num_turbines"] = json!(1u64 << 32);
        values["mooring_system_design"]["num_lines"] = json!(1u64 << 32);
        let large = MooringSystemDesign::new()
            .run(&PhaseInputs::new(NAME, values), None)
            .unwrap();

        let total = large.costs["total_phase_cost"];
        assert!(total.is_finite());
        let ratio = total / small.costs["total_phase_cost"];
        let expected = (1u64 << 32) as f64 * (1u64 << 32) as f64 / 40.0;
        assert!((ratio - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_outputs_cover_declared_keys() {
        let outcome = MooringSystemDesign::new()
            .run(&inputs("Suction Pile"), None)
            .unwrap();
        for output in spec().outputs {
            assert!(outcome.outputs.contains_key(&output.key), "{}", output.key);
        }
    }
}
