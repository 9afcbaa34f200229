//! Scour protection around fixed-bottom substructures.
//!
//! - [`ScourProtectionDesign`]: rock volume needed per substructure
//! - [`ScourProtectionInstallation`]: vessel campaign to place that rock

use std::f64::consts::PI;

use log::debug;

use crate::error::PhaseError;
use crate::phase::{FieldSpec, Phase, PhaseInputs, PhaseOutcome, PhaseSpec};
use crate::weather::series::{hours, to_hours};
use crate::weather::{Thresholds, WeatherSeries};

pub const DESIGN_NAME: &str = "ScourProtectionDesign";
pub const INSTALL_NAME: &str = "ScourProtectionInstallation";

const TONS_KEY: &str = "scour_protection.tons_per_substructure";

/// Hours in an average month, used to prorate the port rate.
const HOURS_PER_MONTH: f64 = 730.0;

/// Declaration of [`ScourProtectionDesign`].
pub fn design_spec() -> PhaseSpec {
    PhaseSpec::design(DESIGN_NAME)
        .input(FieldSpec::required("monopile.diameter", "m"))
        .input(FieldSpec::required("plant.num_turbines", "int"))
        .input(FieldSpec::with_default(
            "scour_protection_design.cost_per_tonne",
            "USD/t",
            40.0,
        ))
        .input(FieldSpec::with_default(
            "scour_protection_design.rock_density",
            "kg/m^3",
            2600.0,
        ))
        .input(FieldSpec::with_default(
            "scour_protection_design.soil_friction_angle",
            "deg",
            33.5,
        ))
        .input(FieldSpec::with_default(
            "scour_protection_design.scour_depth_equilibrium",
            "-",
            1.3,
        ))
        .input(FieldSpec::with_default(
            "scour_protection_design.scour_protection_depth",
            "m",
            1.0,
        ))
        .input(FieldSpec::with_default("scour_protection_design.design_time", "h", 0.0))
        .output(TONS_KEY, "t")
        .capex("total_phase_cost")
}

/// Sizes a rock apron from the monopile diameter and the soil friction
/// angle.
#[derive(Debug, Default)]
pub struct ScourProtectionDesign;

impl ScourProtectionDesign {
    pub fn new() -> Self {
        Self
    }
}

impl Phase for ScourProtectionDesign {
    fn run(
        &mut self,
        inputs: &PhaseInputs,
        _weather: Option<&WeatherSeries>,
    ) -> Result<PhaseOutcome, PhaseError> {
        let diameter = inputs.get_f64("monopile.diameter")?;
        let num_turbines = inputs.get_u64("plant.num_turbines")?;
        let cost_per_tonne = inputs.get_f64("scour_protection_design.cost_per_tonne")?;
        let density = inputs.get_f64("scour_protection_design.rock_density")?;
        let friction = inputs.get_f64("scour_protection_design.soil_friction_angle")?;
        let equilibrium = inputs.get_f64("scour_protection_design.scour_depth_equilibrium")?;
        let protection_depth = inputs.get_f64("scour_protection_design.scour_protection_depth")?;

        let scour_depth = equilibrium * diameter;
        let radius = diameter / 2.0 + scour_depth / friction.to_radians().tan();
        let volume = PI * protection_depth * radius.powi(2);
        let tons = (volume * density / 1000.0).ceil();

        let cost = tons * num_turbines as f64 * cost_per_tonne;

        Ok(PhaseOutcome::new()
            .with_output(TONS_KEY, tons)
            .with_cost("total_phase_cost", cost)
            .with_time(inputs.get_f64("scour_protection_design.design_time")?)
            .with_detail("scour_depth", scour_depth)
            .with_detail("protection_radius", radius)
            .with_detail("volume_per_substructure", volume))
    }
}

/// Declaration of [`ScourProtectionInstallation`].
pub fn install_spec() -> PhaseSpec {
    PhaseSpec::install(INSTALL_NAME)
        .input(FieldSpec::required("spi_vessel.day_rate", "USD/day"))
        .input(FieldSpec::required("spi_vessel.rock_capacity", "t"))
        .input(FieldSpec::required("spi_vessel.transit_speed", "km/h"))
        .input(FieldSpec::with_default("spi_vessel.max_windspeed", "m/s", 15.0))
        .input(FieldSpec::with_default("spi_vessel.max_waveheight", "m", 2.5))
        .input(FieldSpec::required("site.distance", "km"))
        .input(FieldSpec::required("plant.num_turbines", "int"))
        .input(FieldSpec::required("plant.turbine_spacing", "rotor diameters"))
        .input(FieldSpec::optional("plant.turbine_distance", "km"))
        .input(FieldSpec::required("turbine.rotor_diameter", "m"))
        .input(FieldSpec::required(TONS_KEY, "t"))
        .input(FieldSpec::with_default("port.monthly_rate", "USD/month", 0.0))
        .input(FieldSpec::with_default(
            "scour_protection_install.load_rocks_time",
            "h",
            4.0,
        ))
        .input(FieldSpec::with_default(
            "scour_protection_install.drop_rocks_time",
            "h",
            10.0,
        ))
        .consumes(TONS_KEY)
        .capex("total_phase_cost")
}

/// Vessel activities of the installation campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    LoadRocks,
    TransitToSite,
    DropRocks,
    TransitBetweenTurbines,
    TransitToPort,
}

impl OperationKind {
    fn label(self) -> &'static str {
        match self {
            Self::LoadRocks => "Load Rocks",
            Self::TransitToSite => "Transit To Site",
            Self::DropRocks => "Drop Rocks",
            Self::TransitBetweenTurbines => "Transit Between Turbines",
            Self::TransitToPort => "Transit To Port",
        }
    }
}

/// A single vessel activity in the installation campaign.
#[derive(Debug, Clone, PartialEq)]
struct Operation {
    kind: OperationKind,
    hours: f64,
}

impl Operation {
    fn new(kind: OperationKind, hours: f64) -> Self {
        Self { kind, hours }
    }

    fn no_window(&self) -> PhaseError {
        PhaseError::NoFeasibleWindow {
            operation: self.kind.label().to_string(),
            duration_hours: self.hours,
        }
    }
}

/// Campaign totals after placing every operation in time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Campaign {
    total_hours: f64,
    delay_hours: f64,
}

/// Simulates a rock-dumping vessel shuttling between port and site until
/// every substructure has its scour protection.
#[derive(Debug, Default)]
pub struct ScourProtectionInstallation;

impl ScourProtectionInstallation {
    pub fn new() -> Self {
        Self
    }
}

/// Vessel and site parameters for one scour protection campaign.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CampaignParams {
    num_turbines: u64,
    /// t
    tons_per_substructure: f64,
    /// t
    capacity: f64,
    /// km
    site_distance: f64,
    /// km
    turbine_distance: f64,
    /// km/h
    transit_speed: f64,
    /// h
    load_time: f64,
    /// h
    drop_time: f64,
}

impl CampaignParams {
    /// Builds the port/site sequence: load at port, transit out, drop rock
    /// at as many substructures as the hold allows, transit back.
    fn plan_operations(&self) -> Result<Vec<Operation>, PhaseError> {
        if self.tons_per_substructure > self.capacity {
            return Err(PhaseError::Computation(format!(
                "vessel rock capacity {} t is below the {} t needed per substructure",
                self.capacity, self.tons_per_substructure
            )));
        }

        let transit = self.site_distance / self.transit_speed;
        let hop = self.turbine_distance / self.transit_speed;

        let mut operations = Vec::new();
        let mut remaining = self.num_turbines;

        while remaining > 0 {
            operations.push(Operation::new(OperationKind::LoadRocks, self.load_time));
            operations.push(Operation::new(OperationKind::TransitToSite, transit));

            let mut on_board = self.capacity;
            loop {
                operations.push(Operation::new(OperationKind::DropRocks, self.drop_time));
                on_board -= self.tons_per_substructure;
                remaining -= 1;

                if remaining == 0 || on_board < self.tons_per_substructure {
                    break;
                }
                operations.push(Operation::new(OperationKind::TransitBetweenTurbines, hop));
            }

            operations.push(Operation::new(OperationKind::TransitToPort, transit));
        }

        Ok(operations)
    }
}

/// Places each operation sequentially, waiting for weather when a series
/// is supplied.
fn run_campaign(
    operations: &[Operation],
    weather: Option<&WeatherSeries>,
    limits: &Thresholds,
) -> Result<Campaign, PhaseError> {
    let Some(weather) = weather else {
        return Ok(Campaign {
            total_hours: operations.iter().map(|op| op.hours).sum(),
            delay_hours: 0.0,
        });
    };

    let Some(start) = weather.start() else {
        return match operations.first() {
            Some(op) => Err(op.no_window()),
            None => Ok(Campaign {
                total_hours: 0.0,
                delay_hours: 0.0,
            }),
        };
    };

    let mut clock = start;
    let mut delay = chrono::Duration::zero();

    for op in operations {
        let duration = hours(op.hours).ok_or_else(|| {
            PhaseError::Computation(format!(
                "'{}' lasts {} h, outside the representable time range",
                op.kind.label(),
                op.hours
            ))
        })?;
        let window = weather
            .schedule(clock, duration, limits)
            .ok_or_else(|| op.no_window())?;
        delay = delay
            .checked_add(&window.delay)
            .ok_or_else(|| PhaseError::Computation("weather delay overflowed".to_string()))?;
        clock = window.end;
    }

    Ok(Campaign {
        total_hours: to_hours(clock - start),
        delay_hours: to_hours(delay),
    })
}

/// Vessel limits restricted to the variables the series actually carries.
fn vessel_limits(
    inputs: &PhaseInputs,
    weather: Option<&WeatherSeries>,
) -> Result<Thresholds, PhaseError> {
    let mut limits = Thresholds::new();
    let Some(weather) = weather else {
        return Ok(limits);
    };

    let available = weather.variables();
    for (variable, key) in [
        ("windspeed", "spi_vessel.max_windspeed"),
        ("waveheight", "spi_vessel.max_waveheight"),
    ] {
        if available.contains(variable) {
            limits.insert(variable.to_string(), inputs.get_f64(key)?);
        } else {
            debug!("Weather series has no '{}' column, not constraining on it", variable);
        }
    }
    Ok(limits)
}

impl Phase for ScourProtectionInstallation {
    fn run(
        &mut self,
        inputs: &PhaseInputs,
        weather: Option<&WeatherSeries>,
    ) -> Result<PhaseOutcome, PhaseError> {
        let day_rate = inputs.get_f64("spi_vessel.day_rate")?;
        let capacity = inputs.get_f64("spi_vessel.rock_capacity")?;
        let transit_speed = inputs.get_f64("spi_vessel.transit_speed")?;
        if transit_speed <= 0.0 {
            return Err(PhaseError::InvalidInput {
                key: "spi_vessel.transit_speed".to_string(),
                expected: "a positive speed",
            });
        }

        let num_turbines = inputs.get_u64("plant.num_turbines")?;
        let turbine_distance = match inputs.opt_f64("plant.turbine_distance")? {
            Some(distance) => distance,
            None => {
                let spacing = inputs.get_f64("plant.turbine_spacing")?;
                let rotor = inputs.get_f64("turbine.rotor_diameter")?;
                spacing * rotor / 1000.0
            }
        };

        let params = CampaignParams {
            num_turbines,
            tons_per_substructure: inputs.get_f64(TONS_KEY)?.ceil(),
            capacity,
            site_distance: inputs.get_f64("site.distance")?,
            turbine_distance,
            transit_speed,
            load_time: inputs.get_f64("scour_protection_install.load_rocks_time")?,
            drop_time: inputs.get_f64("scour_protection_install.drop_rocks_time")?,
        };
        let operations = params.plan_operations()?;

        let limits = vessel_limits(inputs, weather)?;
        let campaign = run_campaign(&operations, weather, &limits)?;

        let vessel_cost = day_rate * campaign.total_hours / 24.0;
        let port_cost =
            inputs.get_f64("port.monthly_rate")? * campaign.total_hours / HOURS_PER_MONTH;
        let trips = operations
            .iter()
            .filter(|op| op.kind == OperationKind::LoadRocks)
            .count();

        let mut outcome = PhaseOutcome::new()
            .with_cost("total_phase_cost", vessel_cost + port_cost)
            .with_time(campaign.total_hours)
            .with_detail("operations", operations.len())
            .with_detail("trips", trips)
            .with_detail("turbine_distance", turbine_distance)
            .with_detail("vessel_cost", vessel_cost)
            .with_detail("port_cost", port_cost)
            .with_detail("weather_delay", campaign.delay_hours);

        if weather.is_some() && limits.is_empty() {
            outcome = outcome.with_warning(
                "weather series carries neither windspeed nor waveheight; no vessel limits applied",
            );
        }

        Ok(outcome)
    }
}
