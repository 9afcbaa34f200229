//! Built-in Phases
//!
//! Reference design and installation phases that ship with the engine.
//!
//! - [`MooringSystemDesign`]: mooring lines and anchors for floating plants
//! - [`ScourProtectionDesign`]: rock mass per substructure
//! - [`ScourProtectionInstallation`]: rock-dumping vessel campaign

pub mod mooring;
pub mod scour;

pub use mooring::MooringSystemDesign;
pub use scour::{ScourProtectionDesign, ScourProtectionInstallation};

use crate::error::Result;

use super::{Phase, PhaseRegistry};

/// Registers every built-in phase into `registry`.
pub fn register_builtin_phases(registry: &mut PhaseRegistry) -> Result<()> {
    registry.register(mooring::NAME, mooring::spec(), || {
        Box::new(MooringSystemDesign::new()) as Box<dyn Phase>
    })?;
    registry.register(scour::DESIGN_NAME, scour::design_spec(), || {
        Box::new(ScourProtectionDesign::new()) as Box<dyn Phase>
    })?;
    registry.register(scour::INSTALL_NAME, scour::install_spec(), || {
        Box::new(ScourProtectionInstallation::new()) as Box<dyn Phase>
    })?;
    Ok(())
}

/// A fresh registry holding only the built-in phases.
pub fn builtin_registry() -> Result<PhaseRegistry> {
    let mut registry = PhaseRegistry::new();
    register_builtin_phases(&mut registry)?;
    Ok(registry)
}
