//! Phase Contract and Registry
//!
//! Design phases size a project component and price it; install phases
//! compute the vessel time and cost to install it, optionally under a
//! weather constraint.
//!
//! # Structure
//!
//! - [`spec`]: Static declarations (inputs, outputs, cost fields, wiring)
//! - [`contract`]: The [`Phase`] trait and its input/outcome types
//! - [`registry`]: Name -> implementation catalog
//! - [`builtin`]: Reference phases shipped with the engine

pub mod builtin;
pub mod contract;
pub mod registry;
pub mod spec;

pub use contract::{FnPhase, Phase, PhaseFactory, PhaseInputs, PhaseOutcome};
pub use registry::{PhaseRegistry, RegisteredPhase};
pub use spec::{
    CostField, CostKind, FieldSpec, OutputSpec, PhaseCategory, PhaseSpec, Requirement, WireSpec,
    DEFAULT_CURRENCY,
};
