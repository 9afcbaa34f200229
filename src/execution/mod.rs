//! Project Execution Module
//!
//! Runs a compiled project: planning, design-to-install wiring, phase
//! execution and result collection.
//!
//! # Architecture
//!
//! - [`engine`]: The [`ProjectManager`] orchestrating a run
//! - [`planner`]: Resolved, validated execution order and run progress
//! - [`wiring`]: Design outputs bound to install inputs
//! - [`runner`]: Individual phase execution and output checks
//! - [`result`]: Per-phase results

pub mod engine;
pub mod planner;
pub mod result;
pub mod runner;
pub mod wiring;

pub use engine::ProjectManager;
pub use planner::{ExecutionPlan, PlannedPhase};
pub use result::{CostLine, PhaseLog, PhaseResult};
pub use runner::execute_phase;
pub use wiring::{WireBinding, WiringPlan};
