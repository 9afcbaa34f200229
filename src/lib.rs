//! Orbiter - Offshore Wind Project Orchestration Engine
//!
//! Composes independent design and installation phases into a project
//! cost and schedule model for offshore wind balance-of-system work.
//! Design phases size components; install phases schedule vessel work,
//! optionally against a weather series; the engine wires design outputs
//! into install inputs and rolls every cost field into project totals.
//!
//! # Architecture
//!
//! The library is organized into six modules:
//!
//! - [`phase`]: The phase contract, its declarations and the registry
//! - [`config`]: Input schemas and the user configuration compiler
//! - [`weather`]: Weather series and operation window queries
//! - [`execution`]: The [`ProjectManager`] orchestrating a run
//! - [`cost`]: Cost aggregation into a [`ProjectResult`]
//! - [`error`]: Structured error types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use orbiter::phase::builtin::builtin_registry;
//! use orbiter::{load_config, load_weather, ProjectManager};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the project and its weather
//!     let user = load_config("project.yaml")?;
//!     let weather = load_weather("weather.yaml")?;
//!
//!     // Create the orchestrator over the built-in phases
//!     let manager = ProjectManager::new(Arc::new(builtin_registry()?));
//!
//!     // Run the project
//!     let project = manager.run_user_config(&user, Some(&weather))?;
//!     println!("{}", project.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod execution;
pub mod phase;
pub mod weather;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{load_config, load_weather, ProjectConfig};
pub use cost::ProjectResult;
pub use error::{EngineError, PhaseError, Result};
pub use execution::{PhaseResult, ProjectManager};
pub use phase::{Phase, PhaseRegistry, PhaseSpec};
pub use weather::WeatherSeries;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Orbiter";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Orbiter");
    }

    #[test]
    fn test_module_exports_registry() {
        let registry = PhaseRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
