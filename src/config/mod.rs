//! Configuration Compiler
//!
//! Turns a user configuration into the canonical [`ProjectConfig`] consumed
//! by the orchestrator.
//!
//! # Structure
//!
//! - [`path`]: Dotted-key access into nested mappings
//! - [`schema`]: Input schema compiled from selected phases
//! - [`merge`]: User values + defaults -> canonical configuration
//! - [`project`]: The immutable [`ProjectConfig`]
//! - [`validator`]: Phase selection checks
//! - [`parser`]: YAML loading and saving

pub mod merge;
pub mod parser;
pub mod path;
pub mod project;
pub mod schema;
pub mod validator;

pub use merge::{merge, read_phase_selection, PhaseSelection};
pub use parser::{load_config, load_weather, parse_config, save_schema};
pub use project::{FieldSource, ProjectConfig};
pub use schema::{compile_input_schema, InputSchema, SchemaField, SchemaRequirement};
pub use validator::{quick_validate, validate_phase_selection};
