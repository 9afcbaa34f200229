//! Configuration Parser
//!
//! Loads user configurations and weather series from YAML files (JSON is
//! accepted as a YAML subset) and writes compiled schemas back out.

use std::fs;

use log::{debug, info};
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::weather::WeatherSeries;

use super::schema::InputSchema;

fn read_file(path: &str) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_string(),
        source,
    })?;
    debug!("Loaded '{}' ({} bytes)", path, content.len());
    Ok(content)
}

/// Parses a user configuration from YAML text.
///
/// An empty document is an empty configuration.
pub fn parse_config(content: &str) -> Result<Value> {
    let config: Value = serde_yaml::from_str(content)?;

    match config {
        Value::Object(_) => Ok(config),
        Value::Null => Ok(Value::Object(Default::default())),
        other => Err(EngineError::InvalidConfig(format!(
            "configuration root must be a mapping, got {}",
            other
        ))),
    }
}

/// Loads a user configuration from a YAML file.
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Returns
///
/// * `Ok(Value)` - The configuration mapping, not yet merged or validated
/// * `Err` - Read or parse error
///
/// # Example
///
/// ```rust,no_run
/// use orbiter::config::load_config;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_config("project.yaml")?;
///     println!("{}", config["design_phases"]);
///     Ok(())
/// }
/// ```
pub fn load_config(path: &str) -> Result<Value> {
    info!("Loading configuration from: {}", path);
    parse_config(&read_file(path)?)
}

/// Loads a weather series from a YAML or JSON file.
///
/// The file holds a `records` list (each with a `timestamp` and a `values`
/// mapping) and an optional `resolution_minutes`.
pub fn load_weather(path: &str) -> Result<WeatherSeries> {
    info!("Loading weather series from: {}", path);
    let weather: WeatherSeries = serde_yaml::from_str(&read_file(path)?)?;
    info!(
        "Weather series: {} records, {} variables",
        weather.len(),
        weather.variables().len()
    );
    Ok(weather)
}

/// Saves a compiled input schema to a YAML file.
///
/// # Arguments
///
/// * `schema` - The schema to save
/// * `path` - Output file path
pub fn save_schema(schema: &InputSchema, path: &str) -> Result<()> {
    let yaml_content = serde_yaml::to_string(schema)?;
    fs::write(path, yaml_content).map_err(|source| EngineError::Io {
        path: path.to_string(),
        source,
    })?;
    info!("Schema saved to: {}", path);
    Ok(())
}
