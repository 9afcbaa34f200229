//! Orbiter CLI Entry Point
//!
//! Provides command-line interface for project runs.
//!
//! # Usage
//!
//! ```bash
//! # Run a project
//! orbiter project.yaml
//!
//! # Constrain installation by a weather series
//! orbiter project.yaml --weather weather.yaml
//!
//! # Print the inputs the selected phases read
//! orbiter project.yaml --schema
//!
//! # Full result as JSON, four phases at a time
//! orbiter project.yaml --json --parallel 4
//! ```

use std::env;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use orbiter::config::{load_config, load_weather, quick_validate, read_phase_selection};
use orbiter::execution::ProjectManager;
use orbiter::phase::builtin::builtin_registry;
use orbiter::phase::registry::install_global;
use orbiter::{EngineError, ProjectResult, APP_NAME, VERSION};

/// Default maximum parallel phases.
const DEFAULT_MAX_PARALLEL: usize = 1;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    config_path: Option<String>,
    weather_path: Option<String>,
    schema_only: bool,
    json: bool,
    max_parallel: usize,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            weather_path: None,
            schema_only: false,
            json: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Offshore Wind Project Orchestration Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: orbiter [OPTIONS] <CONFIG_FILE>");
    println!();
    println!("Arguments:");
    println!("  <CONFIG_FILE>       Path to project configuration YAML file");
    println!();
    println!("Options:");
    println!("  --weather PATH      Weather series (YAML or JSON) for install phases");
    println!("  --schema            Print the input schema of the selected phases and exit");
    println!("  --json              Print the full project result as JSON");
    println!("  --parallel N        Maximum parallel phases per group (default: {})", DEFAULT_MAX_PARALLEL);
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  orbiter project.yaml");
    println!("  orbiter project.yaml --weather weather.yaml --parallel 4");
    println!("  orbiter project.yaml --schema");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--schema" => {
                config.schema_only = true;
            }
            "--json" => {
                config.json = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--weather" => {
                i += 1;
                if i >= args.len() {
                    return Err("--weather requires a path argument".to_string());
                }
                config.weather_path = Some(args[i].clone());
            }
            "--parallel" => {
                i += 1;
                if i >= args.len() {
                    return Err("--parallel requires a number argument".to_string());
                }
                config.max_parallel = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid parallel value: {}", args[i]))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.config_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.config_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.config_path.is_none() {
        return Err("Missing <CONFIG_FILE> argument".to_string());
    }

    Ok(config)
}

/// Prints the cost summary of a finished project.
fn print_summary(project: &ProjectResult) {
    println!();
    println!("{}", "Project completed successfully".green().bold());
    println!();

    for result in project.results() {
        let warnings = if result.log.warnings.is_empty() {
            String::new()
        } else {
            format!(" ({} warnings)", result.log.warnings.len())
                .yellow()
                .to_string()
        };
        println!(
            "  {:<8} {:<32} {:>18.2} {}  {:>9.1} h{}",
            result.category.to_string(),
            result.name,
            result.capex(),
            project.currency,
            result.phase_time,
            warnings
        );
    }

    println!();
    for (name, amount) in &project.fixed_costs {
        println!("  {:<41} {:>18.2} {}", name, amount, project.currency);
    }
    println!();
    println!("{}", project.summary());
    println!();
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    let quiet = config.json || config.schema_only;
    if !quiet {
        print_banner();
    }

    let config_path = config.config_path.as_deref().unwrap_or_default();
    let user = load_config(config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        format!("Could not load configuration from '{}': {}", config_path, e)
    })?;

    let registry = install_global(builtin_registry()?)?;
    info!("Registered {} phases: {}", registry.len(), registry.names().join(", "));

    let mut manager = ProjectManager::new(registry);
    manager.set_max_parallel(config.max_parallel);

    if config.schema_only {
        let selection = read_phase_selection(&user)?;
        let schema = manager.compile_input_schema(&selection.all())?;
        print!("{}", serde_yaml::to_string(&schema)?);
        return Ok(());
    }

    let problems = quick_validate(&user, manager.registry());
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {} {}", "-".red(), problem);
        }
        return Err(format!("Configuration has {} problem(s)", problems.len()).into());
    }

    let weather = match config.weather_path.as_deref() {
        Some(path) => Some(load_weather(path)?),
        None => None,
    };

    let project = manager
        .run_user_config(&user, weather.as_ref())
        .map_err(|e| {
            if let EngineError::PhaseExecution { completed, .. } = &e {
                info!("{} phases completed before the failure", completed.len());
            }
            e
        })?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&project)?);
    } else {
        print_summary(&project);
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
