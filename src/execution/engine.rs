//! Project Execution Engine
//!
//! The orchestrator that runs a compiled project:
//! - Validates the plan and the design-to-install wiring up front
//! - Runs the design group, then the install group
//! - Optional parallel execution within a group, results kept in order
//! - Aggregates costs into a [`ProjectResult`]

use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::config::{
    compile_input_schema, merge, read_phase_selection, validate_phase_selection, InputSchema,
    ProjectConfig,
};
use crate::cost::{aggregate, ProjectResult};
use crate::error::{EngineError, PhaseError, Result};
use crate::phase::{PhaseCategory, PhaseInputs, PhaseRegistry, DEFAULT_CURRENCY};
use crate::weather::WeatherSeries;

use super::planner::{ExecutionPlan, PlannedPhase};
use super::result::PhaseResult;
use super::runner::execute_phase;
use super::wiring::WiringPlan;

/// Default number of phases run at once within a group.
const DEFAULT_MAX_PARALLEL: usize = 1;

/// A phase ready to execute with its input view.
struct Job {
    planned: PlannedPhase,
    inputs: PhaseInputs,
    wired: Vec<String>,
}

/// The first failed phase of a group.
struct Failure {
    phase: String,
    stage: PhaseCategory,
    source: PhaseError,
}

impl Failure {
    fn into_error(self, completed: Vec<PhaseResult>) -> EngineError {
        EngineError::PhaseExecution {
            phase: self.phase,
            stage: self.stage,
            source: self.source,
            completed,
        }
    }
}

/// Project orchestrator.
///
/// Holds the phase catalog and run options. A manager carries no state
/// between runs, so independent `run` calls never interfere.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use orbiter::config::load_config;
/// use orbiter::execution::ProjectManager;
/// use orbiter::phase::builtin::builtin_registry;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let user = load_config("project.yaml")?;
///
///     let mut manager = ProjectManager::new(Arc::new(builtin_registry()?));
///     manager.set_max_parallel(4);
///
///     let project = manager.run_user_config(&user, None)?;
///     println!("Total CapEx: {:.2}", project.total_capex);
///     Ok(())
/// }
/// ```
pub struct ProjectManager {
    registry: Arc<PhaseRegistry>,
    max_parallel: usize,
    currency: String,
}

impl ProjectManager {
    /// Creates a manager over an initialised phase registry.
    pub fn new(registry: Arc<PhaseRegistry>) -> Self {
        Self {
            registry,
            max_parallel: DEFAULT_MAX_PARALLEL,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Sets the maximum number of phases of one group run concurrently.
    ///
    /// Capped at the number of CPUs; zero is treated as one.
    pub fn set_max_parallel(&mut self, max: usize) {
        let cpus = num_cpus::get().max(1);
        if max > cpus {
            warn!("Requested {} parallel phases, capping at {} CPUs", max, cpus);
        }
        self.max_parallel = max.clamp(1, cpus);
    }

    /// Sets the project currency every cost field must be declared in.
    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.currency = currency.into();
    }

    pub fn registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    /// Schema of the inputs the named phases read.
    pub fn compile_input_schema<S: AsRef<str>>(&self, names: &[S]) -> Result<InputSchema> {
        compile_input_schema(&self.registry, names)
    }

    /// Compiles a user configuration into a [`ProjectConfig`].
    ///
    /// Checks the phase selection first, then merges the user values with
    /// the schema of the selected phases.
    pub fn compile(&self, user: &Value) -> Result<ProjectConfig> {
        let selection = read_phase_selection(user)?;
        validate_phase_selection(&self.registry, &selection)?;

        let schema = compile_input_schema(&self.registry, &selection.all())?;
        debug!("Compiled schema with {} fields", schema.len());

        merge(user, &schema)
    }

    /// Compiles and runs a user configuration.
    pub fn run_user_config(&self, user: &Value, weather: Option<&WeatherSeries>) -> Result<ProjectResult> {
        let config = self.compile(user)?;
        self.run(&config, weather)
    }

    /// Runs a compiled project.
    ///
    /// Planning and wiring are checked before any phase executes. Design
    /// phases run first and never see the weather series; install phases
    /// then run with wired inputs and the series.
    ///
    /// # Returns
    ///
    /// * `Ok(ProjectResult)` - Every phase completed
    /// * `Err(EngineError::PhaseExecution)` - A phase failed; the error keeps
    ///   the results of the phases that completed
    /// * `Err` - Any planning or wiring error, before execution
    pub fn run(&self, config: &ProjectConfig, weather: Option<&WeatherSeries>) -> Result<ProjectResult> {
        let start_time = Instant::now();

        let mut plan = ExecutionPlan::new(&self.registry, config, &self.currency)?;
        let wiring = WiringPlan::build(&plan, config)?;

        info!(
            "Starting execution (max parallel: {}, weather: {})",
            self.max_parallel,
            if weather.is_some() { "yes" } else { "no" }
        );

        let no_overrides = BTreeMap::new();
        let design_jobs = plan
            .design()
            .iter()
            .map(|planned| {
                Ok(Job {
                    inputs: config.view(&planned.phase.spec, &no_overrides)?,
                    planned: planned.clone(),
                    wired: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut completed = Vec::with_capacity(plan.len());
        if let Err(failure) = self.run_group(&mut plan, design_jobs, None, &mut completed) {
            return Err(failure.into_error(completed));
        }
        let design_count = completed.len();

        let install_jobs = plan
            .install()
            .iter()
            .map(|planned| {
                let (overrides, wired) =
                    wiring.overrides_for(planned.index, &completed[..design_count], config);
                if !wired.is_empty() {
                    debug!("{}: wired inputs {:?}", planned.name(), wired);
                }
                Ok(Job {
                    inputs: config.view(&planned.phase.spec, &overrides)?,
                    planned: planned.clone(),
                    wired,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Err(failure) = self.run_group(&mut plan, install_jobs, weather, &mut completed) {
            return Err(failure.into_error(completed));
        }

        let install_results = completed.split_off(design_count);
        let project = aggregate(completed, install_results, config.fixed_costs(), &self.currency);

        let (done, total) = plan.progress();
        info!(
            "Project completed: {}/{} phases in {:.2?}, total CapEx {:.2} {}",
            done,
            total,
            start_time.elapsed(),
            project.total_capex,
            project.currency
        );

        Ok(project)
    }

    /// Runs one group in waves of at most `max_parallel` phases.
    ///
    /// Successful results are appended to `completed` in declared order. A
    /// failing wave still records the successes of its other phases.
    fn run_group(
        &self,
        plan: &mut ExecutionPlan,
        jobs: Vec<Job>,
        weather: Option<&WeatherSeries>,
        completed: &mut Vec<PhaseResult>,
    ) -> std::result::Result<(), Failure> {
        let total = jobs.len();

        for wave in jobs.chunks(self.max_parallel) {
            for job in wave {
                info!(
                    "Running {} phase '{}' ({}/{})",
                    job.planned.category,
                    job.planned.name(),
                    job.planned.index + 1,
                    total
                );
            }

            let mut failure = None;
            for (job, outcome) in wave.iter().zip(execute_wave(wave, weather)) {
                match outcome {
                    Ok(result) => {
                        info!(
                            "Phase '{}' completed successfully ({} ms)",
                            result.name, result.log.duration_ms
                        );
                        plan.mark_completed();
                        completed.push(result);
                    }
                    Err(source) => {
                        error!("Phase '{}' failed: {}", job.planned.name(), source);
                        if failure.is_none() {
                            failure = Some(Failure {
                                phase: job.planned.name().to_string(),
                                stage: job.planned.category,
                                source,
                            });
                        }
                    }
                }
            }

            if let Some(failure) = failure {
                return Err(failure);
            }
        }

        Ok(())
    }
}

/// Executes a wave of jobs, returning outcomes in the order of `wave`.
fn execute_wave(
    wave: &[Job],
    weather: Option<&WeatherSeries>,
) -> Vec<std::result::Result<PhaseResult, PhaseError>> {
    if let [job] = wave {
        return vec![execute_phase(&job.planned, &job.inputs, weather, job.wired.clone())];
    }

    let mut outcomes: Vec<Option<std::result::Result<PhaseResult, PhaseError>>> =
        wave.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let (tx, rx): (
            Sender<(usize, std::result::Result<PhaseResult, PhaseError>)>,
            Receiver<(usize, std::result::Result<PhaseResult, PhaseError>)>,
        ) = channel();

        for (position, job) in wave.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move || {
                let result = execute_phase(&job.planned, &job.inputs, weather, job.wired.clone());
                if let Err(e) = tx.send((position, result)) {
                    error!("Failed to send completion signal: {}", e);
                }
            });
        }
        drop(tx);

        for (position, result) in rx {
            outcomes[position] = Some(result);
        }
    });

    outcomes
        .into_iter()
        .zip(wave)
        .map(|(outcome, job)| {
            outcome.unwrap_or_else(|| {
                Err(PhaseError::Computation(format!(
                    "phase '{}' did not report a result",
                    job.planned.name()
                )))
            })
        })
        .collect()
}
