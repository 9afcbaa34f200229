//! Phase Registry
//!
//! Catalog of phase implementations keyed by their exact, case-sensitive
//! name. Registration happens once at startup; the populated registry is
//! then shared (typically behind an `Arc`) with every
//! [`ProjectManager`](crate::execution::ProjectManager).

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::OnceCell;

use crate::error::{EngineError, PhaseError, Result};
use crate::weather::WeatherSeries;

use super::contract::{FnPhase, Phase, PhaseFactory, PhaseInputs, PhaseOutcome};
use super::spec::PhaseSpec;

/// Process-wide registry, set once by [`install_global`].
static GLOBAL_REGISTRY: OnceCell<Arc<PhaseRegistry>> = OnceCell::new();

/// A registered phase: its declaration and how to instantiate it.
#[derive(Clone)]
pub struct RegisteredPhase {
    pub spec: Arc<PhaseSpec>,
    pub factory: PhaseFactory,
}

impl RegisteredPhase {
    /// Creates a fresh phase instance.
    pub fn instantiate(&self) -> Box<dyn Phase> {
        (self.factory)()
    }
}

impl std::fmt::Debug for RegisteredPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPhase")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Mapping from phase name to implementation.
#[derive(Default, Debug, Clone)]
pub struct PhaseRegistry {
    phases: HashMap<String, RegisteredPhase>,
}

impl PhaseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a phase to the catalog.
    ///
    /// `name` must match `spec.name`, the spec must be internally
    /// consistent, and the name must not already be registered.
    pub fn register<F>(&mut self, name: &str, spec: PhaseSpec, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Phase> + Send + Sync + 'static,
    {
        if spec.name != name {
            return Err(EngineError::InvalidPhaseSpec {
                name: name.to_string(),
                reason: format!("spec is declared as '{}'", spec.name),
            });
        }
        spec.validate()?;

        if self.phases.contains_key(name) {
            return Err(EngineError::DuplicatePhase(name.to_string()));
        }

        debug!(
            "Registered {} phase '{}' ({} inputs, {} outputs)",
            spec.category,
            name,
            spec.inputs.len(),
            spec.outputs.len()
        );

        self.phases.insert(
            name.to_string(),
            RegisteredPhase {
                spec: Arc::new(spec),
                factory: Arc::new(factory),
            },
        );
        Ok(())
    }

    /// Registers a closure as a phase, named after its spec.
    pub fn register_fn<F>(&mut self, spec: PhaseSpec, func: F) -> Result<()>
    where
        F: Fn(&PhaseInputs, Option<&WeatherSeries>) -> Result<PhaseOutcome, PhaseError>
            + Send
            + Sync
            + 'static,
    {
        let name = spec.name.clone();
        let func = Arc::new(func);
        self.register(&name, spec, move || {
            Box::new(FnPhase::from_shared(func.clone())) as Box<dyn Phase>
        })
    }

    /// Looks up a phase by exact name.
    pub fn resolve(&self, name: &str) -> Result<&RegisteredPhase> {
        self.phases.get(name).ok_or_else(|| EngineError::UnknownPhase {
            name: name.to_string(),
        })
    }

    /// Returns the spec of a registered phase.
    pub fn spec(&self, name: &str) -> Option<&PhaseSpec> {
        self.phases.get(name).map(|p| p.spec.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.phases.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.phases.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Stores `registry` as the process-wide catalog.
///
/// Can only succeed once per process.
pub fn install_global(registry: PhaseRegistry) -> Result<Arc<PhaseRegistry>> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(Arc::clone(&registry))
        .map_err(|_| EngineError::RegistryAlreadyInitialised)?;
    Ok(registry)
}

/// Returns the process-wide catalog, if one was installed.
pub fn global() -> Option<Arc<PhaseRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}
