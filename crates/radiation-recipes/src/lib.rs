//! Radiation recipes
//!
//! The `cumulative-radiation` entry point and the `incident-radiation`
//! task template it delegates to. Both descriptors are submitted through
//! `inventory`, so linking this crate is enough for
//! `RecipeRegistry::with_builtins()` to find them.
//!
//! ```ignore
//! let registry = radiation_recipes::registry(IncidentRadiationConfig::default())?;
//! let runner = RecipeRunner::new(Arc::new(registry));
//! ```

pub mod analysis_period;
pub mod entry;
pub mod incident_radiation;

pub use analysis_period::{AnalysisPeriod, AnalysisPeriodError, ANALYSIS_PERIOD_FORMAT};
pub use entry::{CumulativeRadiationEntryPoint, RECIPE_NAME};
pub use incident_radiation::{
    IncidentRadiation, IncidentRadiationConfig, IncidentRadiationParams, IncidentRadiationTask,
};

use recipe_engine::RecipeRegistry;

/// Attach the process-backed incident radiation executor
pub fn attach_executors(
    registry: &mut RecipeRegistry,
    config: IncidentRadiationConfig,
) -> recipe_engine::Result<()> {
    log::debug!(
        "Attaching '{}' executor using program '{}'",
        incident_radiation::TEMPLATE_ID,
        config.program
    );
    registry.attach_executor(
        incident_radiation::TEMPLATE_ID,
        incident_radiation::executor_factory(config),
    )
}

/// Built-in registry with every radiation executor attached
pub fn registry(config: IncidentRadiationConfig) -> recipe_engine::Result<RecipeRegistry> {
    let mut registry = RecipeRegistry::with_builtins();
    attach_executors(&mut registry, config)?;
    Ok(registry)
}
