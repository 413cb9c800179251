use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use recipe_engine::{InputValues, LogEventSink, RecipeRunner};

use super::CliEnv;

/// Runs a recipe, delegating its tasks to the configured tool.
#[derive(Parser)]
pub struct RunOpts {
    /// Recipe name.
    recipe: String,

    /// JSON file holding an object keyed by input name.
    #[arg(long)]
    inputs: PathBuf,

    /// Run folder. Defaults to `default_folder` from the configuration.
    #[arg(long)]
    folder: Option<PathBuf>,
}

pub async fn exec(env: &CliEnv, opts: RunOpts) -> anyhow::Result<()> {
    let folder = opts
        .folder
        .or_else(|| env.config.default_folder.clone())
        .ok_or_else(|| anyhow!("No run folder: pass --folder or set default_folder"))?;

    let program = &env.config.tool.program;
    let resolved = which::which(program).with_context(|| {
        format!(
            "Radiation tool '{}' not found; set program in the configuration",
            program
        )
    })?;
    log::debug!("Radiation tool resolved to {}", resolved.display());

    let values = InputValues::from_file(&opts.inputs)
        .await
        .with_context(|| format!("Failed to read inputs from {}", opts.inputs.display()))?;

    let runner = RecipeRunner::with_events(env.registry.clone(), Arc::new(LogEventSink));
    let outputs = runner
        .run(&opts.recipe, &values, &folder)
        .await
        .with_context(|| format!("Recipe '{}' failed", opts.recipe))?;

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}
