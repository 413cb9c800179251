use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use recipe_engine::{InputValues, RecipeError, RecipeRunner};

use super::CliEnv;

/// Checks an inputs file against a recipe without running anything.
#[derive(Parser)]
pub struct ValidateOpts {
    /// Recipe name.
    recipe: String,

    /// JSON file holding an object keyed by input name.
    #[arg(long)]
    inputs: PathBuf,
}

pub async fn exec(env: &CliEnv, opts: ValidateOpts) -> anyhow::Result<()> {
    let values = InputValues::from_file(&opts.inputs)
        .await
        .with_context(|| format!("Failed to read inputs from {}", opts.inputs.display()))?;

    let runner = RecipeRunner::new(env.registry.clone());
    match runner.validate(&opts.recipe, &values) {
        Ok(resolved) => {
            println!("{}: {} inputs resolved", opts.recipe, resolved.len());
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(())
        }
        Err(err @ RecipeError::InvalidInputs { .. }) => {
            for error in err.validation_errors() {
                println!("  - {}", error);
            }
            bail!(
                "{} invalid input(s) for recipe '{}'",
                err.validation_errors().len(),
                opts.recipe
            )
        }
        Err(err) => Err(err.into()),
    }
}
