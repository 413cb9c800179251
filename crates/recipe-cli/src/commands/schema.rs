use anyhow::Context;
use clap::Parser;

use super::CliEnv;

/// Prints the descriptor of a recipe.
#[derive(Parser)]
pub struct SchemaOpts {
    /// Recipe name.
    recipe: String,

    /// Print the JSON schema of the inputs instead of the full descriptor.
    #[arg(long)]
    json_schema: bool,
}

pub fn exec(env: &CliEnv, opts: SchemaOpts) -> anyhow::Result<()> {
    let descriptor = env
        .registry
        .recipe(&opts.recipe)
        .ok_or_else(|| recipe_engine::RecipeError::UnknownRecipe(opts.recipe.clone()))?;

    let rendered = if opts.json_schema {
        serde_json::to_string_pretty(&descriptor.input_json_schema())
    } else {
        serde_json::to_string_pretty(descriptor)
    }
    .context("Failed to render descriptor")?;

    println!("{}", rendered);
    Ok(())
}
