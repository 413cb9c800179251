use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use recipe_engine::RecipeRegistry;

use crate::config::CliConfig;

mod config;
mod list;
mod run;
mod schema;
mod validate;

/// State shared by every subcommand
pub struct CliEnv {
    pub config: CliConfig,
    /// Path the configuration was read from, if given
    pub config_path: Option<PathBuf>,
    pub registry: Arc<RecipeRegistry>,
}

impl CliEnv {
    pub fn new(config: CliConfig, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let registry = radiation_recipes::registry(config.tool.clone())?;
        Ok(Self {
            config,
            config_path,
            registry: Arc::new(registry),
        })
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List the registered recipes
    List(list::ListOpts),
    /// Print a recipe descriptor or the JSON schema of its inputs
    Schema(schema::SchemaOpts),
    /// Check an inputs file against a recipe without running it
    Validate(validate::ValidateOpts),
    /// Run a recipe in a folder
    Run(run::RunOpts),
    /// Show or initialize the configuration
    Config(config::ConfigOpts),
}

pub async fn exec(env: &CliEnv, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::List(v) => list::exec(env, v),
        Command::Schema(v) => schema::exec(env, v),
        Command::Validate(v) => validate::exec(env, v).await,
        Command::Run(v) => run::exec(env, v).await,
        Command::Config(v) => config::exec(env, v).await,
    }
}
