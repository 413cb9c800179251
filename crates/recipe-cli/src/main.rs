use std::path::PathBuf;

use clap::{ArgAction, Parser};

mod commands;
mod config;
mod constants;

use commands::CliEnv;
use config::CliConfig;

/// Validate and run radiation study recipes.
#[derive(Parser)]
#[command(name = "radiation-recipe", version, arg_required_else_help = true)]
struct CliOpts {
    /// Displays detailed information about operations. -vv also traces the task context.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file.
    #[arg(long, global = true, env = constants::env::CONFIG)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => constants::logging::DEFAULT_FILTER,
        1 => constants::logging::VERBOSE_FILTER,
        _ => constants::logging::TRACE_FILTER,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = CliOpts::parse();
    init_logging(opts.verbose);

    let config = CliConfig::resolve(opts.config.as_deref()).await?;
    log::debug!("Using radiation tool '{}'", config.tool.program);

    let env = CliEnv::new(config, opts.config)?;
    commands::exec(&env, opts.command).await
}
