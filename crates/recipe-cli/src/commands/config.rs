use anyhow::anyhow;
use clap::Parser;

use super::CliEnv;
use crate::config::user_config_path;

/// Shows the effective configuration.
#[derive(Parser)]
pub struct ConfigOpts {
    /// Write the effective configuration to the config file.
    #[arg(long)]
    init: bool,
}

pub async fn exec(env: &CliEnv, opts: ConfigOpts) -> anyhow::Result<()> {
    if opts.init {
        let path = env
            .config_path
            .clone()
            .or_else(user_config_path)
            .ok_or_else(|| anyhow!("No configuration directory on this platform"))?;
        env.config.save(&path).await?;
        println!("{}", path.display());
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&env.config)?);
    Ok(())
}
