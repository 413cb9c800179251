use clap::Parser;

use super::CliEnv;

/// Lists the registered recipes.
#[derive(Parser)]
pub struct ListOpts {
    /// Print only the recipe names.
    #[arg(long, short)]
    quiet: bool,
}

pub fn exec(env: &CliEnv, opts: ListOpts) -> anyhow::Result<()> {
    for name in env.registry.recipe_names() {
        if opts.quiet {
            println!("{}", name);
            continue;
        }
        let description = env
            .registry
            .recipe(name)
            .map(|d| d.description.as_str())
            .unwrap_or_default();
        println!("{:<24} {}", name, description);
    }
    Ok(())
}
