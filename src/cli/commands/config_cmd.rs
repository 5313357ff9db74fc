//! config command - Effective configuration and its sources

use super::Workspace;
use crate::core::config::{Config, OriginPolicy};
use crate::engine::Context;
use anyhow::Result;

pub fn config(ctx: &Context) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let config = &ws.config;

    println!("interactive = {}", config.interactive());
    let policy = match config.origin_policy() {
        OriginPolicy::Assume => "assume",
        OriginPolicy::Confirm => "confirm",
    };
    println!("origin_policy = \"{policy}\"");
    println!("fetch = {}", config.fetch());
    println!("definition = {}", ws.definition.display());
    if !ctx.quiet {
        if config.sources().is_empty() {
            let repo_file = Config::repo_config_path(&ws.info.git_dir);
            println!("# defaults only; repo file would be {}", repo_file.display());
        }
        for source in config.sources() {
            println!("# from {}", source.display());
        }
    }
    Ok(())
}
