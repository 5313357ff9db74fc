//! remote command - Which remote a branch goes to

use super::Workspace;
use crate::engine::{resolve_remote, Context, ResolvedBy, Session};
use anyhow::{Context as _, Result};

/// Resolve and print the remote for a branch.
///
/// May prompt, and may set the branch's tracking counterpart when the
/// operator adopts an identical remote branch.
pub fn remote(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let branch = ws.branch_or_current(branch)?;
    let mut session = Session::new(&ws.git);
    let mut port = ws.prompt(ctx);

    let resolved = resolve_remote(&mut session, &branch, ws.config.origin_policy(), &mut port)
        .with_context(|| format!("Could not establish remote repository for {branch}"))?;

    if ctx.quiet {
        println!("{}", resolved.remote);
        return Ok(());
    }
    let how = match resolved.by {
        ResolvedBy::Tracking => "tracking counterpart",
        ResolvedBy::Origin => "origin",
        ResolvedBy::SoleRemote => "only remote",
        ResolvedBy::Adopted => "adopted existing counterpart",
        ResolvedBy::Selected => "selected",
    };
    println!("{} ({how})", resolved.remote);
    Ok(())
}
