//! fork-point command - Where a branch's own history starts

use super::Workspace;
use crate::engine::{declared_parent, Context, ForkPointSource, Session};
use anyhow::Result;

/// Print the fork point of a branch against its layout parent, with the
/// reflog candidates that were weighed.
pub fn fork_point(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let layout = ws.layout()?;
    let branch = ws.branch_or_current(branch)?;
    let parent = declared_parent(&layout, &branch)?;

    let mut session = Session::new(&ws.git);
    let fork_point = session.fork_point(&layout, &branch, &parent)?;

    println!("{}", fork_point.commit);
    if ctx.quiet {
        return Ok(());
    }
    println!("source: {}", fork_point.source);
    println!("parent: {parent}");
    if fork_point.source == ForkPointSource::InferredFromReflog {
        println!("merge-base: {}", fork_point.merge_base);
        println!("candidates:");
        for (rank, candidate) in fork_point.candidates.iter().enumerate() {
            println!(
                "  {}. {} distance {} seen in {} at {}",
                rank + 1,
                candidate.commit.short(7),
                candidate.distance,
                candidate.evidence,
                candidate.timestamp.format("%Y-%m-%d %H:%M:%S"),
            );
        }
    }
    Ok(())
}
