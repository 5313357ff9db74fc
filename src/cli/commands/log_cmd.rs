//! log command - Commits a branch owns

use super::Workspace;
use crate::engine::{branch_log, Context, Session};
use anyhow::Result;

/// Print the commits between a branch's fork point and its tip, one per line.
pub fn log(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let layout = ws.layout()?;
    let branch = ws.branch_or_current(branch)?;

    let mut session = Session::new(&ws.git);
    let log = branch_log(&mut session, &layout, &branch)?;

    for commit in &log.commits {
        if ctx.quiet {
            println!("{}", commit.oid);
        } else {
            println!(
                "{} {} {}",
                commit.oid,
                commit.time.format("%Y-%m-%d"),
                commit.summary
            );
        }
    }
    Ok(())
}
