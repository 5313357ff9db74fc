//! traverse command - Walk the layout and bring branches in line

use super::{console, Workspace};
use crate::engine::{self, Context, Session, TraverseOptions, VisitState};
use anyhow::{bail, Context as _, Result};

/// Run the traversal and persist slide-outs to the definition file.
pub fn traverse(ctx: &Context, fetch: bool) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let state = ws.git.state();
    if state.is_in_progress() {
        bail!("A {state} is in progress; finish or abort it first");
    }

    let mut layout = ws.layout()?;
    let options = TraverseOptions {
        origin_policy: ws.config.origin_policy(),
        fetch: fetch || ws.config.fetch(),
    };
    let mut console = console(ctx);
    let mut session = Session::new(&ws.git);
    let mut port = ws.prompt(ctx);

    let report = engine::traverse(&mut session, &mut layout, options, &mut port)
        .context("Traversal failed")?;

    for remote in &report.fetched {
        console.note(format!("Fetched {remote}"))?;
    }
    let slid_out = report.slid_out();
    if !slid_out.is_empty() {
        ws.save_layout(&layout)?;
        let names: Vec<String> = slid_out.iter().map(|b| b.to_string()).collect();
        console.note(format!("Slid out: {}", names.join(", ")))?;
    }

    let mut failures = 0;
    for outcome in &report.outcomes {
        match &outcome.state {
            VisitState::Failed { reason } => {
                failures += 1;
                console.branch_failed(&outcome.branch, reason)?;
            }
            VisitState::Skipped { failed_ancestor } => console.warn(format!(
                "{} skipped because {failed_ancestor} failed",
                outcome.branch
            ))?,
            _ => {}
        }
    }
    if report.aborted {
        console.note("Traversal interrupted.")?;
    }
    if failures > 0 {
        bail!("{failures} branch(es) could not be brought in line");
    }
    Ok(())
}
