//! pr-prep command - Push what a pull request needs and print its plan

use super::{console, Workspace};
use crate::engine::{prepare_pull_request, Context, EngineError, PullRequestOutcome, Session};
use anyhow::{anyhow, Result};

pub fn pr_prep(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let layout = ws.layout()?;
    let branch = ws.branch_or_current(branch)?;
    let mut session = Session::new(&ws.git);
    let mut port = ws.prompt(ctx);

    let outcome = prepare_pull_request(
        &mut session,
        &layout,
        &branch,
        ws.config.origin_policy(),
        &mut port,
    )
    .map_err(|err| match err {
        EngineError::NoRemotesConfigured { .. } => {
            anyhow!("Could not create pull request - there are no remote repositories!")
        }
        other => anyhow::Error::new(other).context("Could not prepare pull request"),
    })?;

    match outcome {
        PullRequestOutcome::Ready(plan) => {
            if ctx.quiet {
                println!("{} -> {}", plan.head, plan.base);
                return Ok(());
            }
            println!("head: {}", plan.head);
            println!("base: {}", plan.base);
            println!("remote: {}", plan.remote);
            println!("head status: {}", plan.head_status);
            if !plan.base_on_remote {
                console(ctx).warn(format!("base {} is not on {}", plan.base, plan.remote))?;
            }
        }
        PullRequestOutcome::Interrupted => {
            console(ctx).note("Pull request creation interrupted.")?;
        }
    }
    Ok(())
}
