//! status command - Parent and remote status of every branch in the layout
//!
//! Read-only: fork points are computed but nothing is fetched or changed.

use serde::Serialize;

use super::{console, Workspace};
use crate::core::types::{BranchName, Oid, RemoteBranch};
use crate::engine::{
    classify_remote, evaluate_parent, Context, ForkPointSource, Session, SyncToParentStatus,
    SyncToRemoteStatus,
};
use anyhow::{Context as _, Result};

#[derive(Debug, Serialize)]
struct BranchStatus {
    branch: BranchName,
    depth: usize,
    parent: Option<BranchName>,
    parent_status: Option<SyncToParentStatus>,
    fork_point: Option<Oid>,
    fork_point_source: Option<ForkPointSource>,
    /// Why the parent could not be classified
    problem: Option<String>,
    remote_status: SyncToRemoteStatus,
    counterpart: Option<RemoteBranch>,
    ahead: usize,
    behind: usize,
}

impl BranchStatus {
    fn line(&self) -> String {
        let mut line = self.branch.to_string();
        match (&self.parent_status, &self.problem) {
            (Some(status), _) => {
                line.push_str(&format!(" [{status}]"));
                if self.fork_point_source == Some(ForkPointSource::InferredFromReflog) {
                    if let Some(fork_point) = &self.fork_point {
                        line.push_str(&format!(" fork point {}", fork_point.short(7)));
                    }
                }
            }
            (None, Some(problem)) => line.push_str(&format!(" [{problem}]")),
            (None, None) => {}
        }
        match &self.counterpart {
            Some(counterpart) if self.remote_status != SyncToRemoteStatus::Untracked => {
                line.push_str(&format!(" ({} {counterpart}", self.remote_status));
                if self.ahead > 0 || self.behind > 0 {
                    line.push_str(&format!(", +{}/-{}", self.ahead, self.behind));
                }
                line.push(')');
            }
            _ if self.remote_status == SyncToRemoteStatus::NoRemotes => {}
            _ => line.push_str(&format!(" ({})", self.remote_status)),
        }
        line
    }
}

/// Print the layout with per-branch status.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let layout = ws.layout()?;
    let mut session = Session::new(&ws.git);

    let mut rows = Vec::with_capacity(layout.len());
    for branch in layout.pre_order() {
        let parent = layout.parent(&branch).cloned();
        let mut row = BranchStatus {
            branch: branch.clone(),
            depth: layout.ancestors(&branch).len(),
            parent: parent.clone(),
            parent_status: None,
            fork_point: None,
            fork_point_source: None,
            problem: None,
            remote_status: SyncToRemoteStatus::NoRemotes,
            counterpart: None,
            ahead: 0,
            behind: 0,
        };

        if parent.is_some() {
            match evaluate_parent(&mut session, &layout, &branch) {
                Ok(evaluation) => {
                    row.parent_status = Some(evaluation.status);
                    row.fork_point_source = Some(evaluation.fork_point.source);
                    row.fork_point = Some(evaluation.fork_point.commit);
                }
                Err(err) => {
                    tracing::debug!(%branch, %err, "parent not classified");
                    row.problem = Some(err.to_string());
                }
            }
        }

        let sync = classify_remote(&ws.git, &branch)
            .with_context(|| format!("Failed to classify {branch} against its remote"))?;
        row.remote_status = sync.status;
        row.counterpart = sync.counterpart;
        row.ahead = sync.ahead;
        row.behind = sync.behind;
        rows.push(row);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialize status")?
        );
        return Ok(());
    }

    let mut console = console(ctx);
    for row in &rows {
        console.tree_line(row.depth, row.line())?;
    }
    Ok(())
}
