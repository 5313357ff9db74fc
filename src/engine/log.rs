//! engine::log
//!
//! The commits a branch owns: everything above its fork point, up to and
//! including its tip.

use super::fork_point::ForkPoint;
use super::parent_status::declared_parent;
use super::session::Session;
use super::EngineError;
use crate::core::layout::Layout;
use crate::core::types::BranchName;
use crate::git::{CommitGraph, CommitSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLog {
    pub branch: BranchName,
    pub parent: BranchName,
    pub fork_point: ForkPoint,
    /// Newest first; the fork point itself is excluded.
    pub commits: Vec<CommitSummary>,
}

/// Commits of `branch` since it forked off its layout parent.
pub fn branch_log(
    session: &mut Session<'_>,
    layout: &Layout,
    branch: &BranchName,
) -> Result<BranchLog, EngineError> {
    let parent = declared_parent(layout, branch)?;
    let fork_point = session.fork_point(layout, branch, &parent)?;
    let backend = session.backend();
    let tip = backend.tip(branch)?;
    let commits = backend.commits_between(&fork_point.commit, &tip)?;
    tracing::debug!(
        branch = %branch,
        commits = commits.len(),
        fork_point = %fork_point.commit,
        "collected branch log"
    );
    Ok(BranchLog {
        branch: branch.clone(),
        parent,
        fork_point,
        commits,
    })
}
