//! engine::parent_status
//!
//! Relationship of a branch to its declared parent.
//!
//! Rules, first match wins:
//! 1. branch tip is an ancestor of (or equal to) the parent tip:
//!    [`SyncToParentStatus::MergedIntoParent`]
//! 2. parent tip is an ancestor of the branch tip and the fork point is an
//!    ancestor of the parent tip: [`SyncToParentStatus::InSync`] when the fork
//!    point is the merge-base, [`SyncToParentStatus::InSyncButForkPointOff`]
//!    otherwise
//! 3. anything else: [`SyncToParentStatus::OutOfSync`]

use serde::Serialize;

use super::fork_point::ForkPoint;
use super::session::Session;
use super::EngineError;
use crate::core::layout::Layout;
use crate::core::types::BranchName;
use crate::git::{CommitGraph, GitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncToParentStatus {
    InSync,
    /// History matches, but a rebase would cut at a different commit than
    /// the merge-base.
    InSyncButForkPointOff,
    OutOfSync,
    MergedIntoParent,
}

impl std::fmt::Display for SyncToParentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncToParentStatus::InSync => "in sync",
            SyncToParentStatus::InSyncButForkPointOff => "in sync, fork point off",
            SyncToParentStatus::OutOfSync => "out of sync",
            SyncToParentStatus::MergedIntoParent => "merged",
        };
        f.write_str(text)
    }
}

/// Classify `branch` against `parent` given an already detected fork point.
pub fn classify_parent<G: CommitGraph + ?Sized>(
    graph: &G,
    branch: &BranchName,
    parent: &BranchName,
    fork_point: &ForkPoint,
) -> Result<SyncToParentStatus, GitError> {
    let tip = graph.tip(branch)?;
    let parent_tip = graph.tip(parent)?;

    if graph.is_ancestor(&tip, &parent_tip)? {
        return Ok(SyncToParentStatus::MergedIntoParent);
    }
    if graph.is_ancestor(&parent_tip, &tip)? && graph.is_ancestor(&fork_point.commit, &parent_tip)? {
        let merge_base = graph.merge_base(&tip, &parent_tip)?;
        return Ok(if merge_base.as_ref() == Some(&fork_point.commit) {
            SyncToParentStatus::InSync
        } else {
            SyncToParentStatus::InSyncButForkPointOff
        });
    }
    Ok(SyncToParentStatus::OutOfSync)
}

/// Parent, fork point and status of one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentEvaluation {
    pub parent: BranchName,
    pub fork_point: ForkPoint,
    pub status: SyncToParentStatus,
}

/// Parent of `branch` in the layout.
pub fn declared_parent(layout: &Layout, branch: &BranchName) -> Result<BranchName, EngineError> {
    if !layout.contains(branch) {
        return Err(EngineError::BranchNotInLayout {
            branch: branch.clone(),
        });
    }
    layout
        .parent(branch)
        .cloned()
        .ok_or_else(|| EngineError::RootBranchHasNoParent {
            branch: branch.clone(),
        })
}

/// Look up the parent of `branch` in the layout, detect the fork point
/// (cached in the session) and classify.
pub fn evaluate_parent(
    session: &mut Session<'_>,
    layout: &Layout,
    branch: &BranchName,
) -> Result<ParentEvaluation, EngineError> {
    let parent = declared_parent(layout, branch)?;
    let fork_point = session.fork_point(layout, branch, &parent)?;
    let status = classify_parent(session.backend(), branch, &parent, &fork_point)?;
    Ok(ParentEvaluation {
        parent,
        fork_point,
        status,
    })
}
