//! engine::remote_status
//!
//! Relationship of a branch to its remote counterpart.
//!
//! No remotes at all gives [`SyncToRemoteStatus::NoRemotes`]. No configured
//! counterpart, or a counterpart whose remote-tracking ref is missing, gives
//! [`SyncToRemoteStatus::Untracked`]. Otherwise the tips are compared by
//! ancestry; when neither contains the other, the committer timestamps of
//! the two tips decide between newer and older. A tie counts as older, so a
//! force push is never the default on equal timestamps.

use serde::Serialize;

use crate::core::types::{BranchName, RemoteBranch};
use crate::git::{CommitGraph, GitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncToRemoteStatus {
    NoRemotes,
    Untracked,
    InSync,
    AheadOfRemote,
    BehindRemote,
    DivergedFromAndOlderThanRemote,
    DivergedFromAndNewerThanRemote,
}

impl std::fmt::Display for SyncToRemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncToRemoteStatus::NoRemotes => "no remotes",
            SyncToRemoteStatus::Untracked => "untracked",
            SyncToRemoteStatus::InSync => "in sync with remote",
            SyncToRemoteStatus::AheadOfRemote => "ahead of remote",
            SyncToRemoteStatus::BehindRemote => "behind remote",
            SyncToRemoteStatus::DivergedFromAndOlderThanRemote => "diverged from & older than remote",
            SyncToRemoteStatus::DivergedFromAndNewerThanRemote => "diverged from & newer than remote",
        };
        f.write_str(text)
    }
}

/// Full result of remote classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSync {
    pub status: SyncToRemoteStatus,
    /// Configured counterpart, also reported when its ref is missing
    pub counterpart: Option<RemoteBranch>,
    /// Commits on the branch but not on the counterpart
    pub ahead: usize,
    /// Commits on the counterpart but not on the branch
    pub behind: usize,
}

impl RemoteSync {
    fn bare(status: SyncToRemoteStatus, counterpart: Option<RemoteBranch>) -> Self {
        Self {
            status,
            counterpart,
            ahead: 0,
            behind: 0,
        }
    }
}

/// Classify `branch` against its configured tracking counterpart.
pub fn classify_remote<G: CommitGraph + ?Sized>(
    graph: &G,
    branch: &BranchName,
) -> Result<RemoteSync, GitError> {
    if graph.remotes()?.is_empty() {
        return Ok(RemoteSync::bare(SyncToRemoteStatus::NoRemotes, None));
    }
    match graph.tracking_counterpart(branch)? {
        Some(counterpart) => compare_with_counterpart(graph, branch, &counterpart),
        None => Ok(RemoteSync::bare(SyncToRemoteStatus::Untracked, None)),
    }
}

/// Compare `branch` with an explicit counterpart, configured or not.
pub fn compare_with_counterpart<G: CommitGraph + ?Sized>(
    graph: &G,
    branch: &BranchName,
    counterpart: &RemoteBranch,
) -> Result<RemoteSync, GitError> {
    let Some(remote_tip) = graph.remote_branch_tip(counterpart)? else {
        return Ok(RemoteSync::bare(
            SyncToRemoteStatus::Untracked,
            Some(counterpart.clone()),
        ));
    };
    let tip = graph.tip(branch)?;

    let status = if tip == remote_tip {
        SyncToRemoteStatus::InSync
    } else if graph.is_ancestor(&remote_tip, &tip)? {
        SyncToRemoteStatus::AheadOfRemote
    } else if graph.is_ancestor(&tip, &remote_tip)? {
        SyncToRemoteStatus::BehindRemote
    } else if graph.commit_time(&tip)? > graph.commit_time(&remote_tip)? {
        SyncToRemoteStatus::DivergedFromAndNewerThanRemote
    } else {
        SyncToRemoteStatus::DivergedFromAndOlderThanRemote
    };

    Ok(RemoteSync {
        status,
        counterpart: Some(counterpart.clone()),
        ahead: graph.commit_count(&remote_tip, &tip)?,
        behind: graph.commit_count(&tip, &remote_tip)?,
    })
}
