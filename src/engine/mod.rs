//! engine
//!
//! The synchronization status engine: fork-point detection, classification
//! against the parent and the remote, remote resolution, and the traversal
//! that turns classifications into confirmed actions.
//!
//! # Architecture
//!
//! ```text
//! fork_point ──► parent_status ─┐
//!                               ├─► traverse / pull_request
//! remote_status ◄── remote ─────┘
//! ```
//!
//! - [`fork_point`] - Where a branch's own history starts relative to its parent
//! - [`log`] - Commits a branch owns above its fork point
//! - [`parent_status`] - Merged / in sync / fork point off / out of sync
//! - [`remote_status`] - Ahead / behind / diverged / untracked against the remote
//! - [`remote`] - Which remote a branch should be pushed to
//! - [`traverse`] - Pre-order walk proposing and applying actions
//! - [`pull_request`] - Everything a pull request needs before the API call
//! - [`session`] - Per-run caches (fork points, fetches, reflog index)
//!
//! # Invariants
//!
//! - Classification never mutates the repository
//! - A fork point computed for (branch, parent) is reused for the whole run,
//!   until the engine itself rebases, slides out or retracks that branch
//! - Every mutation is preceded by an explicit confirmation through the
//!   interaction port
//! - Failures are returned as [`EngineError`], never replaced by a guess

pub mod fork_point;
pub mod log;
pub mod parent_status;
pub mod pull_request;
pub mod remote;
pub mod remote_status;
pub mod session;
pub mod traverse;

#[cfg(test)]
pub(crate) mod fixtures;

pub use fork_point::{detect, rank_candidates, Candidate, ForkPoint, ForkPointSource, ReflogIndex};
pub use log::{branch_log, BranchLog};
pub use parent_status::{classify_parent, declared_parent, evaluate_parent, ParentEvaluation, SyncToParentStatus};
pub use pull_request::{prepare_pull_request, PullRequestOutcome, PullRequestPlan};
pub use remote::{resolve_remote, RemoteCandidate, ResolvedBy, ResolvedRemote};
pub use remote_status::{classify_remote, compare_with_counterpart, RemoteSync, SyncToRemoteStatus};
pub use session::Session;
pub use traverse::{traverse, Action, ActionRecord, BranchOutcome, TraversalReport, TraverseOptions, VisitState};

use std::path::PathBuf;

use crate::core::types::BranchName;
use crate::git::GitError;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
    /// Answer `y` to every prompt that offers it.
    pub assume_yes: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            quiet: false,
            interactive: true,
            assume_yes: false,
        }
    }
}

/// Why a resolution dialog stopped without an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptCause {
    /// The operator quit.
    Quit,
    /// The answer could not be understood.
    Unparseable(String),
}

impl std::fmt::Display for InterruptCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterruptCause::Quit => f.write_str("quit"),
            InterruptCause::Unparseable(input) => write!(f, "unparseable answer '{}'", input),
        }
    }
}

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("branches {branch} and {parent} have no common history")]
    NoCommonHistory {
        branch: BranchName,
        parent: BranchName,
    },

    #[error("branch {branch} is a root of the layout and has no parent")]
    RootBranchHasNoParent { branch: BranchName },

    #[error("branch {branch} is not part of the branch layout")]
    BranchNotInLayout { branch: BranchName },

    #[error("no remote repositories are configured (needed for branch {branch})")]
    NoRemotesConfigured { branch: BranchName },

    #[error("cannot choose a remote for branch {branch} among {}", remotes.join(", "))]
    AmbiguousRemote {
        branch: BranchName,
        remotes: Vec<String>,
    },

    #[error("invalid index: {index} (expected 1..{count})")]
    InvalidSelectionIndex {
        branch: BranchName,
        index: String,
        count: usize,
    },

    #[error("could not establish remote repository for branch {branch}: {cause}")]
    ResolutionInterrupted {
        branch: BranchName,
        cause: InterruptCause,
    },

    #[error("rebase of {branch} onto {onto} stopped on a conflict: {details}")]
    RebaseConflict {
        branch: BranchName,
        onto: BranchName,
        details: String,
    },

    #[error("query against remote {remote} failed: {message}")]
    RemoteQueryFailure { remote: String, message: String },

    #[error("branch {branch} is already merged into {parent}; nothing to propose")]
    NothingToPropose {
        branch: BranchName,
        parent: BranchName,
    },

    #[error("git error: {0}")]
    Backend(#[from] GitError),
}

impl EngineError {
    /// Whether the operator chose to stop (as opposed to something failing).
    pub fn is_quit(&self) -> bool {
        matches!(
            self,
            EngineError::ResolutionInterrupted {
                cause: InterruptCause::Quit,
                ..
            }
        )
    }
}
