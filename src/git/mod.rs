//! git
//!
//! The commit graph accessor: every question the engine asks about commits,
//! branches, reflogs and remotes goes through the traits defined here.
//!
//! # Architecture
//!
//! - [`CommitGraph`] is the read-only query surface. Classification only ever
//!   needs this half.
//! - [`BranchActions`] holds the few mutations the engine performs after a
//!   caller confirmed them (rebase, push, tracking change).
//! - [`Git`] implements both against a real repository: queries through
//!   `git2`, network and rebase work by shelling out to the `git` binary.
//! - [`MemoryRepo`] implements both over an in-memory commit DAG for
//!   deterministic tests.
//!
//! No other module imports `git2`.
//!
//! # Example
//!
//! ```ignore
//! use branchwise::core::types::BranchName;
//! use branchwise::git::{CommitGraph, Git};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let main = git.tip(&BranchName::new("main")?)?;
//! for remote in git.remotes()? {
//!     println!("{remote}");
//! }
//! ```

mod interface;
pub mod memory;

pub use interface::{Git, GitError, GitState, RepoInfo};
pub use memory::MemoryRepo;

use chrono::{DateTime, Utc};

use crate::core::types::{BranchName, Oid, RemoteBranch};

/// One line of a branch's reflog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogEntry {
    /// Branch whose reflog this entry belongs to
    pub branch: BranchName,
    /// Commit the branch pointed at after this entry
    pub commit: Oid,
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
    /// Raw annotation, e.g. `commit: Fix typo` or `rebase (finish): ...`
    pub description: String,
}

/// A commit as listed by [`CommitGraph::commits_between`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub oid: Oid,
    /// First line of the message
    pub summary: String,
    pub time: DateTime<Utc>,
}

/// Outcome of a requested rebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The branch now sits on the new base at this commit.
    Completed { new_tip: Oid },
    /// The replay stopped on a conflict and was rolled back.
    Conflict { details: String },
}

/// Read-only queries over the commit graph and remote-tracking state.
///
/// Reflog entries are returned newest first.
pub trait CommitGraph {
    /// Current tip of a local branch.
    fn tip(&self, branch: &BranchName) -> Result<Oid, GitError>;

    /// Best common ancestor, `None` when the histories are disjoint.
    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError>;

    /// `true` when `ancestor` is reachable from `descendant` (or equal to it).
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError>;

    /// Number of commits reachable from `tip` but not from `base`.
    fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError>;

    /// Commits reachable from `tip` but not from `base`, newest first.
    fn commits_between(&self, base: &Oid, tip: &Oid) -> Result<Vec<CommitSummary>, GitError>;

    /// Committer timestamp of a commit.
    fn commit_time(&self, oid: &Oid) -> Result<DateTime<Utc>, GitError>;

    /// All local branches.
    fn local_branches(&self) -> Result<Vec<BranchName>, GitError>;

    /// Reflog of a local branch, newest first. Empty when there is none.
    fn reflog(&self, branch: &BranchName) -> Result<Vec<ReflogEntry>, GitError>;

    /// Configured remotes, sorted by name.
    fn remotes(&self) -> Result<Vec<String>, GitError>;

    /// Configured upstream of a local branch.
    fn tracking_counterpart(&self, branch: &BranchName) -> Result<Option<RemoteBranch>, GitError>;

    /// Tip of a remote-tracking branch, `None` if the ref is absent locally.
    fn remote_branch_tip(&self, remote: &RemoteBranch) -> Result<Option<Oid>, GitError>;

    /// Update remote-tracking refs of one remote.
    fn fetch(&self, remote: &str) -> Result<(), GitError>;
}

/// Mutations the engine performs once a caller confirmed them.
pub trait BranchActions {
    /// Replay the commits of `branch` after `fork_point` onto `onto`.
    fn rebase_onto(
        &self,
        branch: &BranchName,
        onto: &Oid,
        fork_point: &Oid,
    ) -> Result<RebaseOutcome, GitError>;

    /// Push `branch` to `remote`, setting it as upstream.
    fn push(&self, branch: &BranchName, remote: &str, force_with_lease: bool)
        -> Result<(), GitError>;

    /// Point the upstream of `branch` at `counterpart` without moving data.
    fn set_tracking(&self, branch: &BranchName, counterpart: &RemoteBranch)
        -> Result<(), GitError>;
}

/// Everything the engine needs from a repository backend.
pub trait Backend: CommitGraph + BranchActions {}

impl<T: CommitGraph + BranchActions> Backend for T {}
