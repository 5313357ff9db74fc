//! git::interface
//!
//! [`CommitGraph`] and [`BranchActions`] on top of a real repository.
//!
//! Queries go through `git2`. Fetch, push and rebase shell out to the `git`
//! binary so that credentials, hooks and the user's rebase configuration
//! behave exactly as on the command line.
//!
//! # Error Handling
//!
//! Failures are normalized into [`GitError`]:
//! - [`GitError::NotARepo`]: not inside a repository
//! - [`GitError::RefNotFound`]: requested ref does not exist
//! - [`GitError::CommandFailed`]: a shelled-out `git` invocation failed
//! - [`GitError::Internal`]: anything else reported by libgit2

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{BranchActions, CommitGraph, CommitSummary, RebaseOutcome, ReflogEntry};
use crate::core::types::{BranchName, Oid, RefName, RemoteBranch, TypeError};

/// Errors from the repository backend.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound { oid: String },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid { oid: String },

    /// Invalid ref or branch name.
    #[error("invalid ref name: {message}")]
    InvalidRefName { message: String },

    /// A `git` subprocess exited unsuccessfully.
    #[error("`git {command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    /// Create a GitError from a git2::Error with the ref or object involved.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound if context.starts_with("refs/") => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) | TypeError::InvalidBranchName(msg) => {
                GitError::InvalidRefName { message: msg }
            }
        }
    }
}

/// Paths of an opened repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to the .git directory
    pub git_dir: PathBuf,
    /// Path to the working directory
    pub work_dir: PathBuf,
}

/// In-progress operation state of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Rebase,
    Merge,
    /// Cherry-pick, revert, bisect or am
    Other,
}

impl GitState {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::Other => "operation",
        };
        f.write_str(text)
    }
}

/// A repository on disk.
pub struct Git {
    repo: git2::Repository,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

fn timestamp(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default()
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path` (any subdirectory works).
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();
        Ok(Self { repo, work_dir })
    }

    pub fn info(&self) -> RepoInfo {
        RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            work_dir: self.work_dir.clone(),
        }
    }

    /// In-progress operation, if any.
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge
            | git2::RepositoryState::ApplyMailboxOrRebase => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            _ => GitState::Other,
        }
    }

    /// Current branch, `None` when HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match head.shorthand() {
            Some(name) if head.is_branch() => Ok(Some(BranchName::new(name)?)),
            _ => Ok(None),
        }
    }

    /// Resolve a ref to the commit it points at, `None` if it is absent.
    pub fn try_resolve_ref(&self, refname: &RefName) -> Result<Option<Oid>, GitError> {
        let reference = match self.repo.find_reference(refname.as_str()) {
            Ok(r) => r,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, refname.as_str())),
        };
        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
        Ok(Some(from_git2(commit.id())?))
    }

    // =========================================================================
    // Subprocess helpers
    // =========================================================================

    fn run_git(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(?args, "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: args.join(" "),
                message: e.to_string(),
            })
    }

    fn run_git_checked(&self, args: &[&str]) -> Result<Output, GitError> {
        let output = self.run_git(args)?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Read a single string-valued git2 `Buf` result, mapping NotFound to `None`.
    fn optional_buf(result: Result<git2::Buf, git2::Error>) -> Result<Option<String>, GitError> {
        match result {
            Ok(buf) => Ok(buf.as_str().map(str::to_string)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CommitGraph for Git {
    fn tip(&self, branch: &BranchName) -> Result<Oid, GitError> {
        let refname = RefName::for_branch(branch);
        self.try_resolve_ref(&refname)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: refname.to_string(),
            })
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2(a)?, to_git2(b)?) {
            Ok(oid) => Ok(Some(from_git2(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self
            .repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)?)
    }

    fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(to_git2(tip)?)?;
        revwalk.hide(to_git2(base)?)?;
        Ok(revwalk.count())
    }

    fn commits_between(&self, base: &Oid, tip: &Oid) -> Result<Vec<CommitSummary>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(to_git2(tip)?)?;
        revwalk.hide(to_git2(base)?)?;

        let mut commits = Vec::new();
        for id in revwalk {
            let id = id?;
            let commit = self.repo.find_commit(id)?;
            let when = commit.committer().when();
            commits.push(CommitSummary {
                oid: from_git2(id)?,
                summary: commit.summary().unwrap_or_default().to_string(),
                time: timestamp(when),
            });
        }
        Ok(commits)
    }

    fn commit_time(&self, oid: &Oid) -> Result<DateTime<Utc>, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let when = commit.committer().when();
        Ok(timestamp(when))
    }

    fn local_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(Ok(name)) = branch.name().ok().flatten().map(BranchName::new) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn reflog(&self, branch: &BranchName) -> Result<Vec<ReflogEntry>, GitError> {
        let refname = RefName::for_branch(branch);
        let reflog = self.repo.reflog(refname.as_str())?;
        let mut entries = Vec::with_capacity(reflog.len());
        for entry in reflog.iter() {
            entries.push(ReflogEntry {
                branch: branch.clone(),
                commit: from_git2(entry.id_new())?,
                timestamp: timestamp(entry.committer().when()),
                description: entry.message().unwrap_or_default().to_string(),
            });
        }
        Ok(entries)
    }

    fn remotes(&self) -> Result<Vec<String>, GitError> {
        let mut names: Vec<String> = self
            .repo
            .remotes()?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    fn tracking_counterpart(&self, branch: &BranchName) -> Result<Option<RemoteBranch>, GitError> {
        let refname = RefName::for_branch(branch);
        let Some(remote) = Self::optional_buf(self.repo.branch_upstream_remote(refname.as_str()))?
        else {
            return Ok(None);
        };
        let Some(merge) = Self::optional_buf(self.repo.branch_upstream_merge(refname.as_str()))?
        else {
            return Ok(None);
        };
        // A local upstream (remote = ".") is not a remote counterpart
        if remote == "." {
            return Ok(None);
        }
        let name = match RefName::new(merge.as_str()).ok().and_then(|r| r.local_branch()) {
            Some(name) => name,
            None => BranchName::new(merge)?,
        };
        Ok(Some(RemoteBranch::new(remote, name)))
    }

    fn remote_branch_tip(&self, remote: &RemoteBranch) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(&remote.ref_name())
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run_git_checked(&["fetch", remote])?;
        Ok(())
    }
}

impl BranchActions for Git {
    fn rebase_onto(
        &self,
        branch: &BranchName,
        onto: &Oid,
        fork_point: &Oid,
    ) -> Result<RebaseOutcome, GitError> {
        let output = self.run_git(&[
            "rebase",
            "--onto",
            onto.as_str(),
            fork_point.as_str(),
            branch.as_str(),
        ])?;

        if output.status.success() {
            return Ok(RebaseOutcome::Completed {
                new_tip: self.tip(branch)?,
            });
        }

        let details = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if self.state() == GitState::Rebase {
            // Leave the repository as it was so sibling branches can proceed
            self.run_git_checked(&["rebase", "--abort"])?;
            return Ok(RebaseOutcome::Conflict { details });
        }
        Err(GitError::CommandFailed {
            command: format!("rebase --onto {} {} {}", onto, fork_point, branch),
            message: details,
        })
    }

    fn push(
        &self,
        branch: &BranchName,
        remote: &str,
        force_with_lease: bool,
    ) -> Result<(), GitError> {
        let mut args = vec!["push", "--set-upstream"];
        if force_with_lease {
            args.push("--force-with-lease");
        }
        args.extend([remote, branch.as_str()]);
        self.run_git_checked(&args)?;
        Ok(())
    }

    fn set_tracking(
        &self,
        branch: &BranchName,
        counterpart: &RemoteBranch,
    ) -> Result<(), GitError> {
        let mut local = self
            .repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, RefName::for_branch(branch).as_str()))?;
        local.set_upstream(Some(&counterpart.to_string()))?;
        Ok(())
    }
}
