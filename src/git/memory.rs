//! git::memory
//!
//! In-memory repository for deterministic testing.
//!
//! # Design
//!
//! `MemoryRepo` keeps a commit DAG, local branches with their reflogs,
//! remote-tracking refs and upstream configuration in memory, and implements
//! both [`CommitGraph`] and [`BranchActions`] over them. Builder methods
//! mirror the git porcelain that produced a history (commit, branch, amend,
//! reset, merge, push) and write the same reflog annotations git writes, so
//! fork-point inference sees realistic evidence.
//!
//! Commit timestamps come from a logical clock that advances one minute per
//! event; [`MemoryRepo::set_clock`] rewinds or advances it.
//!
//! # Example
//!
//! ```
//! use branchwise::git::{CommitGraph, MemoryRepo};
//! use branchwise::core::types::BranchName;
//!
//! let repo = MemoryRepo::new();
//! let base = repo.commit("main", "initial").unwrap();
//! repo.create_branch("feature", "main").unwrap();
//! let tip = repo.commit("feature", "add feature").unwrap();
//!
//! let main = repo.tip(&BranchName::new("main").unwrap()).unwrap();
//! assert_eq!(main, base);
//! assert!(repo.is_ancestor(&base, &tip).unwrap());
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::{BranchActions, CommitGraph, CommitSummary, GitError, RebaseOutcome, ReflogEntry};
use crate::core::types::{BranchName, Oid, RefName, RemoteBranch};

/// Initial value of the logical clock (seconds since the epoch).
pub const CLOCK_START: i64 = 1_700_000_000;

/// Seconds the clock advances per recorded event.
const TICK: i64 = 60;

/// Recorded backend call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperation {
    Fetch {
        remote: String,
    },
    Rebase {
        branch: BranchName,
        onto: Oid,
        fork_point: Oid,
    },
    Push {
        branch: BranchName,
        remote: String,
        force_with_lease: bool,
    },
    SetTracking {
        branch: BranchName,
        counterpart: RemoteBranch,
    },
}

#[derive(Debug, Clone)]
struct CommitData {
    parents: Vec<Oid>,
    time: DateTime<Utc>,
    message: String,
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    clock: i64,
    commits: HashMap<Oid, CommitData>,
    branches: BTreeMap<BranchName, Oid>,
    /// Oldest first; reversed on read.
    reflogs: HashMap<BranchName, Vec<ReflogEntry>>,
    remotes: BTreeMap<String, BTreeMap<BranchName, Oid>>,
    tracking: HashMap<BranchName, RemoteBranch>,
    conflicts: HashSet<BranchName>,
    failing_fetches: HashSet<String>,
    operations: Vec<MemoryOperation>,
}

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

fn not_found(branch: &BranchName) -> GitError {
    GitError::RefNotFound {
        refname: RefName::for_branch(branch).to_string(),
    }
}

impl Inner {
    fn now(&mut self) -> DateTime<Utc> {
        let time = at(self.clock);
        self.clock += TICK;
        time
    }

    fn new_commit(&mut self, parents: Vec<Oid>, message: &str) -> (Oid, DateTime<Utc>) {
        self.next_id += 1;
        let oid = Oid::synthetic(self.next_id);
        let time = self.now();
        self.commits.insert(
            oid.clone(),
            CommitData {
                parents,
                time,
                message: message.to_string(),
            },
        );
        (oid, time)
    }

    fn tip(&self, branch: &BranchName) -> Result<Oid, GitError> {
        self.branches
            .get(branch)
            .cloned()
            .ok_or_else(|| not_found(branch))
    }

    fn commit(&self, oid: &Oid) -> Result<&CommitData, GitError> {
        self.commits.get(oid).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    /// Move a branch and append to its reflog.
    fn update_ref(&mut self, branch: &BranchName, oid: Oid, time: DateTime<Utc>, description: String) {
        self.branches.insert(branch.clone(), oid.clone());
        self.reflogs
            .entry(branch.clone())
            .or_default()
            .push(ReflogEntry {
                branch: branch.clone(),
                commit: oid,
                timestamp: time,
                description,
            });
    }

    /// All commits reachable from `oid`, including itself.
    fn ancestors(&self, oid: &Oid) -> Result<HashSet<Oid>, GitError> {
        let mut seen = HashSet::new();
        let mut stack = vec![oid.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.commit(&current)?.parents.iter().cloned());
        }
        Ok(seen)
    }
}

/// In-memory repository implementing the full backend surface.
#[derive(Debug)]
pub struct MemoryRepo {
    inner: RefCell<Inner>,
}

impl MemoryRepo {
    /// Create an empty repository with no branches and no remotes.
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                next_id: 0,
                clock: CLOCK_START,
                commits: HashMap::new(),
                branches: BTreeMap::new(),
                reflogs: HashMap::new(),
                remotes: BTreeMap::new(),
                tracking: HashMap::new(),
                conflicts: HashSet::new(),
                failing_fetches: HashSet::new(),
                operations: Vec::new(),
            }),
        }
    }

    // =========================================================================
    // History builders
    // =========================================================================

    /// Set the logical clock used for the next commit or reflog entry.
    pub fn set_clock(&self, seconds: i64) {
        self.inner.borrow_mut().clock = seconds;
    }

    /// Commit on top of `branch`, creating it (as a root commit) if absent.
    pub fn commit(&self, branch: &str, message: &str) -> Result<Oid, GitError> {
        let branch = BranchName::new(branch)?;
        let mut inner = self.inner.borrow_mut();
        let parent = inner.branches.get(&branch).cloned();
        let description = match parent {
            Some(_) => format!("commit: {message}"),
            None => format!("commit (initial): {message}"),
        };
        let (oid, time) = inner.new_commit(parent.into_iter().collect(), message);
        inner.update_ref(&branch, oid.clone(), time, description);
        Ok(oid)
    }

    /// `git branch <name> <from>`
    pub fn create_branch(&self, name: &str, from: &str) -> Result<Oid, GitError> {
        let name = BranchName::new(name)?;
        let from = BranchName::new(from)?;
        let mut inner = self.inner.borrow_mut();
        let oid = inner.tip(&from)?;
        let time = inner.now();
        inner.update_ref(&name, oid.clone(), time, format!("branch: Created from {from}"));
        Ok(oid)
    }

    /// `git commit --amend`: replace the tip with a new commit on the same parents.
    pub fn amend(&self, branch: &str, message: &str) -> Result<Oid, GitError> {
        let branch = BranchName::new(branch)?;
        let mut inner = self.inner.borrow_mut();
        let tip = inner.tip(&branch)?;
        let parents = inner.commit(&tip)?.parents.clone();
        let (oid, time) = inner.new_commit(parents, message);
        inner.update_ref(&branch, oid.clone(), time, format!("commit (amend): {message}"));
        Ok(oid)
    }

    /// `git reset --hard <to>` while `branch` is checked out.
    pub fn reset(&self, branch: &str, to: &Oid) -> Result<(), GitError> {
        let branch = BranchName::new(branch)?;
        let mut inner = self.inner.borrow_mut();
        inner.commit(to)?;
        let time = inner.now();
        inner.update_ref(&branch, to.clone(), time, format!("reset: moving to {to}"));
        Ok(())
    }

    /// `git merge <other>` into `branch`, fast-forwarding when possible.
    pub fn merge(&self, branch: &str, other: &str) -> Result<Oid, GitError> {
        let branch = BranchName::new(branch)?;
        let other = BranchName::new(other)?;
        let mut inner = self.inner.borrow_mut();
        let ours = inner.tip(&branch)?;
        let theirs = inner.tip(&other)?;
        if inner.ancestors(&theirs)?.contains(&ours) {
            let time = inner.now();
            inner.update_ref(&branch, theirs.clone(), time, format!("merge {other}: Fast-forward"));
            return Ok(theirs);
        }
        let (oid, time) = inner.new_commit(vec![ours, theirs], &format!("Merge branch '{other}'"));
        inner.update_ref(
            &branch,
            oid.clone(),
            time,
            format!("merge {other}: Merge made by the 'ort' strategy."),
        );
        Ok(oid)
    }

    /// Add a remote with no branches.
    pub fn add_remote(&self, name: &str) {
        self.inner
            .borrow_mut()
            .remotes
            .entry(name.to_string())
            .or_default();
    }

    /// Copy the local tip of `branch` to `remote` without touching upstream
    /// configuration (someone else pushed the same commits).
    pub fn publish(&self, remote: &str, branch: &str) -> Result<Oid, GitError> {
        let branch = BranchName::new(branch)?;
        let mut inner = self.inner.borrow_mut();
        let tip = inner.tip(&branch)?;
        let refs = inner
            .remotes
            .get_mut(remote)
            .ok_or_else(|| unknown_remote("push", remote))?;
        refs.insert(branch, tip.clone());
        Ok(tip)
    }

    /// Commit on top of a remote-tracking branch (someone else pushed).
    pub fn commit_on_remote(&self, remote: &str, branch: &str, message: &str) -> Result<Oid, GitError> {
        let branch = BranchName::new(branch)?;
        let mut inner = self.inner.borrow_mut();
        let parent = inner
            .remotes
            .get(remote)
            .and_then(|refs| refs.get(&branch))
            .cloned()
            .ok_or_else(|| GitError::RefNotFound {
                refname: RefName::for_remote_branch(remote, &branch).to_string(),
            })?;
        let (oid, _) = inner.new_commit(vec![parent], message);
        if let Some(refs) = inner.remotes.get_mut(remote) {
            refs.insert(branch, oid.clone());
        }
        Ok(oid)
    }

    /// Configure `remote/branch` as the upstream of `branch`.
    pub fn track(&self, branch: &str, remote: &str) -> Result<(), GitError> {
        let branch = BranchName::new(branch)?;
        self.inner
            .borrow_mut()
            .tracking
            .insert(branch.clone(), RemoteBranch::new(remote, branch));
        Ok(())
    }

    /// Make every later rebase of `branch` stop on a conflict.
    pub fn fail_rebase(&self, branch: &str) -> Result<(), GitError> {
        let branch = BranchName::new(branch)?;
        self.inner.borrow_mut().conflicts.insert(branch);
        Ok(())
    }

    /// Make every later fetch of `remote` fail.
    pub fn fail_fetch(&self, remote: &str) {
        self.inner
            .borrow_mut()
            .failing_fetches
            .insert(remote.to_string());
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Backend calls recorded so far, in order.
    pub fn operations(&self) -> Vec<MemoryOperation> {
        self.inner.borrow().operations.clone()
    }

    /// Message of a commit, if it exists.
    pub fn message(&self, oid: &Oid) -> Option<String> {
        self.inner.borrow().commits.get(oid).map(|c| c.message.clone())
    }

    fn record(&self, op: MemoryOperation) {
        self.inner.borrow_mut().operations.push(op);
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_remote(command: &str, remote: &str) -> GitError {
    GitError::CommandFailed {
        command: format!("{command} {remote}"),
        message: format!("'{remote}' does not appear to be a git repository"),
    }
}

impl CommitGraph for MemoryRepo {
    fn tip(&self, branch: &BranchName) -> Result<Oid, GitError> {
        self.inner.borrow().tip(branch)
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        let inner = self.inner.borrow();
        let ours = inner.ancestors(a)?;
        let theirs = inner.ancestors(b)?;
        let common: Vec<&Oid> = ours.intersection(&theirs).collect();

        let mut best: Option<(DateTime<Utc>, &Oid)> = None;
        for candidate in &common {
            let mut dominated = false;
            for other in &common {
                if other != candidate && inner.ancestors(other)?.contains(*candidate) {
                    dominated = true;
                    break;
                }
            }
            if dominated {
                continue;
            }
            let key = (inner.commit(candidate)?.time, *candidate);
            if best.map_or(true, |current| key > current) {
                best = Some(key);
            }
        }
        Ok(best.map(|(_, oid)| oid.clone()))
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        Ok(self.inner.borrow().ancestors(descendant)?.contains(ancestor))
    }

    fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError> {
        let inner = self.inner.borrow();
        let hidden = inner.ancestors(base)?;
        Ok(inner.ancestors(tip)?.difference(&hidden).count())
    }

    fn commits_between(&self, base: &Oid, tip: &Oid) -> Result<Vec<CommitSummary>, GitError> {
        let inner = self.inner.borrow();
        let hidden = inner.ancestors(base)?;
        let mut commits = Vec::new();
        for oid in inner.ancestors(tip)?.difference(&hidden) {
            let data = inner.commit(oid)?;
            commits.push(CommitSummary {
                oid: oid.clone(),
                summary: data.message.lines().next().unwrap_or_default().to_string(),
                time: data.time,
            });
        }
        commits.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| b.oid.cmp(&a.oid)));
        Ok(commits)
    }

    fn commit_time(&self, oid: &Oid) -> Result<DateTime<Utc>, GitError> {
        Ok(self.inner.borrow().commit(oid)?.time)
    }

    fn local_branches(&self) -> Result<Vec<BranchName>, GitError> {
        Ok(self.inner.borrow().branches.keys().cloned().collect())
    }

    fn reflog(&self, branch: &BranchName) -> Result<Vec<ReflogEntry>, GitError> {
        let inner = self.inner.borrow();
        Ok(inner
            .reflogs
            .get(branch)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn remotes(&self) -> Result<Vec<String>, GitError> {
        Ok(self.inner.borrow().remotes.keys().cloned().collect())
    }

    fn tracking_counterpart(&self, branch: &BranchName) -> Result<Option<RemoteBranch>, GitError> {
        Ok(self.inner.borrow().tracking.get(branch).cloned())
    }

    fn remote_branch_tip(&self, remote: &RemoteBranch) -> Result<Option<Oid>, GitError> {
        Ok(self
            .inner
            .borrow()
            .remotes
            .get(&remote.remote)
            .and_then(|refs| refs.get(&remote.branch))
            .cloned())
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.record(MemoryOperation::Fetch {
            remote: remote.to_string(),
        });
        let inner = self.inner.borrow();
        if !inner.remotes.contains_key(remote) {
            return Err(unknown_remote("fetch", remote));
        }
        if inner.failing_fetches.contains(remote) {
            return Err(GitError::CommandFailed {
                command: format!("fetch {remote}"),
                message: "could not read from remote repository".to_string(),
            });
        }
        Ok(())
    }
}

impl BranchActions for MemoryRepo {
    fn rebase_onto(
        &self,
        branch: &BranchName,
        onto: &Oid,
        fork_point: &Oid,
    ) -> Result<RebaseOutcome, GitError> {
        self.record(MemoryOperation::Rebase {
            branch: branch.clone(),
            onto: onto.clone(),
            fork_point: fork_point.clone(),
        });

        let mut inner = self.inner.borrow_mut();
        if inner.conflicts.contains(branch) {
            return Ok(RebaseOutcome::Conflict {
                details: format!("CONFLICT (content): Merge conflict while rebasing {branch}"),
            });
        }

        // Commits to replay, following first parents back to the fork point
        let excluded = inner.ancestors(fork_point)?;
        let mut replay = Vec::new();
        let mut cursor = Some(inner.tip(branch)?);
        while let Some(oid) = cursor.filter(|oid| !excluded.contains(oid)) {
            let data = inner.commit(&oid)?;
            cursor = data.parents.first().cloned();
            replay.push(data.message.clone());
        }

        let mut base = onto.clone();
        for message in replay.iter().rev() {
            let (oid, _) = inner.new_commit(vec![base], message);
            base = oid;
        }
        let time = inner.now();
        inner.update_ref(
            branch,
            base.clone(),
            time,
            format!("rebase (finish): refs/heads/{branch} onto {onto}"),
        );
        Ok(RebaseOutcome::Completed { new_tip: base })
    }

    fn push(
        &self,
        branch: &BranchName,
        remote: &str,
        force_with_lease: bool,
    ) -> Result<(), GitError> {
        self.record(MemoryOperation::Push {
            branch: branch.clone(),
            remote: remote.to_string(),
            force_with_lease,
        });

        let mut inner = self.inner.borrow_mut();
        let tip = inner.tip(branch)?;
        let existing = inner
            .remotes
            .get(remote)
            .ok_or_else(|| unknown_remote("push", remote))?
            .get(branch)
            .cloned();
        if let Some(existing) = existing {
            if !force_with_lease && !inner.ancestors(&tip)?.contains(&existing) {
                return Err(GitError::CommandFailed {
                    command: format!("push {remote} {branch}"),
                    message: "rejected (non-fast-forward)".to_string(),
                });
            }
        }
        if let Some(refs) = inner.remotes.get_mut(remote) {
            refs.insert(branch.clone(), tip);
        }
        inner
            .tracking
            .insert(branch.clone(), RemoteBranch::new(remote, branch.clone()));
        Ok(())
    }

    fn set_tracking(
        &self,
        branch: &BranchName,
        counterpart: &RemoteBranch,
    ) -> Result<(), GitError> {
        self.record(MemoryOperation::SetTracking {
            branch: branch.clone(),
            counterpart: counterpart.clone(),
        });
        let mut inner = self.inner.borrow_mut();
        inner.tip(branch)?;
        inner.tracking.insert(branch.clone(), counterpart.clone());
        Ok(())
    }
}
