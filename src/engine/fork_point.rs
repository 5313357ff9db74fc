//! engine::fork_point
//!
//! Where a branch's own history begins relative to its declared parent.
//!
//! # Algorithm
//!
//! 1. Take the merge-base of branch and parent. No merge-base means
//!    [`EngineError::NoCommonHistory`]; a root commit is never guessed.
//! 2. If the parent tip is already in the branch's history, the merge-base
//!    is the parent tip and wins as [`ForkPointSource::ExplicitMergeBase`].
//! 3. Collect candidates: commits that some *other* branch pointed at
//!    according to its reflog (bookkeeping entries filtered out) and that
//!    are strict ancestors of the branch tip. Reflogs of the branch itself
//!    and of its layout descendants are not evidence, and neither is the tip
//!    itself (a branch that merged this one points there).
//! 4. Rank them with [`rank_candidates`]: closest to the tip first, then the
//!    most recent reflog entry, then by commit id.
//! 5. If the best candidate is strictly newer than the merge-base, the parent
//!    was rewritten after the branch forked (amend, rebase) and the candidate
//!    wins as [`ForkPointSource::InferredFromReflog`]. Otherwise the
//!    merge-base wins as [`ForkPointSource::ExplicitMergeBase`].
//!
//! Detection only reads the repository.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EngineError;
use crate::core::layout::Layout;
use crate::core::types::{BranchName, Oid};
use crate::git::{CommitGraph, GitError, ReflogEntry};

/// How a fork point was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForkPointSource {
    ExplicitMergeBase,
    InferredFromReflog,
}

impl std::fmt::Display for ForkPointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForkPointSource::ExplicitMergeBase => f.write_str("merge-base"),
            ForkPointSource::InferredFromReflog => f.write_str("reflog"),
        }
    }
}

/// A commit considered as fork point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub commit: Oid,
    /// Commits between the candidate and the branch tip
    pub distance: usize,
    /// Time of the reflog entry that mentioned the candidate
    pub timestamp: DateTime<Utc>,
    /// Branch whose reflog mentioned the candidate
    pub evidence: BranchName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForkPoint {
    pub commit: Oid,
    pub source: ForkPointSource,
    /// Merge-base of branch and parent at detection time
    pub merge_base: Oid,
    /// Ranked candidates, best first. Empty unless inferred from reflogs.
    pub candidates: Vec<Candidate>,
}

impl ForkPoint {
    fn at_merge_base(merge_base: Oid) -> Self {
        Self {
            commit: merge_base.clone(),
            source: ForkPointSource::ExplicitMergeBase,
            merge_base,
            candidates: Vec::new(),
        }
    }

    /// Whether a rebase would cut somewhere else than at the merge-base.
    pub fn is_off(&self) -> bool {
        self.commit != self.merge_base
    }
}

/// Whether a reflog entry is bookkeeping rather than evidence of where a
/// branch used to be.
///
/// ```
/// # use branchwise::engine::fork_point::is_bookkeeping;
/// # use branchwise::git::ReflogEntry;
/// # use branchwise::core::types::{BranchName, Oid};
/// let entry = |description: &str| ReflogEntry {
///     branch: BranchName::new("develop").unwrap(),
///     commit: Oid::synthetic(7),
///     timestamp: Default::default(),
///     description: description.to_string(),
/// };
/// assert!(is_bookkeeping(&entry("branch: Created from master")));
/// assert!(is_bookkeeping(&entry("commit (amend): Fix typo")));
/// assert!(!is_bookkeeping(&entry("commit: Add feature")));
/// ```
pub fn is_bookkeeping(entry: &ReflogEntry) -> bool {
    const PREFIXES: [&str; 7] = [
        "branch: Created from",
        "branch: Reset to ",
        "reset: moving to ",
        "fetch . ",
        "commit (amend)",
        "pull ",
        "pull:",
    ];
    let description = entry.description.as_str();
    PREFIXES.iter().any(|p| description.starts_with(p)) || is_noop_rebase_finish(entry)
}

/// `rebase (finish): refs/heads/x onto <sha>` where `<sha>` is the entry's own
/// commit: the branch was already where the rebase put it.
fn is_noop_rebase_finish(entry: &ReflogEntry) -> bool {
    let description = entry.description.as_str();
    if !description.starts_with("rebase") || !description.contains("finish") {
        return false;
    }
    description
        .rsplit_once(" onto ")
        .map(|(_, onto)| onto.trim())
        .is_some_and(|onto| !onto.is_empty() && entry.commit.as_str().starts_with(onto))
}

/// Filtered reflogs of every local branch, newest first per branch.
#[derive(Debug, Clone, Default)]
pub struct ReflogIndex {
    by_branch: BTreeMap<BranchName, Vec<ReflogEntry>>,
}

impl ReflogIndex {
    /// Read and filter the reflog of every local branch.
    pub fn build<G: CommitGraph + ?Sized>(graph: &G) -> Result<Self, GitError> {
        let mut entries = Vec::new();
        for branch in graph.local_branches()? {
            entries.extend(graph.reflog(&branch)?);
        }
        Ok(Self::from_entries(entries))
    }

    /// Index pre-read entries, dropping bookkeeping.
    pub fn from_entries(entries: impl IntoIterator<Item = ReflogEntry>) -> Self {
        let mut by_branch: BTreeMap<BranchName, Vec<ReflogEntry>> = BTreeMap::new();
        for entry in entries.into_iter().filter(|e| !is_bookkeeping(e)) {
            by_branch.entry(entry.branch.clone()).or_default().push(entry);
        }
        Self { by_branch }
    }

    /// Surviving entries of one branch.
    pub fn entries(&self, branch: &BranchName) -> &[ReflogEntry] {
        self.by_branch.get(branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total surviving entries.
    pub fn len(&self) -> usize {
        self.by_branch.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of every branch not in `excluded`.
    fn evidence<'a>(
        &'a self,
        excluded: &'a HashSet<BranchName>,
    ) -> impl Iterator<Item = &'a ReflogEntry> + 'a {
        self.by_branch
            .iter()
            .filter(move |(branch, _)| !excluded.contains(*branch))
            .flat_map(|(_, entries)| entries.iter())
    }
}

/// Order candidates best first and keep one per commit.
///
/// Closer to the tip wins, then the more recent reflog entry, then the
/// smaller commit id. A commit mentioned by several entries keeps its most
/// recent one.
pub fn rank_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<Oid, Candidate> = HashMap::new();
    for candidate in candidates {
        match best.get(&candidate.commit) {
            Some(existing)
                if (existing.timestamp, &candidate.evidence)
                    >= (candidate.timestamp, &existing.evidence) => {}
            _ => {
                best.insert(candidate.commit.clone(), candidate);
            }
        }
    }
    let mut ranked: Vec<Candidate> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| a.commit.cmp(&b.commit))
    });
    ranked
}

/// Reflog commits of other branches that are strict ancestors of `tip`.
fn collect_candidates<G: CommitGraph + ?Sized>(
    graph: &G,
    layout: &Layout,
    index: &ReflogIndex,
    branch: &BranchName,
    tip: &Oid,
) -> Result<Vec<Candidate>, GitError> {
    let mut excluded: HashSet<BranchName> = layout.descendants(branch).into_iter().collect();
    excluded.insert(branch.clone());

    // Ancestry answers per commit; reflogs repeat commits a lot
    let mut distances: HashMap<Oid, Option<usize>> = HashMap::new();
    let mut candidates = Vec::new();
    for entry in index.evidence(&excluded) {
        let distance = match distances.get(&entry.commit) {
            Some(known) => *known,
            None => {
                let distance = if graph.is_ancestor(&entry.commit, tip)? {
                    Some(graph.commit_count(&entry.commit, tip)?)
                } else {
                    None
                };
                distances.insert(entry.commit.clone(), distance);
                distance
            }
        };
        if let Some(distance) = distance.filter(|d| *d > 0) {
            candidates.push(Candidate {
                commit: entry.commit.clone(),
                distance,
                timestamp: entry.timestamp,
                evidence: entry.branch.clone(),
            });
        }
    }
    Ok(candidates)
}

/// Detect the fork point of `branch` relative to `parent`.
pub fn detect<G: CommitGraph + ?Sized>(
    graph: &G,
    layout: &Layout,
    index: &ReflogIndex,
    branch: &BranchName,
    parent: &BranchName,
) -> Result<ForkPoint, EngineError> {
    let tip = graph.tip(branch)?;
    let parent_tip = graph.tip(parent)?;
    let merge_base =
        graph
            .merge_base(&tip, &parent_tip)?
            .ok_or_else(|| EngineError::NoCommonHistory {
                branch: branch.clone(),
                parent: parent.clone(),
            })?;

    if merge_base == parent_tip {
        tracing::debug!(%branch, %parent, "parent tip is in branch history");
        return Ok(ForkPoint::at_merge_base(merge_base));
    }

    let candidates = rank_candidates(collect_candidates(graph, layout, index, branch, &tip)?);
    tracing::debug!(
        %branch,
        %parent,
        merge_base = merge_base.short(7),
        candidates = candidates.len(),
        "fork point candidates"
    );

    if let Some(top) = candidates.first() {
        if top.commit != merge_base && graph.is_ancestor(&merge_base, &top.commit)? {
            tracing::debug!(%branch, commit = top.commit.short(7), evidence = %top.evidence, "fork point inferred from reflog");
            return Ok(ForkPoint {
                commit: top.commit.clone(),
                source: ForkPointSource::InferredFromReflog,
                merge_base,
                candidates,
            });
        }
    }

    Ok(ForkPoint::at_merge_base(merge_base))
}
