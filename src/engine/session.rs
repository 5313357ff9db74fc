//! engine::session
//!
//! State that lives for exactly one engine run.
//!
//! A [`Session`] borrows the repository backend and caches:
//! - fork points per (branch, parent), so a rebase target announced to the
//!   operator does not move mid-run
//! - which remotes were fetched, so each remote is fetched at most once
//! - the [`ReflogIndex`], built on first use
//!
//! Only [`Session::invalidate`] drops cached fork points; the engine calls it
//! after it rebases, slides out or retracks a branch.

use std::collections::{HashMap, HashSet};

use super::fork_point::{self, ForkPoint, ReflogIndex};
use super::EngineError;
use crate::core::layout::Layout;
use crate::core::types::BranchName;
use crate::git::Backend;

pub struct Session<'r> {
    backend: &'r dyn Backend,
    fork_points: HashMap<(BranchName, BranchName), ForkPoint>,
    fetched: HashSet<String>,
    reflog_index: Option<ReflogIndex>,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("fork_points", &self.fork_points.len())
            .field("fetched", &self.fetched)
            .field("reflog_index_built", &self.reflog_index.is_some())
            .finish()
    }
}

impl<'r> Session<'r> {
    pub fn new(backend: &'r dyn Backend) -> Self {
        Self {
            backend,
            fork_points: HashMap::new(),
            fetched: HashSet::new(),
            reflog_index: None,
        }
    }

    pub fn backend(&self) -> &'r dyn Backend {
        self.backend
    }

    /// The reflog index, built from every local branch on first use.
    pub fn reflog_index(&mut self) -> Result<&ReflogIndex, EngineError> {
        let index = match self.reflog_index.take() {
            Some(index) => index,
            None => {
                let index = ReflogIndex::build(self.backend)?;
                tracing::debug!(entries = index.len(), "built reflog index");
                index
            }
        };
        Ok(self.reflog_index.insert(index))
    }

    /// Fork point of `branch` relative to `parent`, computed once per run.
    pub fn fork_point(
        &mut self,
        layout: &Layout,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<ForkPoint, EngineError> {
        let key = (branch.clone(), parent.clone());
        if let Some(cached) = self.fork_points.get(&key) {
            return Ok(cached.clone());
        }
        let backend = self.backend;
        let index = self.reflog_index()?;
        let detected = fork_point::detect(backend, layout, index, branch, parent)?;
        self.fork_points.insert(key, detected.clone());
        Ok(detected)
    }

    /// Fetch `remote` unless this session already did.
    ///
    /// Returns `true` when a fetch actually ran.
    pub fn ensure_fetched(&mut self, remote: &str) -> Result<bool, EngineError> {
        if self.fetched.contains(remote) {
            return Ok(false);
        }
        tracing::debug!(remote, "fetching");
        self.backend
            .fetch(remote)
            .map_err(|e| EngineError::RemoteQueryFailure {
                remote: remote.to_string(),
                message: e.to_string(),
            })?;
        self.fetched.insert(remote.to_string());
        Ok(true)
    }

    /// Fetch every configured remote once.
    pub fn fetch_all(&mut self) -> Result<Vec<String>, EngineError> {
        let mut fetched = Vec::new();
        for remote in self.backend.remotes()? {
            if self.ensure_fetched(&remote)? {
                fetched.push(remote);
            }
        }
        Ok(fetched)
    }

    pub fn was_fetched(&self, remote: &str) -> bool {
        self.fetched.contains(remote)
    }

    /// Forget everything derived from `branch` after the engine mutated it.
    pub fn invalidate(&mut self, branch: &BranchName) {
        self.fork_points
            .retain(|(b, p), _| b != branch && p != branch);
        self.reflog_index = None;
        tracing::debug!(%branch, "invalidated cached fork points");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{layout, name};
    use crate::git::{memory::MemoryOperation, MemoryRepo};

    #[test]
    fn fork_point_is_stable_until_invalidated() {
        let repo = MemoryRepo::new();
        repo.commit("main", "base").unwrap();
        repo.create_branch("feature", "main").unwrap();
        repo.commit("feature", "f1").unwrap();
        let layout = layout("main\n  feature\n");

        let mut session = Session::new(&repo);
        let first = session
            .fork_point(&layout, &name("feature"), &name("main"))
            .unwrap();

        // History changes under the session; the cached answer does not
        let moved = repo.commit("main", "m1").unwrap();
        repo.merge("feature", "main").unwrap();
        let second = session
            .fork_point(&layout, &name("feature"), &name("main"))
            .unwrap();
        assert_eq!(first, second);

        session.invalidate(&name("feature"));
        let third = session
            .fork_point(&layout, &name("feature"), &name("main"))
            .unwrap();
        assert_eq!(third.commit, moved);
    }

    #[test]
    fn each_remote_is_fetched_once() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.add_remote("upstream");
        let mut session = Session::new(&repo);

        assert!(session.ensure_fetched("origin").unwrap());
        assert!(!session.ensure_fetched("origin").unwrap());
        assert_eq!(session.fetch_all().unwrap(), vec!["upstream".to_string()]);
        assert!(session.was_fetched("upstream"));

        let fetches = repo
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MemoryOperation::Fetch { .. }))
            .count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn fetch_failure_is_a_remote_query_failure() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.fail_fetch("origin");
        let mut session = Session::new(&repo);

        let err = session.ensure_fetched("origin").unwrap_err();
        assert!(matches!(err, EngineError::RemoteQueryFailure { ref remote, .. } if remote == "origin"));
        assert!(!session.was_fetched("origin"));
    }
}
