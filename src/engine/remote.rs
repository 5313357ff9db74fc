//! engine::remote
//!
//! Choosing the remote a branch should be compared with and pushed to.
//!
//! # Priority
//!
//! 1. The remote of the branch's tracking counterpart. Never prompts.
//! 2. `origin`, silently under [`OriginPolicy::Assume`], after a `(y, N, q)`
//!    confirmation under [`OriginPolicy::Confirm`]. Declining moves on.
//! 3. The only remote. Never prompts.
//! 4. The only remote holding a same-named branch at the same tip: offer to
//!    adopt that counterpart (tracking config only, no data transfer).
//! 5. A numbered listing `[1] .. [N]` in remote-name order.
//!
//! After a numbered selection the adoption offer is repeated for the chosen
//! remote when its same-named branch already sits at the branch tip.
//!
//! Without anyone to answer, an unconfirmed `origin` and an unaccepted
//! adoption count as declined, and the listing ends in
//! [`EngineError::AmbiguousRemote`].

use serde::Serialize;

use super::session::Session;
use super::{EngineError, InterruptCause};
use crate::core::config::OriginPolicy;
use crate::core::types::{BranchName, Oid, RemoteBranch};
use crate::ui::prompts::{Choice, Interaction, Prompt};

const ORIGIN: &str = "origin";

/// A remote considered during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCandidate {
    pub remote: String,
    pub counterpart_exists: bool,
    pub counterpart_commit: Option<Oid>,
}

/// Which rule picked the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolvedBy {
    Tracking,
    Origin,
    SoleRemote,
    /// Tracking now points at an existing identical counterpart.
    Adopted,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRemote {
    pub remote: String,
    pub by: ResolvedBy,
    /// The operator answered `yq`: the adoption was applied, then stop.
    pub quit_requested: bool,
}

impl ResolvedRemote {
    fn new(remote: impl Into<String>, by: ResolvedBy) -> Self {
        Self {
            remote: remote.into(),
            by,
            quit_requested: false,
        }
    }
}

enum Adoption {
    Adopted { quit: bool },
    Declined,
}

/// Resolve the remote for `branch`, prompting through `port` when the
/// repository does not settle it.
pub fn resolve_remote(
    session: &mut Session<'_>,
    branch: &BranchName,
    policy: OriginPolicy,
    port: &mut dyn Interaction,
) -> Result<ResolvedRemote, EngineError> {
    let graph = session.backend();

    if let Some(counterpart) = graph.tracking_counterpart(branch)? {
        return Ok(ResolvedRemote::new(counterpart.remote, ResolvedBy::Tracking));
    }

    let mut remotes = graph.remotes()?;
    if remotes.is_empty() {
        return Err(EngineError::NoRemotesConfigured {
            branch: branch.clone(),
        });
    }

    let has_origin = remotes.iter().any(|r| r == ORIGIN);
    if has_origin {
        match policy {
            OriginPolicy::Assume => return Ok(ResolvedRemote::new(ORIGIN, ResolvedBy::Origin)),
            OriginPolicy::Confirm => {
                let prompt = Prompt::tokens(
                    format!("Use remote {ORIGIN} for branch {branch}?"),
                    &["y", "N", "q"],
                );
                match port.prompt_choice(&prompt) {
                    Choice::Token(t) if t == "y" => {
                        return Ok(ResolvedRemote::new(ORIGIN, ResolvedBy::Origin))
                    }
                    Choice::Quit => return Err(interrupted(branch, InterruptCause::Quit)),
                    _ => remotes.retain(|r| r != ORIGIN),
                }
            }
        }
    }

    match remotes.len() {
        0 => {
            return Err(EngineError::AmbiguousRemote {
                branch: branch.clone(),
                remotes: vec![ORIGIN.to_string()],
            })
        }
        1 => return Ok(ResolvedRemote::new(remotes.remove(0), ResolvedBy::SoleRemote)),
        _ => {}
    }

    let candidates = remote_candidates(session, branch, &remotes)?;
    let tip = graph.tip(branch)?;
    let mut identical = candidates
        .iter()
        .filter(|c| c.counterpart_commit.as_ref() == Some(&tip));
    if let (Some(only), None) = (identical.next(), identical.next()) {
        match offer_adoption(session, branch, &only.remote, port)? {
            Adoption::Adopted { quit } => return Ok(adopted(&only.remote, quit)),
            Adoption::Declined => {}
        }
    }

    let remote = select_remote(branch, &remotes, has_origin, port)?;
    let same_tip = candidates
        .iter()
        .any(|c| c.remote == remote && c.counterpart_commit.as_ref() == Some(&tip));
    if same_tip {
        if let Adoption::Adopted { quit } = offer_adoption(session, branch, &remote, port)? {
            return Ok(adopted(&remote, quit));
        }
    }
    Ok(ResolvedRemote::new(remote, ResolvedBy::Selected))
}

/// Same-named counterpart of `branch` on each remote.
pub fn remote_candidates(
    session: &Session<'_>,
    branch: &BranchName,
    remotes: &[String],
) -> Result<Vec<RemoteCandidate>, EngineError> {
    let graph = session.backend();
    remotes
        .iter()
        .map(|remote| {
            let commit = graph.remote_branch_tip(&RemoteBranch::new(remote.clone(), branch.clone()))?;
            Ok(RemoteCandidate {
                remote: remote.clone(),
                counterpart_exists: commit.is_some(),
                counterpart_commit: commit,
            })
        })
        .collect()
}

fn interrupted(branch: &BranchName, cause: InterruptCause) -> EngineError {
    EngineError::ResolutionInterrupted {
        branch: branch.clone(),
        cause,
    }
}

fn adopted(remote: &str, quit: bool) -> ResolvedRemote {
    ResolvedRemote {
        remote: remote.to_string(),
        by: ResolvedBy::Adopted,
        quit_requested: quit,
    }
}

fn offer_adoption(
    session: &mut Session<'_>,
    branch: &BranchName,
    remote: &str,
    port: &mut dyn Interaction,
) -> Result<Adoption, EngineError> {
    let counterpart = RemoteBranch::new(remote, branch.clone());
    let prompt = Prompt::tokens(
        format!(
            "Branch {branch} is untracked, but its remote counterpart candidate {counterpart} \
             already exists and both branches point to the same commit.\n\
             Set the remote of {branch} to {remote} without pushing or pulling?"
        ),
        &["y", "N", "q", "yq"],
    );
    let quit = match port.prompt_choice(&prompt) {
        Choice::Token(t) if t == "y" => false,
        Choice::Token(t) if t == "yq" => true,
        Choice::Quit => return Err(interrupted(branch, InterruptCause::Quit)),
        _ => return Ok(Adoption::Declined),
    };
    session.backend().set_tracking(branch, &counterpart)?;
    session.invalidate(branch);
    tracing::debug!(%branch, %counterpart, "adopted remote counterpart");
    Ok(Adoption::Adopted { quit })
}

fn select_remote(
    branch: &BranchName,
    remotes: &[String],
    has_origin: bool,
    port: &mut dyn Interaction,
) -> Result<String, EngineError> {
    let mut message = if has_origin {
        format!("Branch {branch} is untracked.\n")
    } else {
        format!("Branch {branch} is untracked and there's no {ORIGIN} repository.\n")
    };
    for (i, remote) in remotes.iter().enumerate() {
        message.push_str(&format!("[{}] {}\n", i + 1, remote));
    }
    message.push_str(&format!(
        "Select number 1..{} to specify the destination remote repository, or 'q' to quit:",
        remotes.len()
    ));

    match port.prompt_choice(&Prompt::index(message, remotes.len())) {
        Choice::Token(answer) => answer
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=remotes.len()).contains(n))
            .map(|n| remotes[n - 1].clone())
            .ok_or_else(|| EngineError::InvalidSelectionIndex {
                branch: branch.clone(),
                index: answer,
                count: remotes.len(),
            }),
        Choice::Quit => Err(interrupted(branch, InterruptCause::Quit)),
        Choice::Unanswered => Err(EngineError::AmbiguousRemote {
            branch: branch.clone(),
            remotes: remotes.to_vec(),
        }),
        Choice::Invalid(raw) => Err(interrupted(
            branch,
            InterruptCause::Unparseable(raw.trim().to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::name;
    use crate::git::memory::MemoryOperation;
    use crate::git::{CommitGraph, MemoryRepo};
    use crate::ui::prompts::ScriptedPrompt;

    /// `feature` at the same tip on origin_1 and origin_2, no tracking.
    fn two_identical_remotes() -> MemoryRepo {
        let repo = MemoryRepo::new();
        repo.add_remote("origin_1");
        repo.add_remote("origin_2");
        repo.commit("root", "r1").unwrap();
        repo.create_branch("feature", "root").unwrap();
        repo.commit("feature", "f1").unwrap();
        repo.publish("origin_1", "feature").unwrap();
        repo.publish("origin_2", "feature").unwrap();
        repo
    }

    fn resolve(repo: &MemoryRepo, answers: &[&str]) -> (Result<ResolvedRemote, EngineError>, ScriptedPrompt) {
        let mut session = Session::new(repo);
        let mut port = ScriptedPrompt::new(answers.iter().copied());
        let result = resolve_remote(&mut session, &name("feature"), OriginPolicy::Assume, &mut port);
        (result, port)
    }

    #[test]
    fn tracking_counterpart_wins_over_origin() {
        let repo = two_identical_remotes();
        repo.add_remote("origin");
        repo.track("feature", "origin_2").unwrap();

        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::default();
        let resolved =
            resolve_remote(&mut session, &name("feature"), OriginPolicy::Confirm, &mut port).unwrap();
        assert_eq!(resolved, ResolvedRemote::new("origin_2", ResolvedBy::Tracking));
        assert!(port.transcript().is_empty());
    }

    #[test]
    fn origin_is_assumed_or_confirmed() {
        let repo = two_identical_remotes();
        repo.add_remote("origin");

        let (resolved, port) = resolve(&repo, &[]);
        assert_eq!(resolved.unwrap().by, ResolvedBy::Origin);
        assert!(port.transcript().is_empty());

        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::new(["y"]);
        let resolved =
            resolve_remote(&mut session, &name("feature"), OriginPolicy::Confirm, &mut port).unwrap();
        assert_eq!(resolved.remote, "origin");
        assert_eq!(
            port.transcript(),
            ["Use remote origin for branch feature? (y, N, q)"]
        );
    }

    #[test]
    fn declining_origin_falls_through_to_selection() {
        let repo = two_identical_remotes();
        repo.add_remote("origin");
        repo.commit("feature", "f2").unwrap();

        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::new(["n", "2"]);
        let resolved =
            resolve_remote(&mut session, &name("feature"), OriginPolicy::Confirm, &mut port).unwrap();
        assert_eq!(resolved, ResolvedRemote::new("origin_2", ResolvedBy::Selected));
        assert!(port.transcript()[1].starts_with("Branch feature is untracked.\n[1] origin_1\n[2] origin_2\n"));
    }

    #[test]
    fn sole_remote_never_prompts() {
        let repo = MemoryRepo::new();
        repo.add_remote("upstream");
        repo.commit("feature", "f1").unwrap();
        let (resolved, port) = resolve(&repo, &[]);
        assert_eq!(resolved.unwrap(), ResolvedRemote::new("upstream", ResolvedBy::SoleRemote));
        assert!(port.transcript().is_empty());
    }

    #[test]
    fn no_remotes_is_an_error() {
        let repo = MemoryRepo::new();
        repo.commit("feature", "f1").unwrap();
        let (resolved, _) = resolve(&repo, &[]);
        assert!(matches!(resolved, Err(EngineError::NoRemotesConfigured { .. })));
    }

    #[test]
    fn unique_identical_counterpart_is_offered_for_adoption() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin_1");
        repo.add_remote("origin_2");
        repo.commit("feature", "f1").unwrap();
        repo.publish("origin_2", "feature").unwrap();

        let (resolved, port) = resolve(&repo, &["y"]);
        assert_eq!(resolved.unwrap().by, ResolvedBy::Adopted);
        assert_eq!(port.transcript().len(), 1);
        assert!(port.transcript()[0].contains("origin_2/feature already exists"));
        assert_eq!(
            repo.tracking_counterpart(&name("feature")).unwrap().unwrap().remote,
            "origin_2"
        );
    }

    #[test]
    fn selection_then_adoption_without_transfer() {
        let repo = two_identical_remotes();
        let (resolved, port) = resolve(&repo, &["1", "y"]);
        assert_eq!(resolved.unwrap(), adopted("origin_1", false));
        assert_eq!(
            port.transcript(),
            [
                "Branch feature is untracked and there's no origin repository.\n\
                 [1] origin_1\n\
                 [2] origin_2\n\
                 Select number 1..2 to specify the destination remote repository, or 'q' to quit:",
                "Branch feature is untracked, but its remote counterpart candidate origin_1/feature \
                 already exists and both branches point to the same commit.\n\
                 Set the remote of feature to origin_1 without pushing or pulling? (y, N, q, yq)",
            ]
        );

        let operations = repo.operations();
        assert_eq!(
            operations,
            vec![MemoryOperation::SetTracking {
                branch: name("feature"),
                counterpart: RemoteBranch::new("origin_1", name("feature")),
            }]
        );
    }

    #[test]
    fn adopt_then_quit() {
        let repo = two_identical_remotes();
        let (resolved, _) = resolve(&repo, &["1", "yq"]);
        let resolved = resolved.unwrap();
        assert!(resolved.quit_requested);
        assert!(repo.tracking_counterpart(&name("feature")).unwrap().is_some());
    }

    #[test]
    fn quitting_adoption_is_an_interruption() {
        let repo = two_identical_remotes();
        let (resolved, _) = resolve(&repo, &["1", "q"]);
        assert!(resolved.unwrap_err().is_quit());
        assert!(repo.tracking_counterpart(&name("feature")).unwrap().is_none());
    }

    #[test]
    fn out_of_range_index() {
        let repo = two_identical_remotes();
        let (resolved, _) = resolve(&repo, &["3"]);
        assert!(matches!(
            resolved,
            Err(EngineError::InvalidSelectionIndex { ref index, count: 2, .. }) if index == "3"
        ));
    }

    #[test]
    fn unparseable_selection() {
        let repo = two_identical_remotes();
        let (resolved, _) = resolve(&repo, &["xd"]);
        assert!(matches!(
            resolved,
            Err(EngineError::ResolutionInterrupted {
                cause: InterruptCause::Unparseable(ref raw),
                ..
            }) if raw == "xd"
        ));
    }

    #[test]
    fn nobody_to_choose_means_ambiguous() {
        let repo = two_identical_remotes();
        repo.add_remote("origin");
        repo.commit("feature", "f2").unwrap();

        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::unattended();
        let resolved =
            resolve_remote(&mut session, &name("feature"), OriginPolicy::Confirm, &mut port);
        assert!(matches!(
            resolved,
            Err(EngineError::AmbiguousRemote { ref remotes, .. })
                if remotes == &["origin_1".to_string(), "origin_2".to_string()]
        ));
        assert_eq!(port.transcript().len(), 2);
        assert!(repo.operations().is_empty());
    }

    #[test]
    fn unattended_adoption_is_not_applied() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin_1");
        repo.add_remote("origin_2");
        repo.commit("feature", "f1").unwrap();
        repo.publish("origin_2", "feature").unwrap();

        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::unattended();
        let resolved =
            resolve_remote(&mut session, &name("feature"), OriginPolicy::Assume, &mut port);
        assert!(matches!(resolved, Err(EngineError::AmbiguousRemote { .. })));
        assert!(repo.tracking_counterpart(&name("feature")).unwrap().is_none());
    }

    #[test]
    fn quit_at_selection() {
        let repo = two_identical_remotes();
        let (resolved, port) = resolve(&repo, &["q"]);
        assert!(resolved.unwrap_err().is_quit());
        assert_eq!(port.transcript().len(), 1);
    }
}
