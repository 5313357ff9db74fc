//! engine::pull_request
//!
//! Everything that has to be true before a pull request for a branch can be
//! opened: the base is the layout parent, the head is on a resolved remote,
//! and the base exists there too. Talking to a hosting API is left to the
//! caller; this module stops at [`PullRequestPlan`].

use serde::Serialize;

use super::parent_status::{evaluate_parent, SyncToParentStatus};
use super::remote::resolve_remote;
use super::remote_status::{classify_remote, compare_with_counterpart, SyncToRemoteStatus};
use super::session::Session;
use super::EngineError;
use crate::core::config::OriginPolicy;
use crate::core::layout::Layout;
use crate::core::types::{BranchName, RemoteBranch};
use crate::ui::prompts::{Choice, Interaction, Prompt};

/// Inputs for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestPlan {
    pub head: BranchName,
    pub base: BranchName,
    pub remote: String,
    /// Head status after any push done here
    pub head_status: SyncToRemoteStatus,
    pub base_on_remote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Ready(PullRequestPlan),
    Interrupted,
}

enum Step {
    Proceed,
    Interrupt,
}

/// `(y, Q)`: anything but yes stops.
fn confirm_or_stop(port: &mut dyn Interaction, message: String) -> bool {
    matches!(
        port.prompt_choice(&Prompt::tokens(message, &["y", "Q"])),
        Choice::Token(t) if t == "y"
    )
}

/// `(y, N, q)`: `Some(true)` for yes, `Some(false)` for no, `None` to stop.
fn confirm_or_skip(port: &mut dyn Interaction, message: String) -> Option<bool> {
    match port.prompt_choice(&Prompt::tokens(message, &["y", "N", "q"])) {
        Choice::Token(t) if t == "y" => Some(true),
        Choice::Quit | Choice::Unanswered => None,
        _ => Some(false),
    }
}

/// Prepare a pull request of `branch` against its layout parent.
pub fn prepare_pull_request(
    session: &mut Session<'_>,
    layout: &Layout,
    branch: &BranchName,
    policy: OriginPolicy,
    port: &mut dyn Interaction,
) -> Result<PullRequestOutcome, EngineError> {
    let evaluation = evaluate_parent(session, layout, branch)?;
    let base = evaluation.parent;
    if evaluation.status == SyncToParentStatus::MergedIntoParent {
        return Err(EngineError::NothingToPropose {
            branch: branch.clone(),
            parent: base,
        });
    }

    let resolved = match resolve_remote(session, branch, policy, port) {
        Ok(resolved) => resolved,
        Err(err) if err.is_quit() => return Ok(PullRequestOutcome::Interrupted),
        Err(err) => return Err(err),
    };
    if resolved.quit_requested {
        return Ok(PullRequestOutcome::Interrupted);
    }
    let remote = resolved.remote;
    session.ensure_fetched(&remote)?;

    let graph = session.backend();
    let push_allowed = layout.attributes(branch).push;
    let mut head_status = head_status(session, branch, &remote)?;
    tracing::debug!(%branch, %remote, status = %head_status, "head classified");

    let step = match head_status {
        SyncToRemoteStatus::Untracked if push_allowed => {
            if confirm_or_stop(port, format!("Push untracked branch {branch} to {remote}?")) {
                graph.push(branch, &remote, false)?;
                head_status = SyncToRemoteStatus::InSync;
                Step::Proceed
            } else {
                Step::Interrupt
            }
        }
        SyncToRemoteStatus::AheadOfRemote if push_allowed => {
            match confirm_or_skip(port, format!("Push {branch} to {remote}?")) {
                Some(true) => {
                    graph.push(branch, &remote, false)?;
                    head_status = SyncToRemoteStatus::InSync;
                    Step::Proceed
                }
                Some(false) => Step::Proceed,
                None => Step::Interrupt,
            }
        }
        SyncToRemoteStatus::DivergedFromAndNewerThanRemote if push_allowed => {
            port.notify(&format!(
                "Branch {branch} diverged from (and has newer commits than) its remote counterpart {remote}/{branch}."
            ));
            match confirm_or_skip(port, format!("Push {branch} with force-with-lease to {remote}?")) {
                Some(true) => {
                    graph.push(branch, &remote, true)?;
                    head_status = SyncToRemoteStatus::InSync;
                    Step::Proceed
                }
                Some(false) => Step::Proceed,
                None => Step::Interrupt,
            }
        }
        SyncToRemoteStatus::BehindRemote => {
            port.notify(&format!(
                "Warn: Branch {branch} is behind its remote counterpart. Consider using git pull."
            ));
            proceed(port)
        }
        SyncToRemoteStatus::DivergedFromAndOlderThanRemote => {
            port.notify(&format!(
                "Warn: Branch {branch} is diverged from and older than its remote counterpart. \
                 Consider using git reset --keep."
            ));
            proceed(port)
        }
        _ => Step::Proceed,
    };
    if let Step::Interrupt = step {
        return Ok(PullRequestOutcome::Interrupted);
    }

    let base_counterpart = RemoteBranch::new(remote.clone(), base.clone());
    let mut base_on_remote = graph.remote_branch_tip(&base_counterpart)?.is_some();
    if !base_on_remote && layout.attributes(&base).push {
        port.notify(&format!(
            "Warn: Base branch for this PR ({base}) is not found on remote, pushing..."
        ));
        if !confirm_or_stop(port, format!("Push untracked branch {base} to {remote}?")) {
            return Ok(PullRequestOutcome::Interrupted);
        }
        graph.push(&base, &remote, false)?;
        base_on_remote = true;
    }

    Ok(PullRequestOutcome::Ready(PullRequestPlan {
        head: branch.clone(),
        base,
        remote,
        head_status,
        base_on_remote,
    }))
}

fn proceed(port: &mut dyn Interaction) -> Step {
    if confirm_or_stop(port, "Proceed with pull request creation?".to_string()) {
        Step::Proceed
    } else {
        Step::Interrupt
    }
}

/// Status against the tracking counterpart, or against the same-named branch
/// on `remote` when nothing is tracked yet.
fn head_status(
    session: &Session<'_>,
    branch: &BranchName,
    remote: &str,
) -> Result<SyncToRemoteStatus, EngineError> {
    let graph = session.backend();
    let sync = match graph.tracking_counterpart(branch)? {
        Some(_) => classify_remote(graph, branch)?,
        None => compare_with_counterpart(graph, branch, &RemoteBranch::new(remote, branch.clone()))?,
    };
    Ok(sync.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{layout, name};
    use crate::git::memory::{MemoryOperation, MemoryRepo, CLOCK_START};
    use crate::git::BranchActions;
    use crate::ui::prompts::ScriptedPrompt;

    const LAYOUT: &str = "master\n  develop\n";

    /// master and develop, both pushed to origin and tracked.
    fn published() -> MemoryRepo {
        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.commit("master", "m1").unwrap();
        repo.push(&name("master"), "origin", false).unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();
        repo.push(&name("develop"), "origin", false).unwrap();
        repo
    }

    fn prepare(repo: &MemoryRepo, definition: &str, answers: &[&str]) -> (Result<PullRequestOutcome, EngineError>, ScriptedPrompt) {
        let layout = layout(definition);
        let mut session = Session::new(repo);
        let mut port = ScriptedPrompt::new(answers.iter().copied());
        let outcome = prepare_pull_request(
            &mut session,
            &layout,
            &name("develop"),
            OriginPolicy::Assume,
            &mut port,
        );
        (outcome, port)
    }

    fn ready(outcome: Result<PullRequestOutcome, EngineError>) -> PullRequestPlan {
        match outcome.unwrap() {
            PullRequestOutcome::Ready(plan) => plan,
            other => panic!("expected a plan, got {other:?}"),
        }
    }

    #[test]
    fn in_sync_branch_needs_no_questions() {
        let repo = published();
        let (outcome, port) = prepare(&repo, LAYOUT, &[]);
        let plan = ready(outcome);
        assert_eq!(plan.base, name("master"));
        assert_eq!(plan.remote, "origin");
        assert_eq!(plan.head_status, SyncToRemoteStatus::InSync);
        assert!(plan.base_on_remote);
        assert!(port.transcript().is_empty());
        assert!(repo
            .operations()
            .contains(&MemoryOperation::Fetch { remote: "origin".into() }));
    }

    #[test]
    fn untracked_branch_is_pushed_first() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.commit("master", "m1").unwrap();
        repo.push(&name("master"), "origin", false).unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();

        let (outcome, port) = prepare(&repo, LAYOUT, &["y"]);
        assert_eq!(port.transcript(), ["Push untracked branch develop to origin? (y, Q)"]);
        assert_eq!(ready(outcome).head_status, SyncToRemoteStatus::InSync);

        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.commit("master", "m1").unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();
        let (outcome, _) = prepare(&repo, LAYOUT, &["q"]);
        assert_eq!(outcome.unwrap(), PullRequestOutcome::Interrupted);
    }

    #[test]
    fn ahead_branch_may_stay_unpushed() {
        let repo = published();
        repo.commit("develop", "d2").unwrap();
        let (outcome, port) = prepare(&repo, LAYOUT, &["n"]);
        assert_eq!(port.transcript(), ["Push develop to origin? (y, N, q)"]);
        assert_eq!(ready(outcome).head_status, SyncToRemoteStatus::AheadOfRemote);
    }

    #[test]
    fn behind_branch_warns_before_proceeding() {
        let repo = published();
        repo.commit_on_remote("origin", "develop", "r1").unwrap();
        let (outcome, port) = prepare(&repo, LAYOUT, &["y"]);
        assert_eq!(
            port.transcript(),
            [
                "Warn: Branch develop is behind its remote counterpart. Consider using git pull.",
                "Proceed with pull request creation? (y, Q)",
            ]
        );
        assert_eq!(ready(outcome).head_status, SyncToRemoteStatus::BehindRemote);
    }

    #[test]
    fn newer_divergence_offers_force_push() {
        let repo = published();
        repo.amend("develop", "Different commit message").unwrap();
        let (outcome, port) = prepare(&repo, LAYOUT, &["y"]);
        assert_eq!(
            port.transcript(),
            [
                "Branch develop diverged from (and has newer commits than) its remote counterpart origin/develop.",
                "Push develop with force-with-lease to origin? (y, N, q)",
            ]
        );
        assert_eq!(ready(outcome).head_status, SyncToRemoteStatus::InSync);
        assert!(repo.operations().contains(&MemoryOperation::Push {
            branch: name("develop"),
            remote: "origin".into(),
            force_with_lease: true,
        }));
    }

    #[test]
    fn older_divergence_can_be_abandoned() {
        let repo = published();
        repo.set_clock(CLOCK_START - 3600);
        repo.amend("develop", "amended in the past").unwrap();
        let (outcome, port) = prepare(&repo, LAYOUT, &["q"]);
        assert_eq!(
            port.transcript(),
            [
                "Warn: Branch develop is diverged from and older than its remote counterpart. \
                 Consider using git reset --keep.",
                "Proceed with pull request creation? (y, Q)",
            ]
        );
        assert_eq!(outcome.unwrap(), PullRequestOutcome::Interrupted);
    }

    #[test]
    fn missing_base_is_pushed() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin");
        repo.commit("master", "m1").unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();
        repo.push(&name("develop"), "origin", false).unwrap();

        let (outcome, port) = prepare(&repo, LAYOUT, &["y"]);
        assert_eq!(
            port.transcript(),
            [
                "Warn: Base branch for this PR (master) is not found on remote, pushing...",
                "Push untracked branch master to origin? (y, Q)",
            ]
        );
        assert!(ready(outcome).base_on_remote);
    }

    #[test]
    fn push_qualifier_suppresses_prompts() {
        let repo = published();
        repo.commit("develop", "d2").unwrap();
        let (outcome, port) = prepare(&repo, "master\n  develop push=no\n", &[]);
        assert!(port.transcript().is_empty());
        assert_eq!(ready(outcome).head_status, SyncToRemoteStatus::AheadOfRemote);
    }

    #[test]
    fn merged_or_root_branches_have_nothing_to_propose() {
        let repo = published();
        repo.merge("master", "develop").unwrap();
        let (outcome, _) = prepare(&repo, LAYOUT, &[]);
        assert!(matches!(outcome, Err(EngineError::NothingToPropose { .. })));

        let (outcome, _) = prepare(&repo, "develop\n  master\n", &[]);
        assert!(matches!(outcome, Err(EngineError::RootBranchHasNoParent { .. })));
    }

    #[test]
    fn no_remotes_is_an_error() {
        let repo = MemoryRepo::new();
        repo.commit("master", "m1").unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();
        let (outcome, _) = prepare(&repo, LAYOUT, &[]);
        assert!(matches!(outcome, Err(EngineError::NoRemotesConfigured { .. })));
    }

    #[test]
    fn ambiguous_remote_without_anyone_to_ask() {
        let repo = MemoryRepo::new();
        repo.add_remote("origin_1");
        repo.add_remote("origin_2");
        repo.commit("master", "m1").unwrap();
        repo.create_branch("develop", "master").unwrap();
        repo.commit("develop", "d1").unwrap();

        let layout = layout(LAYOUT);
        let mut session = Session::new(&repo);
        let mut port = ScriptedPrompt::unattended();
        let outcome = prepare_pull_request(
            &mut session,
            &layout,
            &name("develop"),
            OriginPolicy::Assume,
            &mut port,
        );
        assert!(matches!(
            outcome,
            Err(EngineError::AmbiguousRemote { ref remotes, .. }) if remotes.len() == 2
        ));
        assert!(repo.operations().is_empty());
    }
}
