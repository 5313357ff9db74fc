//! engine::traverse
//!
//! Walk the layout in pre-order and bring every branch in line with its
//! parent and its remote, one confirmed action at a time.
//!
//! # Per-branch state machine
//!
//! ```text
//! Pending ─► Evaluated ─┬─► Skipped
//!                       └─► ActionProposed ─┬─► Applied
//!                                           └─► Declined
//! ```
//!
//! A branch whose rebase failed ends `Failed` and every branch below it ends
//! `Skipped` naming the failed ancestor; siblings are still visited. Any
//! other per-branch error ends that branch `Failed` without touching its
//! subtree. Quitting leaves every unvisited branch `Pending`.

use std::collections::HashSet;

use super::parent_status::{evaluate_parent, SyncToParentStatus};
use super::remote::{resolve_remote, ResolvedBy};
use super::remote_status::{classify_remote, RemoteSync, SyncToRemoteStatus};
use super::session::Session;
use super::EngineError;
use crate::core::config::OriginPolicy;
use crate::core::layout::{BranchAttributes, Layout};
use crate::core::types::{BranchName, Oid, RemoteBranch};
use crate::git::RebaseOutcome;
use crate::ui::prompts::{Choice, Interaction, Prompt};

const PROPOSAL_TOKENS: [&str; 4] = ["y", "N", "q", "yq"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TraverseOptions {
    pub origin_policy: OriginPolicy,
    /// Fetch every remote before the walk
    pub fetch: bool,
}

/// A mutation the traversal can propose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SlideOut { parent: BranchName },
    Rebase { onto: BranchName, fork_point: Oid },
    Push { remote: String, force_with_lease: bool },
    AdoptTracking { counterpart: RemoteBranch },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::SlideOut { parent } => write!(f, "slide out (children move to {})", parent),
            Action::Rebase { onto, fork_point } => {
                write!(f, "rebase onto {} from {}", onto, fork_point.short(7))
            }
            Action::Push {
                remote,
                force_with_lease: true,
            } => write!(f, "force-with-lease push to {}", remote),
            Action::Push { remote, .. } => write!(f, "push to {}", remote),
            Action::AdoptTracking { counterpart } => write!(f, "track {}", counterpart),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Applied,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub action: Action,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitState {
    Pending,
    Evaluated,
    Skipped { failed_ancestor: BranchName },
    /// Quit while an action was on the table.
    ActionProposed,
    Applied,
    Declined,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOutcome {
    pub branch: BranchName,
    pub parent_status: Option<SyncToParentStatus>,
    pub remote_status: Option<SyncToRemoteStatus>,
    pub state: VisitState,
    pub actions: Vec<ActionRecord>,
}

impl BranchOutcome {
    fn pending(branch: &BranchName) -> Self {
        Self {
            branch: branch.clone(),
            parent_status: None,
            remote_status: None,
            state: VisitState::Pending,
            actions: Vec::new(),
        }
    }

    fn record(&mut self, action: Action, decision: Decision) {
        self.actions.push(ActionRecord { action, decision });
    }

    /// Final state from the recorded decisions.
    fn settle(&mut self) {
        let applied = self.actions.iter().any(|a| a.decision == Decision::Applied);
        let declined = self.actions.iter().any(|a| a.decision == Decision::Declined);
        self.state = if applied {
            VisitState::Applied
        } else if declined {
            VisitState::Declined
        } else {
            VisitState::Evaluated
        };
    }
}

/// Result of one traversal, outcomes in pre-order of the original layout.
#[derive(Debug, Clone, Default)]
pub struct TraversalReport {
    pub outcomes: Vec<BranchOutcome>,
    /// The operator quit before the walk finished
    pub aborted: bool,
    /// Remotes fetched before the walk
    pub fetched: Vec<String>,
}

impl TraversalReport {
    pub fn outcome(&self, branch: &BranchName) -> Option<&BranchOutcome> {
        self.outcomes.iter().find(|o| &o.branch == branch)
    }

    /// Branches removed from the layout; the definition needs rewriting.
    pub fn slid_out(&self) -> Vec<&BranchName> {
        self.outcomes
            .iter()
            .filter(|o| {
                o.actions.iter().any(|a| {
                    matches!(a.action, Action::SlideOut { .. }) && a.decision == Decision::Applied
                })
            })
            .map(|o| &o.branch)
            .collect()
    }
}

enum Answer {
    Yes,
    YesThenQuit,
    No,
    Quit,
}

fn ask(port: &mut dyn Interaction, message: String) -> Answer {
    match port.prompt_choice(&Prompt::tokens(message, &PROPOSAL_TOKENS)) {
        Choice::Token(t) if t == "y" => Answer::Yes,
        Choice::Token(t) if t == "yq" => Answer::YesThenQuit,
        Choice::Quit | Choice::Unanswered => Answer::Quit,
        _ => Answer::No,
    }
}

enum Flow {
    Continue,
    Quit,
    /// The rebase failed; nothing below this branch can be trusted.
    SubtreeFailed(EngineError),
}

struct Walker<'a, 'r> {
    session: &'a mut Session<'r>,
    port: &'a mut dyn Interaction,
    options: TraverseOptions,
}

/// Walk `layout` in pre-order, proposing and applying actions.
///
/// Slide-outs are applied to `layout`; persisting it is the caller's job.
pub fn traverse(
    session: &mut Session<'_>,
    layout: &mut Layout,
    options: TraverseOptions,
    port: &mut dyn Interaction,
) -> Result<TraversalReport, EngineError> {
    let order = layout.pre_order();
    let mut report = TraversalReport {
        outcomes: order.iter().map(BranchOutcome::pending).collect(),
        ..Default::default()
    };
    if options.fetch {
        report.fetched = session.fetch_all()?;
    }

    let mut walker = Walker {
        session,
        port,
        options,
    };
    let mut failed: HashSet<BranchName> = HashSet::new();

    for (outcome, branch) in report.outcomes.iter_mut().zip(&order) {
        let failed_ancestor = layout
            .ancestors(branch)
            .into_iter()
            .find(|a| failed.contains(a));
        if let Some(failed_ancestor) = failed_ancestor {
            tracing::warn!(%branch, %failed_ancestor, "skipping branch below failed rebase");
            outcome.state = VisitState::Skipped { failed_ancestor };
            continue;
        }

        match walker.visit(layout, branch, outcome) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => {
                report.aborted = true;
                break;
            }
            Ok(Flow::SubtreeFailed(err)) => {
                tracing::warn!(%branch, %err, "rebase failed; skipping subtree");
                outcome.state = VisitState::Failed {
                    reason: err.to_string(),
                };
                failed.insert(branch.clone());
            }
            Err(err) if err.is_quit() => {
                outcome.settle();
                if outcome.state != VisitState::Applied {
                    outcome.state = VisitState::ActionProposed;
                }
                report.aborted = true;
                break;
            }
            Err(err) => {
                tracing::warn!(%branch, %err, "branch failed");
                outcome.state = VisitState::Failed {
                    reason: err.to_string(),
                };
            }
        }
    }

    Ok(report)
}

impl Walker<'_, '_> {
    fn visit(
        &mut self,
        layout: &mut Layout,
        branch: &BranchName,
        outcome: &mut BranchOutcome,
    ) -> Result<Flow, EngineError> {
        outcome.state = VisitState::Evaluated;
        let attributes = layout.attributes(branch);

        if layout.parent(branch).is_some() {
            match self.against_parent(layout, branch, attributes, outcome)? {
                Flow::Continue => {}
                flow => return Ok(Self::finish(outcome, flow)),
            }
            if !layout.contains(branch) {
                // Slid out; its remote is no longer our business
                outcome.settle();
                return Ok(Flow::Continue);
            }
        }

        let flow = self.against_remote(branch, attributes, outcome)?;
        Ok(Self::finish(outcome, flow))
    }

    fn finish(outcome: &mut BranchOutcome, flow: Flow) -> Flow {
        match flow {
            Flow::SubtreeFailed(_) => {}
            Flow::Quit => {
                outcome.settle();
                if outcome.state != VisitState::Applied {
                    outcome.state = VisitState::ActionProposed;
                }
            }
            Flow::Continue => outcome.settle(),
        }
        flow
    }

    fn against_parent(
        &mut self,
        layout: &mut Layout,
        branch: &BranchName,
        attributes: BranchAttributes,
        outcome: &mut BranchOutcome,
    ) -> Result<Flow, EngineError> {
        let evaluation = evaluate_parent(self.session, layout, branch)?;
        outcome.parent_status = Some(evaluation.status);
        let parent = evaluation.parent;

        match evaluation.status {
            SyncToParentStatus::MergedIntoParent if attributes.slide_out => {
                let action = Action::SlideOut {
                    parent: parent.clone(),
                };
                let answer = ask(
                    self.port,
                    format!(
                        "Branch {branch} is merged into {parent}. \
                         Slide {branch} out of the tree of branch dependencies?"
                    ),
                );
                match answer {
                    Answer::Yes | Answer::YesThenQuit => {
                        layout
                            .slide_out(branch)
                            .map_err(|_| EngineError::BranchNotInLayout {
                                branch: branch.clone(),
                            })?;
                        self.session.invalidate(branch);
                        outcome.record(action, Decision::Applied);
                        Ok(quit_if(matches!(answer, Answer::YesThenQuit)))
                    }
                    Answer::No => {
                        outcome.record(action, Decision::Declined);
                        Ok(Flow::Continue)
                    }
                    Answer::Quit => Ok(Flow::Quit),
                }
            }
            SyncToParentStatus::OutOfSync | SyncToParentStatus::InSyncButForkPointOff
                if attributes.rebase =>
            {
                let fork_point = evaluation.fork_point;
                if fork_point.is_off() {
                    self.port.notify(&format!(
                        "Warn: fork point {} of {branch} differs from its merge-base {} with {parent}; \
                         the rebase may replay unexpected commits.",
                        fork_point.commit.short(7),
                        fork_point.merge_base.short(7),
                    ));
                }
                let action = Action::Rebase {
                    onto: parent.clone(),
                    fork_point: fork_point.commit.clone(),
                };
                let answer = ask(self.port, format!("Rebase {branch} onto {parent}?"));
                match answer {
                    Answer::Yes | Answer::YesThenQuit => {
                        let backend = self.session.backend();
                        let onto = backend.tip(&parent)?;
                        tracing::debug!(%branch, %parent, fork_point = fork_point.commit.short(7), "rebasing");
                        let result = backend.rebase_onto(branch, &onto, &fork_point.commit);
                        self.session.invalidate(branch);
                        match result {
                            Ok(RebaseOutcome::Completed { .. }) => {
                                outcome.record(action, Decision::Applied);
                                Ok(quit_if(matches!(answer, Answer::YesThenQuit)))
                            }
                            Ok(RebaseOutcome::Conflict { details }) => {
                                Ok(Flow::SubtreeFailed(EngineError::RebaseConflict {
                                    branch: branch.clone(),
                                    onto: parent,
                                    details,
                                }))
                            }
                            Err(err) => Ok(Flow::SubtreeFailed(err.into())),
                        }
                    }
                    Answer::No => {
                        outcome.record(action, Decision::Declined);
                        Ok(Flow::Continue)
                    }
                    Answer::Quit => Ok(Flow::Quit),
                }
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn against_remote(
        &mut self,
        branch: &BranchName,
        attributes: BranchAttributes,
        outcome: &mut BranchOutcome,
    ) -> Result<Flow, EngineError> {
        let sync = classify_remote(self.session.backend(), branch)?;
        outcome.remote_status = Some(sync.status);
        let counterpart = describe_counterpart(&sync, branch);

        match sync.status {
            SyncToRemoteStatus::Untracked if attributes.push => {
                let resolved = resolve_remote(
                    self.session,
                    branch,
                    self.options.origin_policy,
                    &mut *self.port,
                )?;
                if resolved.by == ResolvedBy::Adopted {
                    outcome.remote_status = Some(SyncToRemoteStatus::InSync);
                    outcome.record(
                        Action::AdoptTracking {
                            counterpart: RemoteBranch::new(resolved.remote, branch.clone()),
                        },
                        Decision::Applied,
                    );
                    return Ok(quit_if(resolved.quit_requested));
                }
                self.propose_push(
                    branch,
                    &resolved.remote,
                    false,
                    format!("Push untracked branch {branch} to {}?", resolved.remote),
                    outcome,
                )
            }
            SyncToRemoteStatus::AheadOfRemote if attributes.push => {
                let remote = remote_of(&sync, branch)?;
                self.propose_push(branch, &remote, false, format!("Push {branch} to {remote}?"), outcome)
            }
            SyncToRemoteStatus::DivergedFromAndNewerThanRemote if attributes.push => {
                let remote = remote_of(&sync, branch)?;
                self.port.notify(&format!(
                    "Branch {branch} diverged from (and has newer commits than) its remote counterpart {counterpart}."
                ));
                self.propose_push(
                    branch,
                    &remote,
                    true,
                    format!("Push {branch} with force-with-lease to {remote}?"),
                    outcome,
                )
            }
            SyncToRemoteStatus::BehindRemote => {
                self.port.notify(&format!(
                    "Branch {branch} is behind its remote counterpart {counterpart}. Consider using git pull."
                ));
                Ok(Flow::Continue)
            }
            SyncToRemoteStatus::DivergedFromAndOlderThanRemote => {
                self.port.notify(&format!(
                    "Branch {branch} diverged from (and is older than) its remote counterpart {counterpart}. \
                     Consider using git reset --keep."
                ));
                Ok(Flow::Continue)
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn propose_push(
        &mut self,
        branch: &BranchName,
        remote: &str,
        force_with_lease: bool,
        message: String,
        outcome: &mut BranchOutcome,
    ) -> Result<Flow, EngineError> {
        let action = Action::Push {
            remote: remote.to_string(),
            force_with_lease,
        };
        let answer = ask(self.port, message);
        match answer {
            Answer::Yes | Answer::YesThenQuit => {
                self.session
                    .backend()
                    .push(branch, remote, force_with_lease)?;
                self.session.invalidate(branch);
                outcome.record(action, Decision::Applied);
                Ok(quit_if(matches!(answer, Answer::YesThenQuit)))
            }
            Answer::No => {
                outcome.record(action, Decision::Declined);
                Ok(Flow::Continue)
            }
            Answer::Quit => Ok(Flow::Quit),
        }
    }
}

fn quit_if(quit: bool) -> Flow {
    if quit {
        Flow::Quit
    } else {
        Flow::Continue
    }
}

fn describe_counterpart(sync: &RemoteSync, branch: &BranchName) -> String {
    sync.counterpart
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| branch.to_string())
}

fn remote_of(sync: &RemoteSync, branch: &BranchName) -> Result<String, EngineError> {
    sync.counterpart
        .as_ref()
        .map(|c| c.remote.clone())
        .ok_or_else(|| EngineError::NoRemotesConfigured {
            branch: branch.clone(),
        })
}
