//! Property-based tests for the layout and fork-point ranking.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use branchwise::core::layout::{BranchAttributes, Layout};
use branchwise::core::types::{BranchName, Oid, RefName};
use branchwise::engine::{rank_candidates, Candidate};

/// Strategy for generating valid branch name characters.
fn branch_name_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('/'),
    ]
}

/// Strategy for generating valid branch names.
fn valid_branch_name() -> impl Strategy<Value = String> {
    prop::collection::vec(branch_name_char(), 1..40).prop_filter_map(
        "must be valid branch name",
        |chars| {
            let name: String = chars.into_iter().collect();
            let bad_component = name
                .split('/')
                .any(|c| c.is_empty() || c.starts_with('-'));
            if bad_component {
                None
            } else {
                Some(name)
            }
        },
    )
}

/// A forest as (optional parent index, attributes) per node; a parent index
/// always points at an earlier node.
fn forest_strategy() -> impl Strategy<Value = Vec<(Option<prop::sample::Index>, (bool, bool, bool))>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.8, any::<prop::sample::Index>()),
            (any::<bool>(), any::<bool>(), any::<bool>()),
        ),
        1..24,
    )
}

fn build_layout(nodes: &[(Option<prop::sample::Index>, (bool, bool, bool))]) -> Layout {
    let mut layout = Layout::new();
    for (i, (parent, (push, rebase, slide_out))) in nodes.iter().enumerate() {
        let name = BranchName::new(format!("b{i}")).unwrap();
        match parent {
            Some(index) if i > 0 => {
                let parent = BranchName::new(format!("b{}", index.index(i))).unwrap();
                layout.add_child(&parent, name.clone()).unwrap();
            }
            _ => layout.add_root(name.clone()).unwrap(),
        }
        let attributes = BranchAttributes {
            push: *push,
            rebase: *rebase,
            slide_out: *slide_out,
        };
        layout.set_attributes(&name, attributes).unwrap();
    }
    layout
}

fn candidate(commit: u64, seconds: i64, evidence: u8) -> Candidate {
    Candidate {
        commit: Oid::synthetic(commit),
        // One distance per commit, as in a real graph
        distance: (commit % 4) as usize,
        timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap(),
        evidence: BranchName::new(format!("e{evidence}")).unwrap(),
    }
}

fn candidates_strategy() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0u64..8, 0i64..6, 0u8..3), 0..30).prop_map(|raw| {
        raw.into_iter()
            .map(|(commit, seconds, evidence)| candidate(commit, seconds, evidence))
            .collect()
    })
}

proptest! {
    /// Any valid branch name maps to a refs/heads ref.
    #[test]
    fn branch_name_to_refname(name in valid_branch_name()) {
        let branch = BranchName::new(&name).unwrap();
        let refname = RefName::for_branch(&branch);
        prop_assert_eq!(refname.as_str(), format!("refs/heads/{name}"));
    }

    /// Rendering and re-parsing yields the same forest.
    #[test]
    fn layout_render_parse_roundtrip(nodes in forest_strategy(), tabs in any::<bool>()) {
        let layout = build_layout(&nodes);
        let indent = if tabs { "\t" } else { "  " };
        let parsed = Layout::parse(&layout.render(indent)).unwrap();
        prop_assert_eq!(parsed, layout);
    }

    /// Pre-order visits every branch once, parents before children.
    #[test]
    fn pre_order_puts_parents_first(nodes in forest_strategy()) {
        let layout = build_layout(&nodes);
        let order = layout.pre_order();
        prop_assert_eq!(order.len(), layout.len());
        for (position, branch) in order.iter().enumerate() {
            if let Some(parent) = layout.parent(branch) {
                let parent_position = order.iter().position(|b| b == parent).unwrap();
                prop_assert!(parent_position < position);
            }
        }
    }

    /// Sliding a branch out keeps every other branch and their relative order.
    #[test]
    fn slide_out_keeps_the_rest(nodes in forest_strategy(), pick in any::<prop::sample::Index>()) {
        let mut layout = build_layout(&nodes);
        let before = layout.pre_order();
        let non_roots: Vec<BranchName> = before
            .iter()
            .filter(|b| layout.parent(b).is_some())
            .cloned()
            .collect();
        prop_assume!(!non_roots.is_empty());
        let victim = non_roots[pick.index(non_roots.len())].clone();
        let parent = layout.parent(&victim).cloned().unwrap();
        let children = layout.children(&victim).to_vec();

        layout.slide_out(&victim).unwrap();

        let expected: Vec<BranchName> = before.into_iter().filter(|b| b != &victim).collect();
        prop_assert_eq!(layout.pre_order(), expected);
        for child in children {
            prop_assert_eq!(layout.parent(&child), Some(&parent));
        }
    }

    /// Ranking yields one candidate per commit, ordered by distance, then
    /// recency, then commit id.
    #[test]
    fn ranking_is_ordered_and_deduplicated(candidates in candidates_strategy()) {
        let ranked = rank_candidates(candidates.clone());

        let mut commits: Vec<&Oid> = ranked.iter().map(|c| &c.commit).collect();
        commits.sort();
        commits.dedup();
        prop_assert_eq!(commits.len(), ranked.len());

        for pair in ranked.windows(2) {
            let key = |c: &Candidate| (c.distance, std::cmp::Reverse(c.timestamp), c.commit.clone());
            prop_assert!(key(&pair[0]) < key(&pair[1]));
        }
        for kept in &ranked {
            let newest = candidates
                .iter()
                .filter(|c| c.commit == kept.commit)
                .map(|c| c.timestamp)
                .max()
                .unwrap();
            prop_assert_eq!(kept.timestamp, newest);
        }
    }

    /// Input order does not matter.
    #[test]
    fn ranking_ignores_input_order(candidates in candidates_strategy()) {
        let mut reversed = candidates.clone();
        reversed.reverse();
        prop_assert_eq!(rank_candidates(candidates), rank_candidates(reversed));
    }
}
