//! Change in coverage between a reference build and a candidate build.
//!
//! The two trees are built independently and share no nodes, so they are
//! matched by name: the root of one always matches the root of the other,
//! and below the root a node matches the node with the same chain of
//! `(level, name)` pairs. Deltas are signed percentage points rounded to
//! the nearest integer (`50% -> 100%` is `50`).
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{aggregate, aggregate_all};
use crate::level::CoverageLevel;
use crate::node::{qualified_name, CoverageNode};
use crate::ratio::Ratio;
use crate::result::{CoverageResult, DeltaMap};

/// `candidate - reference` in rounded percentage points, or `None` when
/// either side was not measured.
#[must_use]
pub fn percentage_delta(candidate: Ratio, reference: Ratio) -> Option<i64> {
    let candidate = candidate.percentage_points()?;
    let reference = reference.percentage_points()?;
    Some((candidate - reference).round() as i64)
}

/// Whole-tree delta for every level measured in both trees. Does not touch
/// either tree.
pub fn delta_between(candidate: &CoverageNode, reference: &CoverageNode) -> DeltaMap {
    let reference_totals = aggregate_all(reference);
    aggregate_all(candidate)
        .into_iter()
        .filter_map(|(level, ratio)| {
            let delta = percentage_delta(ratio, *reference_totals.get(&level)?)?;
            Some((level, delta))
        })
        .collect()
}

/// Compute the delta of `candidate` against `reference` and record it on
/// the candidate. The reference is never annotated.
///
/// A reference without any comparable level yields an empty map, so
/// `has_delta` is false everywhere; this never fails.
pub fn compute_delta(candidate: &mut CoverageResult, reference: &CoverageResult) -> DeltaMap {
    let delta = delta_between(candidate.root(), reference.root());
    if delta.is_empty() {
        warn!(
            candidate = candidate.qualified_name(),
            reference = reference.qualified_name(),
            "reference build has no comparable coverage"
        );
    } else {
        debug!(
            candidate = candidate.qualified_name(),
            reference = reference.qualified_name(),
            levels = delta.len(),
            "computed coverage delta"
        );
    }
    if candidate.delta_results().is_some() {
        debug!(
            candidate = candidate.qualified_name(),
            "replacing previously recorded delta"
        );
    }
    candidate.set_delta(delta.clone());
    delta
}

/// Coverage of one node present in both trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDelta {
    /// Qualified name in the candidate tree.
    pub qualified_name: String,
    pub level: CoverageLevel,
    pub candidate: Ratio,
    pub reference: Ratio,
    pub delta: Option<i64>,
}

/// Node-by-node comparison of two trees for one metric.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeDiff {
    pub metric: Option<CoverageLevel>,
    /// Matched nodes where the metric is measured on at least one side.
    pub matched: Vec<NodeDelta>,
    /// Outermost candidate nodes with no counterpart in the reference.
    pub added: Vec<String>,
    /// Outermost reference nodes with no counterpart in the candidate.
    pub removed: Vec<String>,
}

impl TreeDiff {
    /// Matched nodes of `level` whose coverage dropped, worst first.
    pub fn regressions(&self, level: CoverageLevel) -> Vec<&NodeDelta> {
        let mut worse: Vec<&NodeDelta> = self
            .matched
            .iter()
            .filter(|d| d.level == level && d.delta.is_some_and(|v| v < 0))
            .collect();
        worse.sort_by_key(|d| d.delta);
        worse
    }
}

type MatchKey = Vec<(CoverageLevel, String)>;

/// Key of `node` relative to the root: the `(level, name)` chain below it.
fn match_key(ancestors: &[&CoverageNode], node: &CoverageNode) -> Option<MatchKey> {
    let (_, below_root) = ancestors.split_first()?;
    let mut key: MatchKey = below_root
        .iter()
        .map(|a| (a.level(), a.name().to_string()))
        .collect();
    key.push((node.level(), node.name().to_string()));
    Some(key)
}

fn index(root: &CoverageNode) -> HashMap<MatchKey, &CoverageNode> {
    let mut nodes = HashMap::new();
    root.visit(&mut |ancestors, node| {
        if let Some(key) = match_key(ancestors, node) {
            nodes.insert(key, node);
        }
    });
    nodes
}

/// Nodes of `root` whose key is absent from `other`, skipping those whose
/// parent is already unmatched.
fn unmatched(root: &CoverageNode, other: &HashMap<MatchKey, &CoverageNode>) -> Vec<String> {
    let mut missing: HashSet<MatchKey> = HashSet::new();
    let mut names = Vec::new();
    root.visit(&mut |ancestors, node| {
        let Some(key) = match_key(ancestors, node) else {
            return;
        };
        if other.contains_key(&key) {
            return;
        }
        let parent_missing = missing.contains(&key[..key.len() - 1]);
        if !parent_missing {
            names.push(qualified_name(ancestors, node));
        }
        missing.insert(key);
    });
    names
}

/// Match the nodes of two trees by name and compare them on `metric`.
pub fn diff_trees(
    candidate: &CoverageNode,
    reference: &CoverageNode,
    metric: CoverageLevel,
) -> TreeDiff {
    let candidate_index = index(candidate);
    let reference_index = index(reference);

    let mut matched = Vec::new();
    let root_candidate = aggregate(candidate, metric);
    let root_reference = aggregate(reference, metric);
    if root_candidate.is_set() || root_reference.is_set() {
        matched.push(NodeDelta {
            qualified_name: candidate.name().to_string(),
            level: candidate.level(),
            candidate: root_candidate,
            reference: root_reference,
            delta: percentage_delta(root_candidate, root_reference),
        });
    }

    candidate.visit(&mut |ancestors, node| {
        let Some(key) = match_key(ancestors, node) else {
            return;
        };
        let Some(other) = reference_index.get(&key) else {
            return;
        };
        let candidate_ratio = aggregate(node, metric);
        let reference_ratio = aggregate(other, metric);
        if candidate_ratio.is_set() || reference_ratio.is_set() {
            matched.push(NodeDelta {
                qualified_name: qualified_name(ancestors, node),
                level: node.level(),
                candidate: candidate_ratio,
                reference: reference_ratio,
                delta: percentage_delta(candidate_ratio, reference_ratio),
            });
        }
    });

    TreeDiff {
        metric: Some(metric),
        matched,
        added: unmatched(candidate, &reference_index),
        removed: unmatched(reference, &candidate_index),
    }
}
