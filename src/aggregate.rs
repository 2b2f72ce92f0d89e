//! Rollup of leaf counts.
//!
//! `aggregate(N, L) = leaf_count(N, L) + sum(aggregate(child, L))`. The sum
//! is associative and commutative, so sibling order never changes a result.
//! Nothing is cached: trees are immutable once handed out, and a rollup is
//! a single linear walk.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::level::CoverageLevel;
use crate::node::CoverageNode;
use crate::ratio::Ratio;

/// Rolled-up ratio of `node` at `level`. Unset when neither the node nor
/// any descendant measured that level.
pub fn aggregate(node: &CoverageNode, level: CoverageLevel) -> Ratio {
    let below: Ratio = node.children().iter().map(|c| aggregate(c, level)).sum();
    node.leaf_count(level) + below
}

/// Rolled-up ratios for every level that is set somewhere in the subtree,
/// computed in one post-order pass.
pub fn aggregate_all(node: &CoverageNode) -> BTreeMap<CoverageLevel, Ratio> {
    let mut totals = rollup(node);
    totals.retain(|_, ratio| ratio.is_set());
    totals
}

fn rollup(node: &CoverageNode) -> BTreeMap<CoverageLevel, Ratio> {
    let mut totals = node.leaf_counts().clone();
    for child in node.children() {
        for (level, ratio) in rollup(child) {
            *totals.entry(level).or_default() += ratio;
        }
    }
    totals
}

/// One line of the overall statistics of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageStatistics {
    pub level: CoverageLevel,
    pub ratio: Ratio,
}

/// Statistics for every set level, finest level first.
pub fn overall_statistics(node: &CoverageNode) -> Vec<CoverageStatistics> {
    aggregate_all(node)
        .into_iter()
        .rev()
        .map(|(level, ratio)| CoverageStatistics { level, ratio })
        .collect()
}
