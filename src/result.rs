//! Coverage of one build: the tree plus the delta against a reference.
use std::collections::BTreeMap;

use crate::aggregate;
use crate::error::{CovtreeError, Result};
use crate::level::CoverageLevel;
use crate::node::CoverageNode;
use crate::ratio::Ratio;
use crate::split;

/// Signed percentage-point change per level.
pub type DeltaMap = BTreeMap<CoverageLevel, i64>;

/// Opaque handle to the build that produced a result. Never interpreted
/// here; it only travels along for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildRef(pub String);

impl std::fmt::Display for BuildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CoverageResult {
    root: CoverageNode,
    build: Option<BuildRef>,
    delta: Option<DeltaMap>,
}

impl CoverageResult {
    pub fn new(root: CoverageNode) -> Self {
        Self {
            root,
            build: None,
            delta: None,
        }
    }

    #[must_use]
    pub fn with_build(mut self, build: BuildRef) -> Self {
        self.build = Some(build);
        self
    }

    pub fn root(&self) -> &CoverageNode {
        &self.root
    }

    pub fn build(&self) -> Option<&BuildRef> {
        self.build.as_ref()
    }

    /// Name of the root node; every qualified name in the tree starts here.
    pub fn qualified_name(&self) -> &str {
        self.root.name()
    }

    /// The node with `qualified_name`, rooted at this result's module.
    pub fn find_by_name(&self, qualified_name: &str) -> Result<&CoverageNode> {
        self.root
            .find_by_name(qualified_name)
            .ok_or_else(|| CovtreeError::NodeNotFound(qualified_name.to_string()))
    }

    /// Whole-tree ratios for every measured level.
    pub fn statistics(&self) -> BTreeMap<CoverageLevel, Ratio> {
        aggregate::aggregate_all(&self.root)
    }

    /// Deltas against the reference build, if one was computed.
    pub fn delta_results(&self) -> Option<&DeltaMap> {
        self.delta.as_ref()
    }

    pub fn delta(&self, level: CoverageLevel) -> Option<i64> {
        self.delta.as_ref()?.get(&level).copied()
    }

    pub fn has_delta(&self, level: CoverageLevel) -> bool {
        self.delta(level).is_some()
    }

    pub(crate) fn set_delta(&mut self, delta: DeltaMap) {
        self.delta = Some(delta);
    }

    /// Nest dotted package names in place. Ratios are unchanged.
    pub fn split_packages(&mut self) {
        split::split_packages_in_place(&mut self.root);
    }

    pub fn into_root(self) -> CoverageNode {
        self.root
    }
}
