//! The canonical coverage tree.
//!
//! Every node exclusively owns its children; there are no parent pointers.
//! Anything that needs ancestry (qualified names, package names for the
//! file table) gets it from [`CoverageNode::visit`], which hands the
//! ancestor chain to the callback.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::level::CoverageLevel;
use crate::ratio::Ratio;

/// Separator between names in a qualified name.
pub const QUALIFIED_NAME_SEPARATOR: char = '/';

/// Stable identifier of a node, derived from its qualified name. Used by
/// drill-down links, which must survive rebuilding the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn of(qualified_name: &str) -> Self {
        let hash = blake3::hash(qualified_name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        NodeId(u64::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(NodeId)
    }
}

/// Join the names of `ancestors` followed by `node` into a qualified name.
#[must_use]
pub fn qualified_name(ancestors: &[&CoverageNode], node: &CoverageNode) -> String {
    let mut name = String::new();
    for ancestor in ancestors {
        name.push_str(&ancestor.name);
        name.push(QUALIFIED_NAME_SEPARATOR);
    }
    name.push_str(&node.name);
    name
}

/// One entity of the coverage hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageNode {
    level: CoverageLevel,
    name: String,
    children: Vec<CoverageNode>,
    leaf_counts: BTreeMap<CoverageLevel, Ratio>,
}

impl CoverageNode {
    pub fn new(level: CoverageLevel, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            children: Vec::new(),
            leaf_counts: BTreeMap::new(),
        }
    }

    pub fn level(&self) -> CoverageLevel {
        self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[CoverageNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Counts measured directly at this node.
    pub fn leaf_counts(&self) -> &BTreeMap<CoverageLevel, Ratio> {
        &self.leaf_counts
    }

    /// The count measured directly at this node for `level`, unset if none.
    pub fn leaf_count(&self, level: CoverageLevel) -> Ratio {
        self.leaf_counts.get(&level).copied().unwrap_or(Ratio::UNSET)
    }

    /// Add a directly measured count. Repeated records for the same level
    /// are summed.
    pub fn record(&mut self, level: CoverageLevel, ratio: Ratio) {
        *self.leaf_counts.entry(level).or_default() += ratio;
    }

    /// Attach `child`. A child with the same level and name as an existing
    /// one is merged into it, so children stay a set.
    ///
    /// # Panics
    ///
    /// When `child` is coarser than this node (e.g. a package below a file);
    /// that is a bug in the caller, not a runtime condition.
    pub fn add_child(&mut self, child: CoverageNode) {
        assert!(
            child.level >= self.level,
            "cannot attach {} node '{}' below {} node '{}'",
            child.level,
            child.name,
            self.level,
            self.name
        );
        match self.child_index(child.level, &child.name) {
            Some(idx) => self.children[idx].merge(child),
            None => self.children.push(child),
        }
    }

    pub fn child(&self, level: CoverageLevel, name: &str) -> Option<&CoverageNode> {
        self.child_index(level, name).map(|idx| &self.children[idx])
    }

    pub fn child_mut(&mut self, level: CoverageLevel, name: &str) -> Option<&mut CoverageNode> {
        self.child_index(level, name)
            .map(move |idx| &mut self.children[idx])
    }

    /// Return the child with this level and name, creating it if absent.
    pub(crate) fn child_or_insert(&mut self, level: CoverageLevel, name: &str) -> &mut CoverageNode {
        let idx = match self.child_index(level, name) {
            Some(idx) => idx,
            None => {
                self.add_child(CoverageNode::new(level, name));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    fn child_index(&self, level: CoverageLevel, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.level == level && c.name == name)
    }

    /// Fold `other` (same level and name) into this node: leaf counts are
    /// combined and children merged recursively.
    pub(crate) fn merge(&mut self, other: CoverageNode) {
        debug_assert_eq!(self.level, other.level);
        for (level, ratio) in other.leaf_counts {
            self.record(level, ratio);
        }
        for child in other.children {
            self.add_child(child);
        }
    }

    pub(crate) fn take_children(&mut self) -> Vec<CoverageNode> {
        std::mem::take(&mut self.children)
    }

    pub(crate) fn children_mut(&mut self) -> &mut [CoverageNode] {
        &mut self.children
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<CoverageLevel, Ratio>, Vec<CoverageNode>) {
        (self.leaf_counts, self.children)
    }

    /// Rolled-up ratio for `level`; see [`aggregate::aggregate`].
    pub fn aggregate(&self, level: CoverageLevel) -> Ratio {
        aggregate::aggregate(self, level)
    }

    /// Visit this node and every descendant in pre-order. The callback gets
    /// the chain of ancestors (outermost first, excluding the node itself).
    pub fn visit<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&[&'a CoverageNode], &'a CoverageNode),
    {
        let mut ancestors = Vec::new();
        self.visit_inner(&mut ancestors, f);
    }

    fn visit_inner<'a, F>(&'a self, ancestors: &mut Vec<&'a CoverageNode>, f: &mut F)
    where
        F: FnMut(&[&'a CoverageNode], &'a CoverageNode),
    {
        f(ancestors, self);
        ancestors.push(self);
        for child in &self.children {
            child.visit_inner(ancestors, f);
        }
        ancestors.pop();
    }

    /// All nodes of `level` at or below this node, in pre-order.
    pub fn all_of_level(&self, level: CoverageLevel) -> Vec<&CoverageNode> {
        let mut nodes = Vec::new();
        self.visit(&mut |_, node| {
            if node.level == level {
                nodes.push(node);
            }
        });
        nodes
    }

    /// Look up a node by level and [`NodeId`]. Ids are computed from
    /// qualified names rooted at `self`.
    pub fn find(&self, level: CoverageLevel, id: NodeId) -> Option<&CoverageNode> {
        let mut found = None;
        self.visit(&mut |ancestors, node| {
            if found.is_none() && node.level == level && node.id_under(ancestors) == id {
                found = Some(node);
            }
        });
        found
    }

    /// Look up a descendant by qualified name (including this node's name).
    ///
    /// Names are not unique across levels (a class may share its name with
    /// one of its methods); the first child in insertion order wins at each
    /// step. Use [`CoverageNode::find_named`] to pin the level.
    pub fn find_by_name(&self, qualified: &str) -> Option<&CoverageNode> {
        let mut parts = qualified.split(QUALIFIED_NAME_SEPARATOR);
        if parts.next() != Some(self.name.as_str()) {
            return None;
        }
        let mut current = self;
        for part in parts {
            current = current.children.iter().find(|c| c.name == part)?;
        }
        Some(current)
    }

    /// Look up the node of `level` at `qualified`, trying every child whose
    /// name matches a segment.
    pub fn find_named(&self, level: CoverageLevel, qualified: &str) -> Option<&CoverageNode> {
        let mut parts = qualified.split(QUALIFIED_NAME_SEPARATOR);
        if parts.next() != Some(self.name.as_str()) {
            return None;
        }
        let rest: Vec<&str> = parts.collect();
        self.descend(level, &rest)
    }

    fn descend(&self, level: CoverageLevel, parts: &[&str]) -> Option<&CoverageNode> {
        match parts.split_first() {
            None => (self.level == level).then_some(self),
            Some((head, tail)) => self
                .children
                .iter()
                .filter(|c| c.name == *head && c.level <= level)
                .find_map(|c| c.descend(level, tail)),
        }
    }

    /// The id this node has when `ancestors` is its chain from the root.
    pub fn id_under(&self, ancestors: &[&CoverageNode]) -> NodeId {
        NodeId::of(&qualified_name(ancestors, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CoverageNode {
        let mut root = CoverageNode::new(CoverageLevel::Module, "app");
        let package = root.child_or_insert(CoverageLevel::Package, "com.example");
        let file = package.child_or_insert(CoverageLevel::File, "Foo.java");
        file.record(CoverageLevel::Line, Ratio::new(3, 4).unwrap());
        let file = package.child_or_insert(CoverageLevel::File, "Bar.java");
        file.record(CoverageLevel::Line, Ratio::new(1, 2).unwrap());
        root
    }

    #[test]
    fn test_record_sums_repeated_counts() {
        let mut node = CoverageNode::new(CoverageLevel::File, "a.rs");
        node.record(CoverageLevel::Line, Ratio::new(1, 2).unwrap());
        node.record(CoverageLevel::Line, Ratio::new(2, 3).unwrap());
        assert_eq!(node.leaf_count(CoverageLevel::Line), Ratio::new(3, 5).unwrap());
        assert_eq!(node.leaf_count(CoverageLevel::Conditional), Ratio::UNSET);
    }

    #[test]
    fn test_add_child_merges_same_name() {
        let mut package = CoverageNode::new(CoverageLevel::Package, "p");
        let mut first = CoverageNode::new(CoverageLevel::File, "a.rs");
        first.record(CoverageLevel::Line, Ratio::new(1, 1).unwrap());
        let mut second = CoverageNode::new(CoverageLevel::File, "a.rs");
        second.record(CoverageLevel::Line, Ratio::new(0, 1).unwrap());

        package.add_child(first);
        package.add_child(second);

        assert_eq!(package.children().len(), 1);
        assert_eq!(
            package.children()[0].leaf_count(CoverageLevel::Line),
            Ratio::new(1, 2).unwrap()
        );
    }

    #[test]
    fn test_same_name_different_level_are_distinct() {
        let mut file = CoverageNode::new(CoverageLevel::File, "Foo.java");
        file.add_child(CoverageNode::new(CoverageLevel::Class, "Foo"));
        file.add_child(CoverageNode::new(CoverageLevel::Method, "Foo"));
        assert_eq!(file.children().len(), 2);
    }

    #[test]
    #[should_panic(expected = "cannot attach")]
    fn test_add_coarser_child_panics() {
        let mut file = CoverageNode::new(CoverageLevel::File, "a.rs");
        file.add_child(CoverageNode::new(CoverageLevel::Package, "p"));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let root = sample();
        let package = &root.children()[0];
        let names: Vec<&str> = package.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["Foo.java", "Bar.java"]);
    }

    #[test]
    fn test_all_of_level() {
        let root = sample();
        let files = root.all_of_level(CoverageLevel::File);
        assert_eq!(files.len(), 2);
        assert!(root.all_of_level(CoverageLevel::Method).is_empty());
        assert_eq!(root.all_of_level(CoverageLevel::Module).len(), 1);
    }

    #[test]
    fn test_find_by_id() {
        let root = sample();
        let id = NodeId::of("app/com.example/Bar.java");
        let found = root.find(CoverageLevel::File, id).unwrap();
        assert_eq!(found.name(), "Bar.java");

        // Right id, wrong level.
        assert!(root.find(CoverageLevel::Package, id).is_none());
        assert!(root
            .find(CoverageLevel::File, NodeId::of("app/com.example/Baz.java"))
            .is_none());
    }

    #[test]
    fn test_find_by_name() {
        let root = sample();
        let found = root.find_by_name("app/com.example/Foo.java").unwrap();
        assert_eq!(found.level(), CoverageLevel::File);
        assert_eq!(root.find_by_name("app").unwrap().name(), "app");
        assert!(root.find_by_name("other/com.example").is_none());
        assert!(root.find_by_name("app/missing").is_none());
    }

    #[test]
    fn test_find_named_tells_class_from_method() {
        let mut root = CoverageNode::new(CoverageLevel::Module, "app");
        let file = root.child_or_insert(CoverageLevel::File, "main.py");
        let method = file.child_or_insert(CoverageLevel::Method, "run");
        method.record(CoverageLevel::Method, Ratio::new(0, 1).unwrap());
        let class = file.child_or_insert(CoverageLevel::Class, "run");
        class
            .child_or_insert(CoverageLevel::Method, "go")
            .record(CoverageLevel::Method, Ratio::new(1, 1).unwrap());

        // Plain lookup takes the first "run", which has no children.
        assert_eq!(
            root.find_by_name("app/main.py/run").unwrap().level(),
            CoverageLevel::Method
        );
        assert!(root.find_by_name("app/main.py/run/go").is_none());

        let class = root.find_named(CoverageLevel::Class, "app/main.py/run").unwrap();
        assert_eq!(class.level(), CoverageLevel::Class);
        let method = root.find_named(CoverageLevel::Method, "app/main.py/run/go").unwrap();
        assert_eq!(method.name(), "go");
        assert_eq!(
            root.find_named(CoverageLevel::Method, "app/main.py/run")
                .unwrap()
                .leaf_count(CoverageLevel::Method),
            Ratio::new(0, 1).unwrap()
        );
        assert!(root.find_named(CoverageLevel::Package, "app/main.py").is_none());
    }

    #[test]
    fn test_visit_passes_ancestors() {
        let root = sample();
        let mut names = Vec::new();
        root.visit(&mut |ancestors, node| names.push(qualified_name(ancestors, node)));
        assert_eq!(
            names,
            [
                "app",
                "app/com.example",
                "app/com.example/Foo.java",
                "app/com.example/Bar.java"
            ]
        );
    }

    #[test]
    fn test_node_id_display_round_trips() {
        let id = NodeId::of("app/com.example");
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 16);
    }
}
