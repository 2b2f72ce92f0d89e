//! Treemap projection of a coverage tree.
use serde::Serialize;

use crate::aggregate::aggregate;
use crate::level::CoverageLevel;
use crate::node::CoverageNode;

/// Which metric sizes the treemap and how deep it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartConfig {
    pub metric: CoverageLevel,
    /// Nodes at this level are emitted without children.
    pub leaf_level: CoverageLevel,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            metric: CoverageLevel::Line,
            leaf_level: CoverageLevel::File,
        }
    }
}

/// One node of the treemap. Owns all of its data; nothing points back into
/// the coverage tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartNode {
    pub name: String,
    pub level: CoverageLevel,
    /// `[covered, total]` of the configured metric.
    pub value: [u64; 2],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChartNode>,
}

impl ChartNode {
    pub fn covered(&self) -> u64 {
        self.value[0]
    }

    pub fn total(&self) -> u64 {
        self.value[1]
    }
}

/// Project `node` into a treemap. Children without any measurement of the
/// metric have no area and are left out; the root is always emitted.
pub fn to_chart_tree(node: &CoverageNode, config: &ChartConfig) -> ChartNode {
    let ratio = aggregate(node, config.metric);
    let children = if node.level() >= config.leaf_level {
        Vec::new()
    } else {
        node.children()
            .iter()
            .filter(|c| aggregate(c, config.metric).is_set())
            .map(|c| to_chart_tree(c, config))
            .collect()
    };
    ChartNode {
        name: node.name().to_string(),
        level: node.level(),
        value: [ratio.covered(), ratio.total()],
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratio::Ratio;
    use crate::split::split_packages;

    fn tree() -> CoverageNode {
        let mut root = CoverageNode::new(CoverageLevel::Module, "m");
        let package = root.child_or_insert(CoverageLevel::Package, "a.b");
        let file = package.child_or_insert(CoverageLevel::File, "F.java");
        file.record(CoverageLevel::Line, Ratio::new(3, 4).unwrap());
        file.record(CoverageLevel::Conditional, Ratio::new(1, 2).unwrap());
        file.child_or_insert(CoverageLevel::Class, "a.b.F")
            .record(CoverageLevel::Method, Ratio::single(true));
        let empty = package.child_or_insert(CoverageLevel::File, "Empty.java");
        empty.record(CoverageLevel::Conditional, Ratio::new(0, 2).unwrap());
        root
    }

    #[test]
    fn test_chart_follows_split_tree() {
        let root = split_packages(tree());
        let chart = to_chart_tree(&root, &ChartConfig::default());

        assert_eq!(chart.name, "m");
        assert_eq!(chart.value, [3, 4]);
        let a = &chart.children[0];
        assert_eq!(a.name, "a");
        let b = &a.children[0];
        assert_eq!(b.name, "b");
        // Empty.java has no lines, so no area on a line treemap.
        assert_eq!(b.children.len(), 1);
        let file = &b.children[0];
        assert_eq!(file.name, "F.java");
        // Stops at file level.
        assert!(file.children.is_empty());
    }

    #[test]
    fn test_chart_metric_is_configurable() {
        let config = ChartConfig {
            metric: CoverageLevel::Conditional,
            ..ChartConfig::default()
        };
        let chart = to_chart_tree(&tree(), &config);
        assert_eq!(chart.covered(), 1);
        assert_eq!(chart.total(), 4);
        assert_eq!(chart.children[0].children.len(), 2);
    }

    #[test]
    fn test_chart_does_not_modify_tree() {
        let root = tree();
        let copy = root.clone();
        let _ = to_chart_tree(&root, &ChartConfig::default());
        assert_eq!(root, copy);
    }

    #[test]
    fn test_chart_serializes_without_empty_children() {
        let mut root = CoverageNode::new(CoverageLevel::Module, "m");
        root.record(CoverageLevel::Line, Ratio::new(1, 2).unwrap());
        let json = serde_json::to_string(&to_chart_tree(&root, &ChartConfig::default())).unwrap();
        assert_eq!(json, r#"{"name":"m","level":"module","value":[1,2]}"#);
    }
}
