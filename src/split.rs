//! Nesting of flat package names.
//!
//! Adapters report packages as one node per dotted name (`com.example.util`).
//! The treemap wants one node per segment (`com` → `example` → `util`), with
//! sibling packages sharing their common prefix chain. Only the shape
//! changes: leaf counts move with their nodes, so every rollup is the same
//! before and after.
use crate::level::CoverageLevel;
use crate::node::CoverageNode;

pub const PACKAGE_SEPARATOR: char = '.';

/// Split every dotted package name below `root` into a chain of
/// single-segment packages and return the restructured tree.
#[must_use]
pub fn split_packages(mut root: CoverageNode) -> CoverageNode {
    split_packages_in_place(&mut root);
    root
}

/// In-place variant of [`split_packages`]. Idempotent.
pub fn split_packages_in_place(node: &mut CoverageNode) {
    for child in node.take_children() {
        if child.level() == CoverageLevel::Package {
            attach_split(node, child);
        } else {
            node.add_child(child);
        }
    }
    for child in node.children_mut() {
        split_packages_in_place(child);
    }
}

/// Re-home `package` under `parent` as a chain of one node per name
/// segment, reusing chain nodes that already exist.
fn attach_split(parent: &mut CoverageNode, package: CoverageNode) {
    let segments: Vec<String> = package
        .name()
        .split(PACKAGE_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if segments.len() <= 1 {
        parent.add_child(package);
        return;
    }

    let mut target = parent;
    for segment in &segments {
        target = target.child_or_insert(CoverageLevel::Package, segment);
    }

    let (leaf_counts, children) = package.into_parts();
    for (level, ratio) in leaf_counts {
        target.record(level, ratio);
    }
    for child in children {
        target.add_child(child);
    }
}
