//! Flat per-file projection of a coverage tree.
use serde::Serialize;

use crate::aggregate::aggregate;
use crate::level::CoverageLevel;
use crate::node::{qualified_name, CoverageNode, NodeId};
use crate::ratio::Ratio;
use crate::split::PACKAGE_SEPARATOR;

/// Which metrics become table columns, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub columns: Vec<CoverageLevel>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            columns: vec![CoverageLevel::Line, CoverageLevel::Conditional],
        }
    }
}

/// One row per file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    /// Link target for drill-down, see [`crate::route`].
    pub id: NodeId,
    pub package_name: String,
    pub file_name: String,
    pub qualified_name: String,
    /// One entry per configured column, in column order.
    pub coverages: Vec<Ratio>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTable {
    pub columns: Vec<CoverageLevel>,
    pub rows: Vec<FileRow>,
}

impl FileTable {
    /// Enumerate every file below `root`. The package name is built from
    /// the package ancestors, so flat and split trees give the same name.
    pub fn from_tree(root: &CoverageNode, config: &TableConfig) -> Self {
        let mut rows = Vec::new();
        root.visit(&mut |ancestors, node| {
            if node.level() != CoverageLevel::File {
                return;
            }
            let package_name = ancestors
                .iter()
                .filter(|a| a.level() == CoverageLevel::Package)
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(&PACKAGE_SEPARATOR.to_string());
            rows.push(FileRow {
                id: node.id_under(ancestors),
                package_name,
                file_name: node.name().to_string(),
                qualified_name: qualified_name(ancestors, node),
                coverages: config
                    .columns
                    .iter()
                    .map(|level| aggregate(node, *level))
                    .collect(),
            });
        });
        Self {
            columns: config.columns.clone(),
            rows,
        }
    }

    /// Coverage of `level` in `row`, if `level` is one of the columns.
    pub fn coverage(&self, row: &FileRow, level: CoverageLevel) -> Option<Ratio> {
        let idx = self.columns.iter().position(|c| *c == level)?;
        row.coverages.get(idx).copied()
    }

    /// Sort rows ascending by coverage of `level` (worst first). Rows where
    /// the level is not measured go last.
    pub fn sort_by_coverage(&mut self, level: CoverageLevel) {
        let Some(idx) = self.columns.iter().position(|c| *c == level) else {
            return;
        };
        self.rows.sort_by(|a, b| {
            let a = a.coverages[idx].covered_percentage().unwrap_or(f64::INFINITY);
            let b = b.coverages[idx].covered_percentage().unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });
    }
}
