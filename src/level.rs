//! Granularity of a node in the coverage hierarchy.
//!
//! Variants are declared outermost first, so the derived `Ord` sorts
//! `Module < Package < File < ... < Conditional`.
use serde::{Deserialize, Serialize};

use crate::error::CovtreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    Module,
    Package,
    File,
    Class,
    Method,
    Line,
    Conditional,
}

impl CoverageLevel {
    /// Every level, outermost first.
    pub const ALL: [CoverageLevel; 7] = [
        CoverageLevel::Module,
        CoverageLevel::Package,
        CoverageLevel::File,
        CoverageLevel::Class,
        CoverageLevel::Method,
        CoverageLevel::Line,
        CoverageLevel::Conditional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageLevel::Module => "module",
            CoverageLevel::Package => "package",
            CoverageLevel::File => "file",
            CoverageLevel::Class => "class",
            CoverageLevel::Method => "method",
            CoverageLevel::Line => "line",
            CoverageLevel::Conditional => "conditional",
        }
    }

    /// Human-readable label used in tables and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            CoverageLevel::Module => "Module",
            CoverageLevel::Package => "Package",
            CoverageLevel::File => "File",
            CoverageLevel::Class => "Class",
            CoverageLevel::Method => "Method",
            CoverageLevel::Line => "Line",
            CoverageLevel::Conditional => "Branch",
        }
    }

    /// Structural levels can own children; `Line` and `Conditional` are
    /// measurement-only.
    pub fn is_structural(&self) -> bool {
        !matches!(self, CoverageLevel::Line | CoverageLevel::Conditional)
    }
}

impl std::str::FromStr for CoverageLevel {
    type Err = CovtreeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "module" => Ok(CoverageLevel::Module),
            "package" => Ok(CoverageLevel::Package),
            "file" => Ok(CoverageLevel::File),
            "class" => Ok(CoverageLevel::Class),
            "method" => Ok(CoverageLevel::Method),
            "line" => Ok(CoverageLevel::Line),
            "conditional" | "branch" => Ok(CoverageLevel::Conditional),
            _ => Err(CovtreeError::Parse(format!(
                "Unknown coverage level: '{}'. Supported: module, package, file, class, method, line, conditional",
                s
            ))),
        }
    }
}

impl std::fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
