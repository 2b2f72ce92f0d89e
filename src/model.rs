//! Uniform in-memory representation of one parsed report, independent of
//! the format it came from. Adapters produce a `CoverageData`, which
//! [`crate::facts`] turns into leaf facts for the tree builder.
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::ratio::Ratio;

/// A single line that was instrumentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCoverage {
    pub line_number: u32,
    pub hit_count: u64,
}

/// A single branch arm on a given line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCoverage {
    pub line_number: u32,
    pub branch_index: u32,
    pub hit_count: u64,
}

/// A function/method that was instrumentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCoverage {
    pub name: String,
    /// Owning class, for formats that report one.
    pub class: Option<String>,
    pub start_line: Option<u32>,
    pub hit_count: u64,
}

/// Coverage data for a single source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCoverage {
    pub path: String,
    /// Package as reported by the format, dotted. `None` when the format
    /// has no notion of packages.
    pub package: Option<String>,
    pub lines: Vec<LineCoverage>,
    pub branches: Vec<BranchCoverage>,
    pub functions: Vec<FunctionCoverage>,
}

impl FileCoverage {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub fn line_ratio(&self) -> Result<Ratio> {
        let covered = self.lines.iter().filter(|l| l.hit_count > 0).count();
        Ratio::new(covered as u64, self.lines.len() as u64)
    }

    pub fn branch_ratio(&self) -> Result<Ratio> {
        let covered = self.branches.iter().filter(|b| b.hit_count > 0).count();
        Ratio::new(covered as u64, self.branches.len() as u64)
    }

    /// Fold another report of the same file into this one. Lines, branch
    /// arms and functions seen in both keep the higher hit count, so a file
    /// reported once per test is counted once.
    fn absorb(&mut self, other: FileCoverage) {
        let mut lines: BTreeMap<u32, u64> = self
            .lines
            .iter()
            .map(|l| (l.line_number, l.hit_count))
            .collect();
        for line in other.lines {
            let hits = lines.entry(line.line_number).or_insert(0);
            *hits = (*hits).max(line.hit_count);
        }
        self.lines = lines
            .into_iter()
            .map(|(line_number, hit_count)| LineCoverage {
                line_number,
                hit_count,
            })
            .collect();

        let mut branches: BTreeMap<(u32, u32), u64> = self
            .branches
            .iter()
            .map(|b| ((b.line_number, b.branch_index), b.hit_count))
            .collect();
        for branch in other.branches {
            let hits = branches
                .entry((branch.line_number, branch.branch_index))
                .or_insert(0);
            *hits = (*hits).max(branch.hit_count);
        }
        self.branches = branches
            .into_iter()
            .map(|((line_number, branch_index), hit_count)| BranchCoverage {
                line_number,
                branch_index,
                hit_count,
            })
            .collect();

        for function in other.functions {
            let existing = self
                .functions
                .iter_mut()
                .find(|f| f.name == function.name && f.class == function.class);
            match existing {
                Some(known) => {
                    known.hit_count = known.hit_count.max(function.hit_count);
                    if known.start_line.is_none() {
                        known.start_line = function.start_line;
                    }
                }
                None => self.functions.push(function),
            }
        }
        if self.package.is_none() {
            self.package = other.package;
        }
    }
}

/// The complete result of parsing a single coverage file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageData {
    pub files: Vec<FileCoverage>,
}

impl CoverageData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge entries that describe the same path. Formats like Cobertura
    /// emit one entry per class, so a file with inner classes shows up
    /// several times within a single report.
    #[must_use]
    pub fn coalesce(self) -> Self {
        let mut files: Vec<FileCoverage> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in self.files {
            match index.get(&file.path) {
                Some(&idx) => files[idx].absorb(file),
                None => {
                    index.insert(file.path.clone(), files.len());
                    files.push(file);
                }
            }
        }
        Self { files }
    }
}
