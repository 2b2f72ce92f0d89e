//! Construction of the canonical tree from leaf facts.
//!
//! Each fact names a path below the module root (e.g. package, then file)
//! and a ratio measured at one level. Intermediate nodes are created on
//! demand; facts landing on the same node and level are summed, so two
//! adapters reporting the same file contribute additively.
use tracing::{debug, warn};

use crate::error::{CovtreeError, Result};
use crate::level::CoverageLevel;
use crate::node::{CoverageNode, QUALIFIED_NAME_SEPARATOR};
use crate::ratio::Ratio;
use crate::result::CoverageResult;

/// One step of a leaf fact's path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub level: CoverageLevel,
    pub name: String,
}

impl Segment {
    pub fn new(level: CoverageLevel, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::new(CoverageLevel::Module, name)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(CoverageLevel::Package, name)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(CoverageLevel::File, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(CoverageLevel::Class, name)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(CoverageLevel::Method, name)
    }
}

/// A ratio measured at `level`, attributed to the node at the end of `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafFact {
    pub path: Vec<Segment>,
    pub level: CoverageLevel,
    pub ratio: Ratio,
}

impl LeafFact {
    pub fn new(path: Vec<Segment>, level: CoverageLevel, ratio: Ratio) -> Self {
        Self { path, level, ratio }
    }

    /// The path as a `/`-joined string, for diagnostics.
    pub fn display_path(&self) -> String {
        self.path
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(&QUALIFIED_NAME_SEPARATOR.to_string())
    }

    fn malformed(&self, reason: impl Into<String>) -> CovtreeError {
        CovtreeError::MalformedPath {
            path: self.display_path(),
            reason: reason.into(),
        }
    }

    /// Check the path shape: non-empty, named segments, structural levels
    /// that never get coarser, ending at a file or finer, with the measured
    /// level no coarser than the node it is attached to.
    pub fn validate(&self) -> Result<()> {
        let last = match self.path.last() {
            Some(last) => last,
            None => return Err(self.malformed("empty path")),
        };

        let mut previous = CoverageLevel::Module;
        for segment in &self.path {
            if segment.name.trim().is_empty() {
                return Err(self.malformed(format!("empty {} name", segment.level)));
            }
            if !segment.level.is_structural() {
                return Err(self.malformed(format!(
                    "{} cannot be a path segment",
                    segment.level
                )));
            }
            if segment.level < previous {
                return Err(self.malformed(format!(
                    "{} '{}' below a {}",
                    segment.level, segment.name, previous
                )));
            }
            previous = segment.level;
        }

        if last.level < CoverageLevel::File {
            return Err(self.malformed(format!(
                "path ends at {} level, expected file or finer",
                last.level
            )));
        }
        if self.level < last.level {
            return Err(self.malformed(format!(
                "{} count attributed to a {} node",
                self.level, last.level
            )));
        }
        Ok(())
    }
}

/// Outcome of a build: the tree plus every fact that was rejected.
#[derive(Debug)]
pub struct BuildReport {
    pub result: CoverageResult,
    pub errors: Vec<CovtreeError>,
}

/// Single-writer tree construction.
#[derive(Debug)]
pub struct TreeBuilder {
    root: CoverageNode,
    errors: Vec<CovtreeError>,
    accepted: usize,
}

impl TreeBuilder {
    /// Start a tree whose root is the module `module_name`.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            root: CoverageNode::new(CoverageLevel::Module, module_name),
            errors: Vec::new(),
            accepted: 0,
        }
    }

    /// Insert one fact, or return why it was rejected. The tree is left
    /// untouched on error.
    pub fn insert(&mut self, fact: &LeafFact) -> Result<()> {
        fact.validate()?;
        let mut node = &mut self.root;
        for segment in &fact.path {
            node = node.child_or_insert(segment.level, &segment.name);
        }
        node.record(fact.level, fact.ratio);
        self.accepted += 1;
        Ok(())
    }

    /// Insert a fact, logging and keeping the error instead of failing.
    pub fn add(&mut self, fact: LeafFact) {
        if let Err(e) = self.insert(&fact) {
            warn!(error = %e, "skipping leaf fact");
            self.errors.push(e);
        }
    }

    pub fn extend<I>(&mut self, facts: I)
    where
        I: IntoIterator<Item = LeafFact>,
    {
        for fact in facts {
            self.add(fact);
        }
    }

    pub fn finish(self) -> BuildReport {
        debug!(
            module = self.root.name(),
            accepted = self.accepted,
            rejected = self.errors.len(),
            "built coverage tree"
        );
        BuildReport {
            result: CoverageResult::new(self.root),
            errors: self.errors,
        }
    }
}

/// Build a tree for `module_name` from `facts`. Malformed facts are skipped
/// and reported in [`BuildReport::errors`]; they never abort the build.
pub fn build_tree<I>(module_name: &str, facts: I) -> BuildReport
where
    I: IntoIterator<Item = LeafFact>,
{
    let mut builder = TreeBuilder::new(module_name);
    builder.extend(facts);
    builder.finish()
}
