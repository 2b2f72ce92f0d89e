#![allow(dead_code)]

use std::path::{Path, PathBuf};

use covtree::builder::{build_tree, LeafFact, Segment};
use covtree::level::CoverageLevel;
use covtree::ratio::Ratio;
use covtree::result::CoverageResult;

pub fn ratio(covered: u64, total: u64) -> Ratio {
    Ratio::new(covered, total).unwrap()
}

/// A fact measured on `package/file`.
pub fn file_fact(package: &str, file: &str, level: CoverageLevel, covered: u64, total: u64) -> LeafFact {
    LeafFact::new(
        vec![Segment::package(package), Segment::file(file)],
        level,
        ratio(covered, total),
    )
}

pub fn build(module: &str, facts: Vec<LeafFact>) -> CoverageResult {
    let report = build_tree(module, facts);
    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
    report.result
}

/// Write `content` to `dir/name` and return the path.
pub fn write_report(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
