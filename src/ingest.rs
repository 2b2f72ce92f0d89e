use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::{detect_format, Format};
use crate::builder::{BuildReport, LeafFact, TreeBuilder};
use crate::error::CovtreeError;
use crate::facts::facts_from_coverage;

/// Read a coverage file, auto-detect its format (or use the override),
/// parse it and convert it to leaf facts.
pub fn ingest(file_path: &Path, format_override: Option<Format>) -> Result<(Format, Vec<LeafFact>)> {
    let content = std::fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    let format = match format_override {
        Some(format) => format,
        None => detect_format(file_path, &content).ok_or(CovtreeError::UnknownFormat)?,
    };

    let data = format
        .adapter()
        .parse(&content)
        .with_context(|| format!("Failed to parse {} as {format}", file_path.display()))?;
    let facts = facts_from_coverage(&data)?;
    debug!(
        path = %file_path.display(),
        %format,
        files = data.files.len(),
        facts = facts.len(),
        "ingested report"
    );
    Ok((format, facts))
}

/// Build one tree for `module_name` from several reports of the same
/// build. Facts are added in report order; overlapping facts are summed.
pub fn build_from_reports<P: AsRef<Path>>(
    module_name: &str,
    paths: &[P],
    format_override: Option<Format>,
) -> Result<BuildReport> {
    let mut builder = TreeBuilder::new(module_name);
    for path in paths {
        let (format, facts) = ingest(path.as_ref(), format_override)?;
        info!(path = %path.as_ref().display(), %format, "adding report");
        builder.extend(facts);
    }
    Ok(builder.finish())
}
