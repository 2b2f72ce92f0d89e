//! Command handler functions for the covtree CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::ValueEnum;
use tracing::warn;

use crate::adapters::Format;
use crate::builder::BuildReport;
use crate::chart::{to_chart_tree, ChartConfig};
use crate::delta::{compute_delta, diff_trees};
use crate::ingest::build_from_reports;
use crate::level::CoverageLevel;
use crate::report::{
    DeltaReport, MarkdownFormatter, ReportFormatter, SummaryReport, TextFormatter,
};
use crate::result::CoverageResult;
use crate::table::{FileTable, TableConfig};

/// Output style for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
    Json,
}

/// Where a build's coverage comes from: one or more reports of one module.
#[derive(Debug, Clone)]
pub struct Input {
    pub module: String,
    pub reports: Vec<PathBuf>,
    pub format: Option<Format>,
}

impl Input {
    fn build(&self) -> Result<CoverageResult> {
        if self.reports.is_empty() {
            bail!("No coverage reports given");
        }
        let BuildReport { result, errors } =
            build_from_reports(&self.module, &self.reports, self.format)?;
        if !errors.is_empty() {
            warn!(
                module = %self.module,
                skipped = errors.len(),
                "some coverage facts were malformed and skipped"
            );
        }
        Ok(result)
    }
}

fn formatter(style: Style) -> &'static dyn ReportFormatter {
    match style {
        Style::Markdown => &MarkdownFormatter,
        Style::Text | Style::Json => &TextFormatter,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn cmd_summary(input: &Input, style: Style) -> Result<String> {
    let result = input.build()?;
    let report = SummaryReport::from_result(&result);
    match style {
        Style::Json => to_json(&report),
        _ => Ok(formatter(style).summary(&report)),
    }
}

pub fn cmd_files(
    input: &Input,
    config: &TableConfig,
    sort_by: Option<CoverageLevel>,
    style: Style,
) -> Result<String> {
    let result = input.build()?;
    let mut table = FileTable::from_tree(result.root(), config);
    if let Some(level) = sort_by {
        if !config.columns.contains(&level) {
            bail!("Cannot sort by '{level}': not one of the table columns");
        }
        table.sort_by_coverage(level);
    }
    match style {
        Style::Json => to_json(&table),
        _ => Ok(formatter(style).files(&table)),
    }
}

/// Treemap of the build as JSON. Packages are nested unless `flat`.
pub fn cmd_tree(input: &Input, config: &ChartConfig, flat: bool) -> Result<String> {
    let mut result = input.build()?;
    if !flat {
        result.split_packages();
    }
    to_json(&to_chart_tree(result.root(), config))
}

/// Compare `candidate` against `reference`, listing nodes of `level` that
/// lost coverage of `metric`.
pub fn cmd_delta(
    candidate: &Input,
    reference: &Input,
    metric: CoverageLevel,
    level: CoverageLevel,
    style: Style,
) -> Result<String> {
    let mut candidate = candidate.build()?;
    let reference = reference.build()?;
    compute_delta(&mut candidate, &reference);

    let report = DeltaReport {
        summary: SummaryReport::from_result(&candidate),
        diff: diff_trees(candidate.root(), reference.root(), metric),
        level,
    };
    match style {
        Style::Json => to_json(&report),
        _ => Ok(formatter(style).delta(&report)),
    }
}
