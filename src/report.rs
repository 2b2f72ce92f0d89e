//! Output formatting for summaries, file tables and deltas.

use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{overall_statistics, CoverageStatistics};
use crate::delta::TreeDiff;
use crate::level::CoverageLevel;
use crate::ratio::Ratio;
use crate::result::{CoverageResult, DeltaMap};
use crate::table::FileTable;

/// Whole-tree statistics of one build, with its delta if one was computed.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub module: String,
    /// Finest level first.
    pub statistics: Vec<CoverageStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaMap>,
}

impl SummaryReport {
    pub fn from_result(result: &CoverageResult) -> Self {
        Self {
            module: result.qualified_name().to_string(),
            statistics: overall_statistics(result.root()),
            delta: result.delta_results().cloned(),
        }
    }

    fn delta(&self, level: CoverageLevel) -> Option<i64> {
        self.delta.as_ref()?.get(&level).copied()
    }
}

/// A candidate build compared with its reference.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaReport {
    pub summary: SummaryReport,
    pub diff: TreeDiff,
    /// Level whose nodes are listed as regressions.
    pub level: CoverageLevel,
}

/// Trait for formatting reports.
pub trait ReportFormatter {
    fn summary(&self, report: &SummaryReport) -> String;
    fn files(&self, table: &FileTable) -> String;
    fn delta(&self, report: &DeltaReport) -> String;
}

/// `+25`, `-3`, `0`.
pub fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

fn format_percentage(ratio: Ratio) -> String {
    match ratio.percentage_points() {
        Some(pct) => format!("{pct:.1}%"),
        None => "n/a".to_string(),
    }
}

/// Plain text formatter.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn summary(&self, report: &SummaryReport) -> String {
        let mut out = String::new();
        writeln!(out, "{:<12}{}", "Module:", report.module).unwrap();
        if report.statistics.is_empty() {
            out.push_str("No coverage data.\n");
            return out;
        }
        for stat in &report.statistics {
            let label = format!("{}:", stat.level.label());
            write!(out, "{label:<12}{}", stat.ratio).unwrap();
            if let Some(delta) = report.delta(stat.level) {
                write!(out, "  {}", format_delta(delta)).unwrap();
            }
            out.push('\n');
        }
        out
    }

    fn files(&self, table: &FileTable) -> String {
        let mut out = String::new();
        write!(out, "{:<30} {:<30}", "PACKAGE", "FILE").unwrap();
        for column in &table.columns {
            write!(out, " {:>8}", column.label().to_uppercase()).unwrap();
        }
        out.push('\n');
        writeln!(out, "{}", "-".repeat(61 + 9 * table.columns.len())).unwrap();

        for row in &table.rows {
            write!(out, "{:<30} {:<30}", row.package_name, row.file_name).unwrap();
            for coverage in &row.coverages {
                write!(out, " {:>8}", format_percentage(*coverage)).unwrap();
            }
            out.push('\n');
        }
        out
    }

    fn delta(&self, report: &DeltaReport) -> String {
        let mut out = String::new();
        match &report.summary.delta {
            Some(delta) if !delta.is_empty() => {
                writeln!(out, "Coverage change for '{}':", report.summary.module).unwrap();
                for (level, value) in delta.iter().rev() {
                    let label = format!("{}:", level.label());
                    writeln!(out, "  {label:<12}{}", format_delta(*value)).unwrap();
                }
            }
            _ => out.push_str("No comparable coverage in the reference build.\n"),
        }

        let regressions = report.diff.regressions(report.level);
        if !regressions.is_empty() {
            out.push('\n');
            writeln!(out, "Regressions ({}):", report.level).unwrap();
            for node in regressions {
                writeln!(
                    out,
                    "  {}  {} -> {}  {}",
                    node.qualified_name,
                    format_percentage(node.reference),
                    format_percentage(node.candidate),
                    node.delta.map(format_delta).unwrap_or_default(),
                )
                .unwrap();
            }
        }

        for (title, names) in [("Added", &report.diff.added), ("Removed", &report.diff.removed)] {
            if names.is_empty() {
                continue;
            }
            out.push('\n');
            writeln!(out, "{title}:").unwrap();
            for name in names {
                writeln!(out, "  {name}").unwrap();
            }
        }
        out
    }
}

/// Markdown formatter.
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn summary(&self, report: &SummaryReport) -> String {
        let mut md = String::new();
        writeln!(md, "### Coverage: `{}`\n", report.module).unwrap();
        if report.statistics.is_empty() {
            md.push_str("No coverage data.\n");
            return md;
        }
        let with_delta = report.delta.is_some();
        md.push_str("| Metric | Covered | Total | Rate |");
        if with_delta {
            md.push_str(" Δ |");
        }
        md.push('\n');
        md.push_str("|:-------|--------:|------:|-----:|");
        if with_delta {
            md.push_str("---:|");
        }
        md.push('\n');
        for stat in &report.statistics {
            write!(
                md,
                "| {} | {} | {} | {} |",
                stat.level.label(),
                stat.ratio.covered(),
                stat.ratio.total(),
                format_percentage(stat.ratio),
            )
            .unwrap();
            if with_delta {
                let delta = report.delta(stat.level).map(format_delta);
                write!(md, " {} |", delta.as_deref().unwrap_or("n/a")).unwrap();
            }
            md.push('\n');
        }
        md
    }

    fn files(&self, table: &FileTable) -> String {
        let mut md = String::new();
        md.push_str("| Package | File |");
        for column in &table.columns {
            write!(md, " {} |", column.label()).unwrap();
        }
        md.push_str("\n|:--------|:-----|");
        for _ in &table.columns {
            md.push_str("-----:|");
        }
        md.push('\n');
        for row in &table.rows {
            write!(md, "| `{}` | `{}` |", row.package_name, row.file_name).unwrap();
            for coverage in &row.coverages {
                write!(md, " {} |", format_percentage(*coverage)).unwrap();
            }
            md.push('\n');
        }
        md
    }

    fn delta(&self, report: &DeltaReport) -> String {
        let mut md = String::new();
        md.push_str(&self.summary(&report.summary));

        let regressions = report.diff.regressions(report.level);
        if regressions.is_empty() {
            md.push_str("\nNo regressions.\n");
        } else {
            md.push_str("\n| Node | Before | After | Δ |\n");
            md.push_str("|:-----|-------:|------:|--:|\n");
            for node in regressions {
                writeln!(
                    md,
                    "| `{}` | {} | {} | {} |",
                    node.qualified_name,
                    format_percentage(node.reference),
                    format_percentage(node.candidate),
                    node.delta.map(format_delta).unwrap_or_default(),
                )
                .unwrap();
            }
        }

        for (title, names) in [("Added", &report.diff.added), ("Removed", &report.diff.removed)] {
            if names.is_empty() {
                continue;
            }
            writeln!(md, "\n<details>\n<summary>{title} ({})</summary>\n", names.len()).unwrap();
            for name in names {
                writeln!(md, "- `{name}`").unwrap();
            }
            md.push_str("\n</details>\n");
        }
        md
    }
}
