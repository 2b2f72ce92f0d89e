/// Adapter for the LCOV `.info` format.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Key records:
///   TN:<test name>
///   SF:<absolute path to source file>
///   FN:<line>,<function name>
///   FNDA:<execution count>,<function name>
///   DA:<line number>,<execution count>[,<checksum>]
///   BRDA:<line>,<block>,<branch>,<taken>   ("-" means 0)
///   LF/LH/FNF/FNH/BRF/BRH summary counts (ignored, derived from the data)
///   end_of_record
///
/// LCOV has no packages or classes, so files carry `package: None` and
/// functions carry `class: None`.
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Format, ReportAdapter};
use crate::model::*;

pub struct LcovAdapter;

impl ReportAdapter for LcovAdapter {
    fn format(&self) -> Format {
        Format::Lcov
    }

    fn can_parse(&self, path: &Path, content: &[u8]) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_lowercase();
            if ext == "info" || ext == "lcov" {
                return true;
            }
        }

        let head = super::sniff_head(content);
        let has_sf = head.lines().any(|l| l.starts_with("SF:"));
        let has_da_or_fn = head
            .lines()
            .any(|l| l.starts_with("DA:") || l.starts_with("FN:"));
        has_sf && has_da_or_fn
    }

    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse LCOV coverage data from raw bytes. A source file recorded more
/// than once (one record per test) is merged into a single entry.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = input;
    let mut data = CoverageData::new();
    let mut current: Option<FileCoverage> = None;

    // Branch index per line within the current record.
    let mut branch_indices: HashMap<u32, u32> = HashMap::new();
    // FN:<line>,<name> seen so far, for FNDA lookups.
    let mut fn_lines: HashMap<String, u32> = HashMap::new();

    let mut raw_line = String::new();
    loop {
        raw_line.clear();
        let n = reader
            .read_line(&mut raw_line)
            .context("Invalid UTF-8 in LCOV data")?;
        if n == 0 {
            break;
        }

        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "end_of_record" {
            if let Some(file) = current.take() {
                data.files.push(file);
            }
            branch_indices.clear();
            fn_lines.clear();
            continue;
        }

        let Some((tag, value)) = line.split_once(':') else {
            continue;
        };

        match tag {
            "SF" => {
                if let Some(file) = current.replace(FileCoverage::new(value.to_string())) {
                    data.files.push(file);
                }
                branch_indices.clear();
                fn_lines.clear();
            }
            "FN" => {
                if let Some((line_str, name)) = value.split_once(',') {
                    if let Ok(start_line) = line_str.parse::<u32>() {
                        fn_lines.insert(name.to_string(), start_line);
                    }
                }
            }
            "FNDA" => {
                if let (Some(file), Some((count_str, name))) =
                    (current.as_mut(), value.split_once(','))
                {
                    file.functions.push(FunctionCoverage {
                        name: name.to_string(),
                        class: None,
                        start_line: fn_lines.get(name).copied(),
                        hit_count: count_str.parse().unwrap_or(0),
                    });
                }
            }
            "DA" => {
                // Negative counts mark non-instrumentable lines.
                if let Some(file) = current.as_mut() {
                    let mut parts = value.splitn(3, ',');
                    let line_number = parts.next().and_then(|v| v.parse::<u32>().ok());
                    let count = parts.next().and_then(|v| v.parse::<i64>().ok());
                    if let (Some(line_number), Some(count)) = (line_number, count) {
                        if let Ok(hit_count) = u64::try_from(count) {
                            file.lines.push(LineCoverage {
                                line_number,
                                hit_count,
                            });
                        }
                    }
                }
            }
            "BRDA" => {
                if let Some(file) = current.as_mut() {
                    let parts: Vec<&str> = value.splitn(4, ',').collect();
                    if parts.len() == 4 {
                        if let Ok(line_number) = parts[0].parse::<u32>() {
                            let hit_count = if parts[3] == "-" {
                                0
                            } else {
                                parts[3].parse::<u64>().unwrap_or(0)
                            };
                            let idx = branch_indices.entry(line_number).or_insert(0);
                            file.branches.push(BranchCoverage {
                                line_number,
                                branch_index: *idx,
                                hit_count,
                            });
                            *idx += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Handle case where file ends without end_of_record
    if let Some(file) = current.take() {
        data.files.push(file);
    }

    Ok(data.coalesce())
}
