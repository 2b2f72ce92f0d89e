/// Adapter for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage>
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="com.example">
///         <classes>
///           <class name="com.example.Foo" filename="com/example/Foo.java">
///             <methods>
///               <method name="..." signature="...">
///                 <lines><line number="..." hits="..." .../></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"
///                     condition-coverage="50% (1/2)" />
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use quick_xml::events::Event;
use regex::Regex;
use tracing::warn;

use super::{get_attr, Format, ReportAdapter, MAX_BRANCHES_PER_LINE};
use crate::model::*;

/// Pre-compiled regex for condition-coverage attributes like "75% (3/4)".
static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+)/(\d+)\)").expect("condition-coverage pattern is valid")
});

pub struct CoberturaAdapter;

impl ReportAdapter for CoberturaAdapter {
    fn format(&self) -> Format {
        Format::Cobertura
    }

    fn can_parse(&self, _path: &Path, content: &[u8]) -> bool {
        let head = super::sniff_head(content);
        super::looks_like_xml(&head) && head.contains("<coverage") && !head.contains("clover=")
    }

    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Per-class parse state.
#[derive(Default)]
struct ClassState {
    file: Option<FileCoverage>,
    name: Option<String>,
    /// line number -> index into `file.lines`
    line_index: HashMap<u32, usize>,
    /// lines whose branch arms were already recorded
    branch_lines: HashMap<u32, u32>,
}

#[derive(Default)]
struct MethodState {
    name: Option<String>,
    start_line: Option<u32>,
    hit: bool,
}

/// Parse Cobertura XML coverage data from raw bytes. Classes sharing a
/// source file are merged into one entry.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = super::xml_reader(input);
    let mut data = CoverageData::new();
    let mut buf = Vec::new();

    let mut package: Option<String> = None;
    let mut class = ClassState::default();
    let mut method: Option<MethodState> = None;

    // Source prefix from <source> elements
    let mut sources: Vec<String> = Vec::new();
    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(super::xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"source" => {
                    // A self-closing <source/> has no text and no End event.
                    if is_start_event {
                        in_source = true;
                    }
                }
                b"package" => {
                    package = get_attr(e, b"name").filter(|n| !n.is_empty());
                }
                b"class" => {
                    if let Some(filename) = get_attr(e, b"filename") {
                        let mut file = FileCoverage::new(resolve_source_path(&filename, &sources));
                        file.package = package.clone();
                        class = ClassState {
                            file: Some(file),
                            name: get_attr(e, b"name"),
                            ..ClassState::default()
                        };
                    }
                }
                b"method" => {
                    method = Some(MethodState {
                        name: get_attr(e, b"name"),
                        ..MethodState::default()
                    });
                }
                b"line" => {
                    let Some(line_number) =
                        get_attr(e, b"number").and_then(|n| n.parse::<u32>().ok())
                    else {
                        buf.clear();
                        continue;
                    };
                    let hit_count = super::get_count(e, b"hits");
                    let is_branch = get_attr(e, b"branch").is_some_and(|v| v == "true");
                    let condition = get_attr(e, b"condition-coverage");
                    record_line(&mut class, line_number, hit_count, is_branch, condition);

                    if let Some(method) = method.as_mut() {
                        method.start_line.get_or_insert(line_number);
                        method.hit |= hit_count > 0;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_source {
                    if let Ok(text) = e.unescape() {
                        sources.push(text.to_string());
                    }
                    in_source = false;
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"source" => in_source = false,
                b"package" => package = None,
                b"class" => {
                    if let Some(file) = class.file.take() {
                        data.files.push(file);
                    }
                }
                b"method" => {
                    if let Some(MethodState {
                        name: Some(name),
                        start_line,
                        hit,
                    }) = method.take()
                    {
                        if let Some(file) = class.file.as_mut() {
                            file.functions.push(FunctionCoverage {
                                name,
                                class: class.name.clone(),
                                start_line,
                                hit_count: u64::from(hit),
                            });
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    // Handle unclosed class
    if let Some(file) = class.file.take() {
        data.files.push(file);
    }

    let mut data = data.coalesce();
    for file in &mut data.files {
        file.lines.sort_by_key(|l| l.line_number);
    }
    Ok(data)
}

/// Lines may appear both under `<method><lines>` and `<class><lines>`; keep
/// the highest hit count per line and record branch arms only once.
fn record_line(
    class: &mut ClassState,
    line_number: u32,
    hit_count: u64,
    is_branch: bool,
    condition: Option<String>,
) {
    let Some(file) = class.file.as_mut() else {
        return;
    };

    match class.line_index.get(&line_number) {
        Some(&idx) => {
            let line = &mut file.lines[idx];
            line.hit_count = line.hit_count.max(hit_count);
        }
        None => {
            class.line_index.insert(line_number, file.lines.len());
            file.lines.push(LineCoverage {
                line_number,
                hit_count,
            });
        }
    }

    if !is_branch || class.branch_lines.contains_key(&line_number) {
        return;
    }
    let Some(caps) = condition.as_deref().and_then(|c| BRANCH_RE.captures(c)) else {
        return;
    };
    let covered: u32 = caps[1].parse().unwrap_or(0);
    let total: u32 = caps[2].parse().unwrap_or(0);
    if total > MAX_BRANCHES_PER_LINE || covered > total {
        warn!(
            line = line_number,
            condition = &caps[0],
            "ignoring implausible condition-coverage"
        );
        return;
    }
    // condition-coverage only says how many arms were taken, not how often.
    for branch_index in 0..total {
        file.branches.push(BranchCoverage {
            line_number,
            branch_index,
            hit_count: u64::from(branch_index < covered),
        });
    }
    class.branch_lines.insert(line_number, total);
}

/// Resolve a filename against the list of `<source>` prefixes.
///
/// - If the filename is already absolute, return it as-is.
/// - Otherwise, prepend the first non-empty source prefix.
/// - If no non-empty sources exist, return the filename unchanged.
fn resolve_source_path(filename: &str, sources: &[String]) -> String {
    if filename.starts_with('/') {
        return filename.to_string();
    }
    for source in sources {
        let base = source.trim_end_matches('/');
        if !base.is_empty() {
            return format!("{}/{}", base, filename);
        }
    }
    filename.to_string()
}
