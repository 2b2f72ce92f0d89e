/// Adapter for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <package name="com/example">
///       <class name="com/example/Foo" sourcefilename="Foo.java">
///         <method name="doStuff" desc="()V" line="10">
///           <counter type="METHOD" missed="0" covered="1"/>
///         </method>
///       </class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///       </sourcefile>
///     </package>
///   </report>
///
/// Line data lives inside `<sourcefile>`, method data inside `<class>`.
/// A line counts as hit when any of its instructions were covered. Package
/// and class names use `/` in the report and are converted to dots.
use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use quick_xml::events::Event;
use tracing::warn;

use super::{get_attr, get_count, Format, ReportAdapter, MAX_BRANCHES_PER_LINE};
use crate::model::*;

pub struct JacocoAdapter;

impl ReportAdapter for JacocoAdapter {
    fn format(&self) -> Format {
        Format::Jacoco
    }

    fn can_parse(&self, _path: &Path, content: &[u8]) -> bool {
        let head = super::sniff_head(content);
        super::looks_like_xml(&head)
            && head.contains("<report")
            && (head.contains("jacoco") || head.contains("JACOCO") || head.contains("<package"))
    }

    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

fn dotted(name: &str) -> String {
    name.replace('/', ".")
}

/// Parse JaCoCo XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = super::xml_reader(input);
    let mut data = CoverageData::new();
    let mut buf = Vec::new();

    // Raw (slash-separated) package name, used to build the file path.
    let mut package: Option<String> = None;
    let mut sourcefile: Option<FileCoverage> = None;

    // Methods seen in <class> elements, keyed by the source file they
    // belong to, attached when the matching <sourcefile> is read.
    let mut class_methods: HashMap<String, Vec<FunctionCoverage>> = HashMap::new();
    let mut class: Option<(String, Option<String>)> = None;
    let mut method: Option<FunctionCoverage> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(super::xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"package" => {
                    package = get_attr(e, b"name").filter(|n| !n.is_empty());
                    class_methods.clear();
                }
                b"class" if is_start_event => {
                    class = get_attr(e, b"name")
                        .map(|name| (dotted(&name), get_attr(e, b"sourcefilename")));
                }
                b"method" => {
                    if let Some(name) = get_attr(e, b"name") {
                        let function = FunctionCoverage {
                            name,
                            class: class.as_ref().map(|(name, _)| name.clone()),
                            start_line: get_attr(e, b"line").and_then(|v| v.parse().ok()),
                            hit_count: 0,
                        };
                        if is_start_event {
                            method = Some(function);
                        }
                    }
                }
                b"counter" => {
                    if let Some(function) = method.as_mut() {
                        if get_attr(e, b"type").is_some_and(|t| t == "METHOD") {
                            function.hit_count = u64::from(get_count(e, b"covered") > 0);
                        }
                    }
                }
                b"sourcefile" => {
                    if let Some(name) = get_attr(e, b"name") {
                        let path = match &package {
                            Some(pkg) => format!("{}/{}", pkg, name),
                            None => name.clone(),
                        };
                        let mut file = FileCoverage::new(path);
                        file.package = package.as_deref().map(dotted);
                        file.functions = class_methods.remove(&name).unwrap_or_default();
                        sourcefile = Some(file);
                    }
                }
                b"line" => {
                    if let Some(file) = sourcefile.as_mut() {
                        record_line(file, e);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"package" => package = None,
                b"class" => class = None,
                b"method" => {
                    if let Some(function) = method.take() {
                        let source = class.as_ref().and_then(|(_, source)| source.clone());
                        if let Some(source) = source {
                            class_methods.entry(source).or_default().push(function);
                        }
                    }
                }
                b"sourcefile" => {
                    if let Some(mut file) = sourcefile.take() {
                        file.lines.sort_by_key(|l| l.line_number);
                        data.files.push(file);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    // Handle unclosed sourcefile
    if let Some(mut file) = sourcefile.take() {
        file.lines.sort_by_key(|l| l.line_number);
        data.files.push(file);
    }

    Ok(data)
}

fn record_line(file: &mut FileCoverage, e: &quick_xml::events::BytesStart) {
    let Some(line_number) = get_attr(e, b"nr").and_then(|v| v.parse::<u32>().ok()) else {
        return;
    };
    let ci = get_count(e, b"ci");
    let mi = get_count(e, b"mi");
    let cb = get_count(e, b"cb");
    let mb = get_count(e, b"mb");

    // Lines without instructions (comments, blanks) are not instrumentable.
    if ci > 0 || mi > 0 {
        file.lines.push(LineCoverage {
            line_number,
            hit_count: ci,
        });
    }

    let total = u32::try_from(cb.saturating_add(mb))
        .ok()
        .filter(|total| *total <= MAX_BRANCHES_PER_LINE);
    let (Some(total), Ok(covered)) = (total, u32::try_from(cb)) else {
        warn!(line = line_number, cb, mb, "ignoring implausible branch counters");
        return;
    };
    for branch_index in 0..total {
        file.branches.push(BranchCoverage {
            line_number,
            branch_index,
            hit_count: u64::from(branch_index < covered),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jacoco() {
        let input = include_bytes!("../../tests/fixtures/sample_jacoco.xml");
        let data = parse(input).unwrap();

        assert_eq!(data.files.len(), 2);

        let foo = &data.files[0];
        assert_eq!(foo.path, "com/example/Foo.java");
        assert_eq!(foo.package.as_deref(), Some("com.example"));
        assert_eq!(foo.lines.len(), 5);
        assert_eq!(foo.lines[0].line_number, 3);
        assert_eq!(foo.lines[0].hit_count, 3); // ci=3
        assert_eq!(foo.lines[3].line_number, 12);
        assert_eq!(foo.lines[3].hit_count, 0); // ci=0, mi=2

        // Branch on line 11: cb=1, mb=1
        assert_eq!(foo.branches.len(), 2);
        assert_eq!(foo.branches[0].line_number, 11);
        assert_eq!(foo.branches[0].hit_count, 1);
        assert_eq!(foo.branches[1].hit_count, 0);

        assert_eq!(foo.functions.len(), 2);
        assert_eq!(foo.functions[0].name, "<init>");
        assert_eq!(foo.functions[0].class.as_deref(), Some("com.example.Foo"));
        assert_eq!(foo.functions[0].start_line, Some(3));
        assert_eq!(foo.functions[0].hit_count, 1);
        assert_eq!(foo.functions[1].name, "doStuff");
        assert_eq!(foo.functions[1].start_line, Some(10));

        let bar = &data.files[1];
        assert_eq!(bar.path, "com/example/Bar.java");
        assert_eq!(bar.lines.len(), 2);
        assert_eq!(bar.branches.len(), 0);
        assert_eq!(bar.functions.len(), 1);
        assert_eq!(bar.functions[0].hit_count, 0);
    }

    #[test]
    fn test_parse_jacoco_no_package() {
        let input = br#"<?xml version="1.0"?>
<report name="app">
  <sourcefile name="App.java">
    <line nr="1" mi="0" ci="2" mb="0" cb="0"/>
    <line nr="2" mi="1" ci="0" mb="0" cb="0"/>
    <line nr="3" mi="0" ci="0" mb="0" cb="0"/>
  </sourcefile>
</report>"#;
        let data = parse(input).unwrap();

        assert_eq!(data.files.len(), 1);
        assert_eq!(data.files[0].path, "App.java");
        assert_eq!(data.files[0].package, None);
        assert_eq!(data.files[0].lines.len(), 2);
    }

    #[test]
    fn test_huge_branch_counters_are_ignored() {
        let input = br#"<?xml version="1.0"?>
<report name="app">
  <sourcefile name="App.java">
    <line nr="1" mi="0" ci="2" mb="18446744073709551615" cb="0"/>
    <line nr="2" mi="0" ci="2" mb="1" cb="1"/>
  </sourcefile>
</report>"#;
        let data = parse(input).unwrap();
        let file = &data.files[0];
        assert_eq!(file.lines.len(), 2);
        assert_eq!(file.branches.len(), 2);
        assert!(file.branches.iter().all(|b| b.line_number == 2));
    }

    #[test]
    fn test_parse_jacoco_empty() {
        let data = parse(br#"<?xml version="1.0"?><report name="empty"></report>"#).unwrap();
        assert_eq!(data.files.len(), 0);
    }

    #[test]
    fn test_parse_jacoco_malformed() {
        let result = parse(b"<report name=\"x\"><package name=\"a\"></report>");
        assert!(result.is_err());
        let err_msg = format!("{}", result.unwrap_err());
        assert!(
            err_msg.contains("position"),
            "Error should contain position info: {err_msg}",
        );
    }

    #[test]
    fn test_can_parse_jacoco() {
        let adapter = JacocoAdapter;

        let content = br#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd"><report name="test">"#;
        assert!(adapter.can_parse(Path::new("jacoco.xml"), content));

        let content = br#"<?xml version="1.0"?><coverage version="1.0">"#;
        assert!(!adapter.can_parse(Path::new("coverage.xml"), content));
    }
}
