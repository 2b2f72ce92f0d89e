//! Conversion of a parsed report into leaf facts.
//!
//! Every file becomes `[PACKAGE, FILE]` below the module, with its line,
//! branch and file counts. Methods hang below the file, grouped under a
//! CLASS node when the format reports one.
use std::collections::BTreeMap;

use crate::builder::{LeafFact, Segment};
use crate::error::Result;
use crate::level::CoverageLevel;
use crate::model::{CoverageData, FileCoverage, FunctionCoverage};
use crate::ratio::Ratio;
use crate::split::PACKAGE_SEPARATOR;

/// Package name for files that belong to no package.
pub const DEFAULT_PACKAGE: &str = "-";

/// Leaf facts for every file in `data`, in report order.
pub fn facts_from_coverage(data: &CoverageData) -> Result<Vec<LeafFact>> {
    let mut facts = Vec::new();
    for file in &data.files {
        file_facts(file, &mut facts)?;
    }
    Ok(facts)
}

fn file_facts(file: &FileCoverage, facts: &mut Vec<LeafFact>) -> Result<()> {
    let package = package_name(file);
    let file_path = vec![Segment::package(package.clone()), Segment::file(basename(&file.path))];

    let lines = file.line_ratio()?;
    facts.push(LeafFact::new(file_path.clone(), CoverageLevel::Line, lines));
    if !file.branches.is_empty() {
        facts.push(LeafFact::new(
            file_path.clone(),
            CoverageLevel::Conditional,
            file.branch_ratio()?,
        ));
    }
    facts.push(LeafFact::new(
        file_path.clone(),
        CoverageLevel::File,
        Ratio::single(lines.covered() > 0),
    ));

    let mut classes: BTreeMap<&str, Vec<&FunctionCoverage>> = BTreeMap::new();
    for function in &file.functions {
        match function.class.as_deref() {
            Some(class) if !class.is_empty() => classes.entry(class).or_default().push(function),
            _ => facts.push(method_fact(&file_path, function)),
        }
    }

    for (class, methods) in classes {
        let mut class_path = file_path.clone();
        class_path.push(Segment::class(simple_class_name(class, &package)));
        facts.push(LeafFact::new(
            class_path.clone(),
            CoverageLevel::Class,
            Ratio::single(methods.iter().any(|m| m.hit_count > 0)),
        ));
        facts.extend(methods.into_iter().map(|m| method_fact(&class_path, m)));
    }
    Ok(())
}

fn method_fact(parent: &[Segment], function: &FunctionCoverage) -> LeafFact {
    let mut path = parent.to_vec();
    path.push(Segment::method(function.name.clone()));
    LeafFact::new(
        path,
        CoverageLevel::Method,
        Ratio::single(function.hit_count > 0),
    )
}

/// The reported package, else the file's directory in dotted form.
fn package_name(file: &FileCoverage) -> String {
    if let Some(package) = file.package.as_deref().filter(|p| !p.is_empty()) {
        return package.to_string();
    }
    let dir = match file.path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let dotted = dir
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join(&PACKAGE_SEPARATOR.to_string());
    if dotted.is_empty() {
        DEFAULT_PACKAGE.to_string()
    } else {
        dotted
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `com.example.Foo` in package `com.example` is named `Foo`.
fn simple_class_name<'a>(class: &'a str, package: &str) -> &'a str {
    class
        .strip_prefix(package)
        .and_then(|rest| rest.strip_prefix(PACKAGE_SEPARATOR))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_tree;
    use crate::model::{BranchCoverage, LineCoverage};

    fn ratio(covered: u64, total: u64) -> Ratio {
        Ratio::new(covered, total).unwrap()
    }

    fn file(path: &str, hits: &[u64]) -> FileCoverage {
        let mut file = FileCoverage::new(path.to_string());
        file.lines = hits
            .iter()
            .enumerate()
            .map(|(i, &hit_count)| LineCoverage {
                line_number: i as u32 + 1,
                hit_count,
            })
            .collect();
        file
    }

    fn function(name: &str, class: Option<&str>, hit_count: u64) -> FunctionCoverage {
        FunctionCoverage {
            name: name.to_string(),
            class: class.map(str::to_string),
            start_line: None,
            hit_count,
        }
    }

    #[test]
    fn test_file_facts() {
        let mut foo = file("com/example/Foo.java", &[1, 0, 2, 0]);
        foo.package = Some("com.example".to_string());
        foo.branches = vec![
            BranchCoverage {
                line_number: 3,
                branch_index: 0,
                hit_count: 1,
            },
            BranchCoverage {
                line_number: 3,
                branch_index: 1,
                hit_count: 0,
            },
        ];
        let facts = facts_from_coverage(&CoverageData { files: vec![foo] }).unwrap();

        assert_eq!(facts.len(), 3);
        let path = vec![Segment::package("com.example"), Segment::file("Foo.java")];
        assert_eq!(facts[0], LeafFact::new(path.clone(), CoverageLevel::Line, ratio(2, 4)));
        assert_eq!(
            facts[1],
            LeafFact::new(path.clone(), CoverageLevel::Conditional, ratio(1, 2))
        );
        assert_eq!(facts[2], LeafFact::new(path, CoverageLevel::File, ratio(1, 1)));
    }

    #[test]
    fn test_package_from_directory() {
        let data = CoverageData {
            files: vec![
                file("/src/net/http.rs", &[0]),
                file("main.rs", &[1]),
                file("./lib.rs", &[1]),
            ],
        };
        let facts = facts_from_coverage(&data).unwrap();
        let packages: Vec<&str> = facts
            .iter()
            .filter(|f| f.level == CoverageLevel::Line)
            .map(|f| f.path[0].name.as_str())
            .collect();
        assert_eq!(packages, ["src.net", DEFAULT_PACKAGE, DEFAULT_PACKAGE]);
        // No line hit: the file itself counts as missed.
        assert_eq!(facts[1].ratio, ratio(0, 1));
    }

    #[test]
    fn test_methods_grouped_by_class() {
        let mut foo = file("Foo.java", &[1]);
        foo.package = Some("com.example".to_string());
        foo.functions = vec![
            function("run", Some("com.example.Foo"), 3),
            function("stop", Some("com.example.Foo"), 0),
            function("idle", Some("com.example.Foo$Worker"), 0),
        ];
        let report = build_tree(
            "app",
            facts_from_coverage(&CoverageData { files: vec![foo] }).unwrap(),
        );
        assert!(report.errors.is_empty());

        let root = report.result.root();
        let file = root
            .find_by_name("app/com.example/Foo.java")
            .expect("file node");
        let class = file.child(CoverageLevel::Class, "Foo").expect("class node");
        assert_eq!(class.children().len(), 2);
        assert_eq!(class.leaf_count(CoverageLevel::Class), ratio(1, 1));
        assert!(file.child(CoverageLevel::Class, "Foo$Worker").is_some());

        assert_eq!(root.aggregate(CoverageLevel::Class), ratio(1, 2));
        assert_eq!(root.aggregate(CoverageLevel::Method), ratio(1, 3));
    }

    #[test]
    fn test_methods_without_class_hang_below_file() {
        let mut lib = file("src/lib.rs", &[1, 1]);
        lib.functions = vec![function("main", None, 1), function("helper", None, 0)];
        let report = build_tree(
            "m",
            facts_from_coverage(&CoverageData { files: vec![lib] }).unwrap(),
        );
        let file = report.result.root().find_by_name("m/src/lib.rs").unwrap();
        assert_eq!(file.children().len(), 2);
        assert!(file
            .children()
            .iter()
            .all(|c| c.level() == CoverageLevel::Method));
        assert_eq!(file.aggregate(CoverageLevel::Method), ratio(1, 2));
    }
}
