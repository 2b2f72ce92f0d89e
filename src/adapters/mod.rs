//! Report adapters: one per coverage format, each turning raw report bytes
//! into a [`CoverageData`].
//!
//! Detection strategy:
//!   1. Check the file extension for strong hints
//!   2. Ask each adapter whether it recognizes the first bytes
//!   3. Fall back to the `--format` override (handled by the caller)
pub mod cobertura;
pub mod jacoco;
pub mod lcov;

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::CovtreeError;
use crate::model::CoverageData;

/// Supported coverage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Cobertura,
    Jacoco,
    Lcov,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cobertura => "cobertura",
            Format::Jacoco => "jacoco",
            Format::Lcov => "lcov",
        }
    }

    pub fn adapter(&self) -> &'static dyn ReportAdapter {
        match self {
            Format::Cobertura => &cobertura::CoberturaAdapter,
            Format::Jacoco => &jacoco::JacocoAdapter,
            Format::Lcov => &lcov::LcovAdapter,
        }
    }
}

impl std::str::FromStr for Format {
    type Err = CovtreeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cobertura" => Ok(Format::Cobertura),
            "jacoco" => Ok(Format::Jacoco),
            "lcov" => Ok(Format::Lcov),
            _ => Err(CovtreeError::Parse(format!(
                "Unknown format: '{}'. Supported: cobertura, jacoco, lcov",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every format adapter implements this trait.
pub trait ReportAdapter: Sync {
    fn format(&self) -> Format;

    /// Whether this adapter recognizes the report at `path` whose content
    /// starts with `content`.
    fn can_parse(&self, path: &Path, content: &[u8]) -> bool;

    /// Parse the input bytes into the uniform coverage model.
    fn parse(&self, input: &[u8]) -> Result<CoverageData>;
}

/// Adapters in detection order. JaCoCo goes before Cobertura since both
/// are XML and only JaCoCo's check is specific.
/// Upper bound on branch arms recorded for one line. Real reports stay far
/// below it; larger counts come from corrupt input.
pub const MAX_BRANCHES_PER_LINE: u32 = 4096;

const ADAPTERS: [Format; 3] = [Format::Lcov, Format::Jacoco, Format::Cobertura];

/// Detect the coverage format from filename and file content.
pub fn detect_format(path: &Path, content: &[u8]) -> Option<Format> {
    ADAPTERS
        .into_iter()
        .find(|format| format.adapter().can_parse(path, content))
}

/// The first few KB of a report, for sniffing.
pub(crate) fn sniff_head(content: &[u8]) -> std::borrow::Cow<'_, str> {
    let head_len = content.len().min(4096);
    String::from_utf8_lossy(&content[..head_len])
}

pub(crate) fn looks_like_xml(head: &str) -> bool {
    head.contains("<?xml") || head.trim_start().starts_with('<')
}

pub(crate) fn xml_reader<R: BufRead>(input: R) -> Reader<R> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    reader
}

pub(crate) fn xml_err<R>(source: quick_xml::Error, reader: &Reader<R>) -> anyhow::Error {
    CovtreeError::Xml {
        source,
        position: reader.buffer_position(),
    }
    .into()
}

/// Read one attribute of an XML element, unescaped.
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse a numeric attribute, treating absent or malformed values as 0.
pub(crate) fn get_count(e: &BytesStart, name: &[u8]) -> u64 {
    get_attr(e, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_lcov_by_extension() {
        let path = Path::new("coverage.info");
        assert_eq!(detect_format(path, b""), Some(Format::Lcov));

        let path = Path::new("coverage.lcov");
        assert_eq!(detect_format(path, b""), Some(Format::Lcov));
    }

    #[test]
    fn test_detect_lcov_by_content() {
        let content = b"TN:test\nSF:/src/lib.rs\nDA:1,5\nend_of_record\n";
        let path = Path::new("coverage.txt");
        assert_eq!(detect_format(path, content), Some(Format::Lcov));
    }

    #[test]
    fn test_detect_cobertura_by_content() {
        let content = b"<?xml version=\"1.0\"?>\n<coverage version=\"1.0\">";
        let path = Path::new("coverage.xml");
        assert_eq!(detect_format(path, content), Some(Format::Cobertura));
    }

    #[test]
    fn test_detect_jacoco_by_content() {
        let content = br#"<?xml version="1.0"?><report name="test"><package name="com/example">"#;
        assert_eq!(
            detect_format(Path::new("report.xml"), content),
            Some(Format::Jacoco)
        );
    }

    #[test]
    fn test_detect_unknown() {
        let path = Path::new("random.dat");
        assert_eq!(detect_format(path, b"hello world"), None);
    }

    #[test]
    fn test_parse_format_name() {
        assert_eq!("JaCoCo".parse::<Format>().unwrap(), Format::Jacoco);
        assert!("clover".parse::<Format>().is_err());
        assert_eq!(Format::Lcov.adapter().format(), Format::Lcov);
    }
}
