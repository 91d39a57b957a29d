/// Extractor for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <group name="...">              (optional, may nest)
///       <package name="org/acme">
///         <class name="org/acme/Foo" sourcefilename="Foo.groovy">...</class>
///         <sourcefile name="Foo.groovy">
///           <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///           <line nr="11" mi="4" ci="0" mb="1" cb="1"/>
///           <counter type="LINE" missed="1" covered="5"/>
///         </sourcefile>
///       </package>
///     </group>
///   </report>
///
/// Only the `<sourcefile>` line tables are read. Each table is resolved to a
/// tracked file through the source index before any measure is emitted;
/// tables without a tracked counterpart are skipped.
use std::io::BufRead;

use tracing::debug;

use super::{CoverageParser, Extraction};
use crate::builder::CoverageMeasuresBuilder;
use crate::detect::Format;
use crate::error::{CoverageError, Result};
use crate::ingest::IngestContext;
use crate::model::{MeasureLog, MeasureSink};
use crate::numeric::{parse_count, parse_number};
use crate::resource::Resource;
use crate::xml::{Element, ElementFilter, XmlWalker};

/// JaCoCo XML format parser.
pub struct JacocoParser;

impl CoverageParser for JacocoParser {
    fn format(&self) -> Format {
        Format::Jacoco
    }

    fn extract(
        &self,
        input: &mut dyn BufRead,
        ctx: &IngestContext,
        sink: &mut dyn MeasureSink,
    ) -> Result<Extraction> {
        extract(input, ctx, sink)
    }
}

/// Parse JaCoCo XML from raw bytes into an in-memory measure log.
pub fn parse(input: &[u8], ctx: &IngestContext) -> Result<MeasureLog> {
    let mut log = MeasureLog::new();
    extract(input, ctx, &mut log)?;
    Ok(log)
}

/// Counters of one `<line>` row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounters {
    pub nr: u32,
    /// Missed instructions.
    pub mi: u32,
    /// Covered instructions.
    pub ci: u32,
    /// Missed branches.
    pub mb: u32,
    /// Covered branches.
    pub cb: u32,
}

impl LineCounters {
    fn read(line: &Element) -> Result<Self> {
        let counter = |name: &str| -> Result<u32> {
            let value = parse_number(line.attr(name))?;
            if value < 0.0 {
                return Err(CoverageError::malformed(format!(
                    "negative counter {name}=\"{value}\" on <line>"
                )));
            }
            Ok(value as u32)
        };
        Ok(Self {
            nr: parse_count(line.attr("nr"), "<line> nr")?,
            mi: counter("mi")?,
            ci: counter("ci")?,
            mb: counter("mb")?,
            cb: counter("cb")?,
        })
    }

    /// Hit count for the line, or `None` when it has no instructions.
    pub fn hits(&self) -> Option<u64> {
        if self.ci > 0 {
            Some(1)
        } else if self.mi > 0 {
            Some(0)
        } else {
            None
        }
    }

    /// `(total, covered)` branches.
    pub fn conditions(&self) -> (u32, u32) {
        (self.mb.saturating_add(self.cb), self.cb)
    }
}

/// The line table of one `<sourcefile>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFileCoverage {
    /// `/`-separated package path; empty for the default package.
    pub package: String,
    pub file_name: String,
    pub lines: Vec<LineCounters>,
}

impl SourceFileCoverage {
    /// Path of the file relative to a source root, as the report sees it.
    pub fn lookup_key(&self) -> String {
        if self.package.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.package, self.file_name)
        }
    }

    fn record(&self, builder: &mut CoverageMeasuresBuilder) {
        for line in &self.lines {
            if let Some(hits) = line.hits() {
                builder.set_hits(line.nr, hits);
            }
            let (total, covered) = line.conditions();
            builder.set_conditions(line.nr, total, covered);
        }
    }
}

/// Turns line tables into measures for the tracked files they describe.
struct Adapter<'a> {
    ctx: &'a IngestContext,
    sink: &'a mut dyn MeasureSink,
    builder: CoverageMeasuresBuilder,
    extraction: Extraction,
}

impl Adapter<'_> {
    fn accept(&mut self, source: &SourceFileCoverage) {
        let key = source.lookup_key();
        let resolver = &self.ctx.resolver;
        let Some(path) = self.ctx.index.lookup(&key, resolver.search_paths()) else {
            debug!("No tracked source file for {key}, skipping");
            self.extraction.skipped += 1;
            return;
        };
        let resource = Resource::file_at(path);
        if !resolver.is_included(&resource) {
            self.extraction.skipped += 1;
            return;
        }

        self.builder.clear();
        source.record(&mut self.builder);
        self.builder.save_to(&resource, self.sink);
    }
}

fn extract<R: BufRead>(
    input: R,
    ctx: &IngestContext,
    sink: &mut dyn MeasureSink,
) -> Result<Extraction> {
    let mut walker = XmlWalker::new(input);
    let mut root = walker.root();
    match root.advance()? {
        Some(report) if report.local_name() == "report" => {}
        Some(other) => {
            return Err(CoverageError::malformed(format!(
                "expected <report> document element, found <{}>",
                other.local_name()
            )))
        }
        None => return Err(CoverageError::malformed("empty document")),
    }

    let mut adapter = Adapter {
        ctx,
        sink,
        builder: CoverageMeasuresBuilder::new(),
        extraction: Extraction::default(),
    };

    let mut packages = root.descendants(ElementFilter::Named("package"));
    while let Some(package) = packages.advance()? {
        let package_path = package
            .attr("name")
            .map(|name| name.trim().trim_matches('/').replace('.', "/"))
            .unwrap_or_default();

        let mut source_files = packages.children(ElementFilter::Named("sourcefile"));
        while let Some(source_file) = source_files.advance()? {
            let Some(file_name) = source_file.attr("name").map(str::trim) else {
                return Err(CoverageError::malformed("<sourcefile> without a name"));
            };
            let mut source = SourceFileCoverage {
                package: package_path.clone(),
                file_name: file_name.to_string(),
                lines: Vec::new(),
            };

            let mut lines = source_files.children(ElementFilter::Named("line"));
            while let Some(line) = lines.advance()? {
                source.lines.push(LineCounters::read(&line)?);
            }
            adapter.accept(&source);
        }
    }
    Ok(adapter.extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceIndex;
    use crate::model::{MeasureValue, Metric};

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="demo">
  <sessioninfo id="s1" start="1" dump="2"/>
  <package name="org/acme">
    <class name="org/acme/Foo" sourcefilename="Foo.groovy">
      <counter type="LINE" missed="1" covered="2"/>
    </class>
    <sourcefile name="Foo.groovy">
      <line nr="3" mi="0" ci="4" mb="0" cb="0"/>
      <line nr="4" mi="2" ci="0" mb="1" cb="1"/>
      <line nr="5" mi="0" ci="0" mb="0" cb="0"/>
      <line nr="6" mi="0" ci="3" mb="2" cb="0"/>
      <counter type="LINE" missed="1" covered="2"/>
    </sourcefile>
    <sourcefile name="Untracked.groovy">
      <line nr="1" mi="0" ci="1" mb="0" cb="0"/>
    </sourcefile>
  </package>
  <package name="">
    <sourcefile name="Hello.groovy">
      <line nr="1" mi="1" ci="0" mb="0" cb="0"/>
    </sourcefile>
  </package>
</report>"#;

    fn ctx(files: &[&str]) -> IngestContext {
        IngestContext {
            index: SourceIndex::from_relative_paths(files.iter().copied()),
            ..IngestContext::default()
        }
    }

    #[test]
    fn test_line_rules() {
        let line = |mi, ci, mb, cb| LineCounters { nr: 1, mi, ci, mb, cb };
        assert_eq!(line(0, 1, 0, 0).hits(), Some(1));
        assert_eq!(line(3, 1, 0, 0).hits(), Some(1));
        assert_eq!(line(3, 0, 0, 0).hits(), Some(0));
        assert_eq!(line(0, 0, 0, 0).hits(), None);
        assert_eq!(line(0, 0, 3, 1).conditions(), (4, 1));
    }

    #[test]
    fn test_lookup_key() {
        let mut source = SourceFileCoverage {
            package: "org/acme".to_string(),
            file_name: "Foo.groovy".to_string(),
            lines: Vec::new(),
        };
        assert_eq!(source.lookup_key(), "org/acme/Foo.groovy");
        source.package.clear();
        assert_eq!(source.lookup_key(), "Foo.groovy");
    }

    #[test]
    fn test_resolved_files_emit_measures() {
        let ctx = ctx(&["org/acme/Foo.groovy", "Hello.groovy"]);
        let mut log = MeasureLog::new();
        let extraction = extract(REPORT.as_bytes(), &ctx, &mut log).unwrap();
        assert_eq!(extraction.skipped, 1);

        let foo = Resource::file("org/acme", "Foo.groovy");
        assert_eq!(log.number(&foo, Metric::LinesToCover), Some(3.0));
        assert_eq!(log.number(&foo, Metric::UncoveredLines), Some(1.0));
        assert_eq!(
            log.get(&foo, Metric::LineHitsData).and_then(MeasureValue::as_data),
            Some("3=1;4=0;6=1")
        );
        assert_eq!(log.number(&foo, Metric::ConditionsToCover), Some(4.0));
        assert_eq!(log.number(&foo, Metric::UncoveredConditions), Some(3.0));

        let hello = Resource::file("", "Hello.groovy");
        assert_eq!(log.number(&hello, Metric::UncoveredLines), Some(1.0));

        // no project or package measures in this dialect
        assert!(log.measures.iter().all(|m| m.resource.is_file()));
    }

    #[test]
    fn test_resolves_through_suffix_and_search_paths() {
        let ctx = ctx(&["src/main/groovy/org/acme/Foo.groovy", "scripts/Hello.groovy"]);
        let log = parse(REPORT.as_bytes(), &ctx).unwrap();
        let foo = Resource::file("src/main/groovy/org/acme", "Foo.groovy");
        assert_eq!(log.number(&foo, Metric::LinesToCover), Some(3.0));
        let hello = Resource::file("scripts", "Hello.groovy");
        assert_eq!(log.number(&hello, Metric::LinesToCover), Some(1.0));
    }

    #[test]
    fn test_nothing_tracked_emits_nothing() {
        let mut log = MeasureLog::new();
        let extraction = extract(REPORT.as_bytes(), &ctx(&[]), &mut log).unwrap();
        assert!(log.is_empty());
        assert_eq!(extraction.skipped, 3);
    }

    #[test]
    fn test_grouped_packages() {
        let xml = r#"<report name="r">
  <group name="g1"><group name="g2">
    <package name="org/acme">
      <sourcefile name="Foo.groovy"><line nr="1" mi="0" ci="1" mb="0" cb="0"/></sourcefile>
    </package>
  </group></group>
</report>"#;
        let log = parse(xml.as_bytes(), &ctx(&["org/acme/Foo.groovy"])).unwrap();
        assert_eq!(
            log.number(&Resource::file("org/acme", "Foo.groovy"), Metric::LinesToCover),
            Some(1.0)
        );
    }

    #[test]
    fn test_bad_counter_is_malformed() {
        let xml = r#"<report name="r"><package name="p">
  <sourcefile name="A.groovy"><line nr="1" mi="zero" ci="1"/></sourcefile>
</package></report>"#;
        assert!(parse(xml.as_bytes(), &ctx(&["p/A.groovy"])).is_err());

        let xml = r#"<report name="r"><package name="p">
  <sourcefile name="A.groovy"><line mi="0" ci="1"/></sourcefile>
</package></report>"#;
        assert!(parse(xml.as_bytes(), &ctx(&["p/A.groovy"])).is_err());
    }

    #[test]
    fn test_wrong_document_element() {
        let err = parse(b"<coverage/>", &ctx(&[])).unwrap_err();
        assert!(err.to_string().contains("<report>"), "{err}");
    }
}
