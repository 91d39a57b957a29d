/// Extractor for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage line-rate="..." branch-rate="...">
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="org.acme">
///         <classes>
///           <class name="org.acme.Foo" filename="org/acme/Foo.groovy">
///             <methods>...</methods>
///             <lines>
///               <line number="3" hits="2" branch="false"/>
///               <line number="5" hits="1" branch="true"
///                     condition-coverage="50% (1/2)"/>
///             </lines>
///           </class>
///           <class name="org.acme.Foo$1" filename="org/acme/Foo.groovy">...</class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// Files are derived from class names, not from `filename`: inner and
/// closure classes (`Foo$1`) fold into their outer class's file. Lines are
/// gathered for the whole report first and emitted per file at the end, only
/// for files that are tracked.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
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

/// Pre-compiled regex for condition-coverage attributes like "75% (3/4)".
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").unwrap());

/// Cobertura XML format parser.
pub struct CoberturaParser;

impl CoverageParser for CoberturaParser {
    fn format(&self) -> Format {
        Format::Cobertura
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

/// Parse Cobertura XML from raw bytes into an in-memory measure log.
pub fn parse(input: &[u8], ctx: &IngestContext) -> Result<MeasureLog> {
    let mut log = MeasureLog::new();
    extract(input, ctx, &mut log)?;
    Ok(log)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClassLine {
    number: u32,
    hits: u64,
    /// `(total, covered)` from `condition-coverage`.
    conditions: Option<(u32, u32)>,
}

impl ClassLine {
    fn read(line: &Element) -> Result<Self> {
        let number = parse_count(line.attr("number"), "<line> number")?;
        let hits = parse_number(line.attr("hits"))?;
        if hits < 0.0 {
            return Err(CoverageError::malformed(format!(
                "<line number=\"{number}\"> negative hits '{hits}'"
            )));
        }
        let is_branch = line
            .attr("branch")
            .is_some_and(|b| b.trim().eq_ignore_ascii_case("true"));
        let conditions = match line.attr("condition-coverage").map(str::trim) {
            Some(text) if is_branch && !text.is_empty() => Some(parse_condition_coverage(text)?),
            _ => None,
        };
        Ok(Self {
            number,
            hits: hits as u64,
            conditions,
        })
    }
}

/// `"50% (1/2)"` -> `(2, 1)`.
fn parse_condition_coverage(text: &str) -> Result<(u32, u32)> {
    let invalid = || CoverageError::malformed(format!("invalid condition-coverage '{text}'"));
    let caps = BRANCH_RE.captures(text).ok_or_else(invalid)?;
    let covered = caps[1].parse::<u32>().map_err(|_| invalid())?;
    let total = caps[2].parse::<u32>().map_err(|_| invalid())?;
    Ok((total, covered))
}

/// Source file key for a class: the outer class name, dots turned into
/// directories, plus the source extension.
fn file_key(class_name: &str, extension: &str) -> Option<String> {
    let outer = class_name
        .split_once('$')
        .map_or(class_name, |(outer, _)| outer)
        .trim();
    if outer.is_empty() {
        return None;
    }
    Some(format!("{}.{extension}", outer.replace('.', "/")))
}

fn extract<R: BufRead>(
    input: R,
    ctx: &IngestContext,
    sink: &mut dyn MeasureSink,
) -> Result<Extraction> {
    let mut walker = XmlWalker::new(input);
    let mut root = walker.root();
    match root.advance()? {
        Some(coverage) if coverage.local_name() == "coverage" => {}
        Some(other) => {
            return Err(CoverageError::malformed(format!(
                "expected <coverage> document element, found <{}>",
                other.local_name()
            )))
        }
        None => return Err(CoverageError::malformed("empty document")),
    }

    let extension = ctx.resolver.extension();
    let mut extraction = Extraction::default();
    let mut lines_by_file: BTreeMap<String, Vec<ClassLine>> = BTreeMap::new();

    let mut packages = root.descendants(ElementFilter::Named("package"));
    while packages.advance()?.is_some() {
        let mut classes = packages.descendants(ElementFilter::Named("class"));
        while let Some(class) = classes.advance()? {
            let Some(key) = class.attr("name").and_then(|name| file_key(name, extension)) else {
                debug!("Skipping <class> without a name");
                extraction.skipped += 1;
                continue;
            };
            let file_lines = lines_by_file.entry(key).or_default();

            let mut blocks = classes.children(ElementFilter::Named("lines"));
            while blocks.advance()?.is_some() {
                let mut lines = blocks.children(ElementFilter::Named("line"));
                while let Some(line) = lines.advance()? {
                    file_lines.push(ClassLine::read(&line)?);
                }
            }
        }
    }

    let resolver = &ctx.resolver;
    let mut builder = CoverageMeasuresBuilder::new();
    for (key, lines) in &lines_by_file {
        let Some(path) = ctx.index.lookup(key, resolver.search_paths()) else {
            debug!("No tracked source file for {key}, skipping");
            extraction.skipped += 1;
            continue;
        };
        let resource = Resource::file_at(path);
        if !resolver.is_included(&resource) {
            extraction.skipped += 1;
            continue;
        }

        builder.clear();
        for line in lines {
            builder.set_hits(line.number, line.hits);
            if let Some((total, covered)) = line.conditions {
                builder.set_conditions(line.number, total, covered);
            }
        }
        builder.save_to(&resource, sink);
    }
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceIndex;
    use crate::model::{MeasureValue, Metric};

    const REPORT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
<coverage line-rate="0.5" branch-rate="0.5" version="2.1.1" timestamp="1">
  <sources><source>/work/src/main/groovy</source></sources>
  <packages>
    <package name="org.acme" line-rate="0.5" branch-rate="0.5">
      <classes>
        <class name="org.acme.Foo" filename="org/acme/Foo.groovy">
          <methods>
            <method name="run" signature="()V">
              <lines><line number="3" hits="0" branch="false"/></lines>
            </method>
          </methods>
          <lines>
            <line number="3" hits="2" branch="false"/>
            <line number="5" hits="1" branch="true" condition-coverage="50% (1/2)"/>
          </lines>
        </class>
        <class name="org.acme.Foo$_run_closure1" filename="org/acme/Foo.groovy">
          <lines>
            <line number="9" hits="0" branch="false"/>
            <line number="3" hits="7" branch="false"/>
          </lines>
        </class>
        <class name="org.acme.Bar" filename="org/acme/Bar.groovy">
          <lines><line number="1" hits="1" branch="false"/></lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>"#;

    fn ctx(files: &[&str]) -> IngestContext {
        IngestContext {
            index: SourceIndex::from_relative_paths(files.iter().copied()),
            ..IngestContext::default()
        }
    }

    #[test]
    fn test_file_key() {
        assert_eq!(file_key("org.acme.Foo", "groovy").as_deref(), Some("org/acme/Foo.groovy"));
        assert_eq!(
            file_key("org.acme.Foo$Inner$1", "groovy").as_deref(),
            Some("org/acme/Foo.groovy")
        );
        assert_eq!(file_key("Main", "groovy").as_deref(), Some("Main.groovy"));
        assert_eq!(file_key("$Anon", "groovy"), None);
    }

    #[test]
    fn test_parse_condition_coverage() {
        assert_eq!(parse_condition_coverage("50% (1/2)").unwrap(), (2, 1));
        assert_eq!(parse_condition_coverage("100% (4/4)").unwrap(), (4, 4));
        assert!(parse_condition_coverage("50%").is_err());
    }

    #[test]
    fn test_inner_classes_merge_into_one_file() {
        let mut log = MeasureLog::new();
        let extraction =
            extract(REPORT.as_bytes(), &ctx(&["org/acme/Foo.groovy"]), &mut log).unwrap();
        assert_eq!(extraction.skipped, 1);

        let foo = Resource::file("org/acme", "Foo.groovy");
        assert_eq!(log.number(&foo, Metric::LinesToCover), Some(3.0));
        assert_eq!(log.number(&foo, Metric::UncoveredLines), Some(1.0));
        // method-level lines are not read; the class's own line 3 wins
        assert_eq!(
            log.get(&foo, Metric::LineHitsData).and_then(MeasureValue::as_data),
            Some("3=2;5=1;9=0")
        );
        assert_eq!(log.number(&foo, Metric::ConditionsToCover), Some(2.0));
        assert_eq!(log.number(&foo, Metric::UncoveredConditions), Some(1.0));
        assert_eq!(log.for_resource(&Resource::file("org/acme", "Bar.groovy")).count(), 0);
    }

    #[test]
    fn test_extension_follows_resolver() {
        let ctx = IngestContext {
            resolver: crate::resource::Resolver::new("java"),
            index: SourceIndex::from_relative_paths(["src/org/acme/Bar.java"]),
        };
        let log = parse(REPORT.as_bytes(), &ctx).unwrap();
        let bar = Resource::file("src/org/acme", "Bar.java");
        assert_eq!(log.number(&bar, Metric::LinesToCover), Some(1.0));
    }

    #[test]
    fn test_invalid_condition_coverage_is_malformed() {
        let xml = r#"<coverage><packages><package name="p"><classes>
  <class name="p.A"><lines>
    <line number="1" hits="1" branch="true" condition-coverage="half"/>
  </lines></class>
</classes></package></packages></coverage>"#;
        assert!(parse(xml.as_bytes(), &ctx(&["p/A.groovy"])).is_err());
    }

    #[test]
    fn test_blank_condition_coverage_is_ignored() {
        let xml = r#"<coverage><packages><package name="p"><classes>
  <class name="p.A"><lines>
    <line number="1" hits="1" branch="true" condition-coverage=""/>
  </lines></class>
</classes></package></packages></coverage>"#;
        let log = parse(xml.as_bytes(), &ctx(&["p/A.groovy"])).unwrap();
        let a = Resource::file("p", "A.groovy");
        assert_eq!(log.number(&a, Metric::LinesToCover), Some(1.0));
        assert_eq!(log.number(&a, Metric::ConditionsToCover), None);
    }
}
