/// Extractor for Clover XML coverage reports.
///
/// Clover XML structure:
///
///   <coverage generated="..." clover="4.x.x">
///     <project timestamp="..." name="...">
///       <metrics elements="..." coveredelements="..." statements="..." .../>
///       <package name="org.acme">
///         <metrics .../>
///         <file name="Foo.groovy" path="/abs/path/org/acme/Foo.groovy">
///           <metrics .../>
///           <class name="Foo"><metrics .../></class>
///           <line num="3" count="2" type="stmt"/>
///           <line num="5" type="cond" truecount="1" falsecount="0"/>
///         </file>
///       </package>
///     </project>
///   </coverage>
///
/// Older generators differ in two ways that the walk tolerates:
///   - Clover 1.x puts `<class>` elements before a file's `<metrics>` and
///     writes absolute paths (either separator) into `<file name>`.
///   - Clover 2.3.2 interleaves `<class>` elements with the `<line>`s.
///
/// Project and package measures come from the aggregate metrics node; file
/// measures come from the line table.
use std::io::BufRead;

use tracing::debug;

use super::{CoverageParser, Extraction};
use crate::builder::CoverageMeasuresBuilder;
use crate::detect::Format;
use crate::error::{CoverageError, Result};
use crate::ingest::IngestContext;
use crate::model::{MeasureLog, MeasureSink, MeasureValue, Metric};
use crate::numeric::{parse_count, parse_number, pct};
use crate::resource::{class_name_from_path, Resource};
use crate::xml::{Cursor, Element, ElementFilter, XmlWalker};

/// Clover XML format parser.
pub struct CloverParser;

impl CoverageParser for CloverParser {
    fn format(&self) -> Format {
        Format::Clover
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

/// Parse Clover XML from raw bytes into an in-memory measure log.
pub fn parse(input: &[u8], ctx: &IngestContext) -> Result<MeasureLog> {
    let mut log = MeasureLog::new();
    extract(input, ctx, &mut log)?;
    Ok(log)
}

/// Element kinds that older Clover versions place where a metrics node or a
/// line is expected. Supporting another dialect's stray nodes means adding a
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonMetricsNode {
    Class,
}

impl NonMetricsNode {
    const ALL: [NonMetricsNode; 1] = [NonMetricsNode::Class];

    fn name(self) -> &'static str {
        match self {
            NonMetricsNode::Class => "class",
        }
    }

    fn is_skipped(element: &Element) -> bool {
        Self::ALL.iter().any(|kind| kind.name() == element.local_name())
    }
}

/// Aggregate counters of a Clover `<metrics>` node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateMetrics {
    pub elements: u32,
    pub statements: u32,
    pub methods: u32,
    pub conditionals: u32,
    pub covered_elements: u32,
    pub covered_statements: u32,
    pub covered_methods: u32,
    pub covered_conditionals: u32,
}

fn count_attr(element: &Element, name: &str) -> Result<u32> {
    let value = parse_number(element.attr(name)).map_err(|_| {
        CoverageError::malformed(format!(
            "<{}> attribute '{name}' is not a number: '{}'",
            element.local_name(),
            element.attr(name).unwrap_or_default()
        ))
    })?;
    Ok(value as u32)
}

impl AggregateMetrics {
    /// Read a metrics node. Nodes without coverable elements yield `None`
    /// and their other attributes are not looked at.
    pub fn read(element: &Element) -> Result<Option<Self>> {
        let elements = count_attr(element, "elements")?;
        if elements == 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            elements,
            statements: count_attr(element, "statements")?,
            methods: count_attr(element, "methods")?,
            conditionals: count_attr(element, "conditionals")?,
            covered_elements: count_attr(element, "coveredelements")?,
            covered_statements: count_attr(element, "coveredstatements")?,
            covered_methods: count_attr(element, "coveredmethods")?,
            covered_conditionals: count_attr(element, "coveredconditionals")?,
        }))
    }

    pub fn coverage(&self) -> f64 {
        pct(self.covered_elements, self.elements)
    }

    pub fn line_coverage(&self) -> f64 {
        pct(self.covered_lines(), self.lines())
    }

    pub fn branch_coverage(&self) -> f64 {
        pct(self.covered_conditionals, self.conditionals)
    }

    fn lines(&self) -> u32 {
        self.statements.saturating_add(self.methods)
    }

    fn covered_lines(&self) -> u32 {
        self.covered_statements.saturating_add(self.covered_methods)
    }

    /// Measures for the node. The branch family only appears when there are
    /// conditionals.
    pub fn measures(&self) -> Vec<(Metric, MeasureValue)> {
        let mut measures = vec![
            (Metric::Coverage, self.coverage().into()),
            (Metric::LineCoverage, self.line_coverage().into()),
            (Metric::LinesToCover, f64::from(self.lines()).into()),
            (
                Metric::UncoveredLines,
                f64::from(self.lines().saturating_sub(self.covered_lines())).into(),
            ),
        ];
        if self.conditionals > 0 {
            measures.push((Metric::BranchCoverage, self.branch_coverage().into()));
            measures.push((Metric::ConditionsToCover, f64::from(self.conditionals).into()));
            measures.push((
                Metric::UncoveredConditions,
                f64::from(self.conditionals.saturating_sub(self.covered_conditionals)).into(),
            ));
        }
        measures
    }
}

fn save_aggregate(resource: &Resource, metrics: &Element, sink: &mut dyn MeasureSink) -> Result<()> {
    if let Some(metrics) = AggregateMetrics::read(metrics)? {
        for (metric, value) in metrics.measures() {
            sink.save(resource, metric, value);
        }
    }
    Ok(())
}

/// Walk state shared by every level of one report.
struct Walk<'a> {
    ctx: &'a IngestContext,
    sink: &'a mut dyn MeasureSink,
    builder: CoverageMeasuresBuilder,
    extraction: Extraction,
}

fn extract<R: BufRead>(
    input: R,
    ctx: &IngestContext,
    sink: &mut dyn MeasureSink,
) -> Result<Extraction> {
    let mut walker = XmlWalker::new(input);
    let mut root = walker.root();
    if root.advance()?.is_none() {
        return Err(CoverageError::malformed("empty document"));
    }

    let mut projects = root.descendants(ElementFilter::Named("project"));
    if projects.advance()?.is_none() {
        return Err(CoverageError::malformed("no <project> element"));
    }

    let mut walk = Walk {
        ctx,
        sink,
        builder: CoverageMeasuresBuilder::new(),
        extraction: Extraction::default(),
    };

    let mut children = projects.children(ElementFilter::Any);
    match children.advance()? {
        Some(first) if first.local_name() == "package" => {
            walk.package(&first, &mut children)?;
        }
        Some(metrics) => save_aggregate(&Resource::Project, &metrics, walk.sink)?,
        None => return Ok(walk.extraction),
    }

    children.set_filter(ElementFilter::Named("package"));
    while let Some(package) = children.advance()? {
        walk.package(&package, &mut children)?;
    }
    Ok(walk.extraction)
}

impl Walk<'_> {
    fn package<R: BufRead>(&mut self, package: &Element, cursor: &mut Cursor<'_, R>) -> Result<()> {
        let name = package
            .attr("name")
            .ok_or_else(|| CoverageError::malformed("<package> without a name"))?;
        let resource = Resource::package(name);
        let path = name.replace('.', "/");

        let mut inner = cursor.descendants(ElementFilter::Any);
        match inner.advance()? {
            Some(first) if first.local_name() == "file" => self.file(&path, &first, &mut inner)?,
            Some(metrics) => save_aggregate(&resource, &metrics, self.sink)?,
            None => return Ok(()),
        }

        inner.set_filter(ElementFilter::Named("file"));
        while let Some(file) = inner.advance()? {
            self.file(&path, &file, &mut inner)?;
        }
        Ok(())
    }

    fn file<R: BufRead>(
        &mut self,
        package_path: &str,
        file: &Element,
        cursor: &mut Cursor<'_, R>,
    ) -> Result<()> {
        let Some(class_name) = class_name_from_path(file.attr("name")) else {
            debug!("Skipping <file> without a usable name in package {package_path}");
            self.extraction.skipped += 1;
            return Ok(());
        };
        let resource = Resource::file(package_path, &class_name);
        if !self.ctx.resolver.is_included(&resource) {
            self.extraction.skipped += 1;
            return Ok(());
        }

        let mut lines = cursor.children(ElementFilter::Any);
        if !has_file_metrics(&mut lines)? {
            debug!("No coverable elements in {resource}");
            return Ok(());
        }

        self.builder.clear();
        while let Some(line) = lines.advance()? {
            if NonMetricsNode::is_skipped(&line) {
                continue;
            }
            record_line(&line, &mut self.builder)?;
        }
        self.builder.save_to(&resource, self.sink);
        Ok(())
    }
}

/// Move past legacy nodes to the file's metrics node and check that it has
/// coverable elements.
fn has_file_metrics<R: BufRead>(cursor: &mut Cursor<'_, R>) -> Result<bool> {
    while let Some(element) = cursor.advance()? {
        if NonMetricsNode::is_skipped(&element) {
            continue;
        }
        return Ok(count_attr(&element, "elements")? > 0);
    }
    Ok(false)
}

fn record_line(line: &Element, builder: &mut CoverageMeasuresBuilder) -> Result<()> {
    let num = parse_count(line.attr("num"), "<line> num")?;
    match line.attr("count").map(str::trim).filter(|c| !c.is_empty()) {
        Some(count) => {
            let hits = count.parse::<u64>().map_err(|_| {
                CoverageError::malformed(format!("<line num=\"{num}\"> invalid count '{count}'"))
            })?;
            builder.set_hits(num, hits);
        }
        None => {
            let true_count = parse_number(line.attr("truecount"))?;
            let false_count = parse_number(line.attr("falsecount"))?;
            let covered = u32::from(true_count > 0.0) + u32::from(false_count > 0.0);
            builder.set_conditions(num, 2, covered);
        }
    }
    Ok(())
}
