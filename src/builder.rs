//! Per-file accumulator of line hits and branch conditions.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::model::{MeasureSink, MeasureValue, Metric};
use crate::resource::Resource;

/// Collects line-level data for one resource at a time. One instance is
/// reused for every file of a report; call [`CoverageMeasuresBuilder::clear`]
/// before each file.
#[derive(Debug, Default)]
pub struct CoverageMeasuresBuilder {
    hits_by_line: BTreeMap<u32, u64>,
    conditions_by_line: BTreeMap<u32, (u32, u32)>,
}

impl CoverageMeasuresBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.hits_by_line.clear();
        self.conditions_by_line.clear();
    }

    /// Record the hit count of a line. The first value seen for a line wins.
    pub fn set_hits(&mut self, line: u32, hits: u64) -> &mut Self {
        self.hits_by_line.entry(line).or_insert(hits);
        self
    }

    /// Record `covered` of `total` branch conditions on a line. Lines without
    /// conditions are ignored; the first value seen for a line wins.
    pub fn set_conditions(&mut self, line: u32, total: u32, covered: u32) -> &mut Self {
        if total > 0 {
            self.conditions_by_line
                .entry(line)
                .or_insert((total, covered.min(total)));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hits_by_line.is_empty() && self.conditions_by_line.is_empty()
    }

    pub fn lines_to_cover(&self) -> usize {
        self.hits_by_line.len()
    }

    pub fn covered_lines(&self) -> usize {
        self.hits_by_line.values().filter(|&&h| h > 0).count()
    }

    pub fn conditions(&self) -> u64 {
        self.conditions_by_line.values().map(|&(t, _)| u64::from(t)).sum()
    }

    pub fn covered_conditions(&self) -> u64 {
        self.conditions_by_line.values().map(|&(_, c)| u64::from(c)).sum()
    }

    /// Line hits as `line=count` pairs joined by `;`, ascending by line.
    pub fn hits_data(&self) -> String {
        format_line_map(self.hits_by_line.iter().map(|(&l, &h)| (l, h)))
    }

    /// Measures derived from what has been accumulated so far.
    pub fn build_measures(&self) -> Vec<(Metric, MeasureValue)> {
        let mut measures = Vec::new();
        let lines = self.lines_to_cover();
        if lines > 0 {
            measures.push((Metric::LinesToCover, MeasureValue::Number(lines as f64)));
            measures.push((
                Metric::UncoveredLines,
                MeasureValue::Number((lines - self.covered_lines()) as f64),
            ));
            measures.push((Metric::LineHitsData, MeasureValue::Data(self.hits_data())));
        }
        let conditions = self.conditions();
        if conditions > 0 {
            measures.push((Metric::ConditionsToCover, MeasureValue::Number(conditions as f64)));
            measures.push((
                Metric::UncoveredConditions,
                MeasureValue::Number((conditions - self.covered_conditions()) as f64),
            ));
            measures.push((
                Metric::ConditionsByLine,
                MeasureValue::Data(format_line_map(
                    self.conditions_by_line.iter().map(|(&l, &(t, _))| (l, u64::from(t))),
                )),
            ));
            measures.push((
                Metric::CoveredConditionsByLine,
                MeasureValue::Data(format_line_map(
                    self.conditions_by_line.iter().map(|(&l, &(_, c))| (l, u64::from(c))),
                )),
            ));
        }
        measures
    }

    /// Push the built measures for `resource` into `sink`.
    pub fn save_to(&self, resource: &Resource, sink: &mut dyn MeasureSink) {
        for (metric, value) in self.build_measures() {
            sink.save(resource, metric, value);
        }
    }
}

fn format_line_map(entries: impl Iterator<Item = (u32, u64)>) -> String {
    let mut out = String::new();
    for (line, value) in entries {
        if !out.is_empty() {
            out.push(';');
        }
        let _ = write!(out, "{line}={value}");
    }
    out
}
