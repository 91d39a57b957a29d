//! Format-independent representation of coverage measures. Extractors push
//! `(Resource, Metric, MeasureValue)` triples into a [`MeasureSink`]; the sink
//! owns storage and rendering.

use std::fmt;

use serde::Serialize;

use crate::resource::Resource;

/// A named coverage measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Coverage,
    LineCoverage,
    LinesToCover,
    UncoveredLines,
    BranchCoverage,
    ConditionsToCover,
    UncoveredConditions,
    LineHitsData,
    ConditionsByLine,
    CoveredConditionsByLine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Coverage => "coverage",
            Metric::LineCoverage => "line_coverage",
            Metric::LinesToCover => "lines_to_cover",
            Metric::UncoveredLines => "uncovered_lines",
            Metric::BranchCoverage => "branch_coverage",
            Metric::ConditionsToCover => "conditions_to_cover",
            Metric::UncoveredConditions => "uncovered_conditions",
            Metric::LineHitsData => "line_hits_data",
            Metric::ConditionsByLine => "conditions_by_line",
            Metric::CoveredConditionsByLine => "covered_conditions_by_line",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of a measure: a number, or serialized per-line data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MeasureValue {
    Number(f64),
    Data(String),
}

impl MeasureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MeasureValue::Number(n) => Some(*n),
            MeasureValue::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&str> {
        match self {
            MeasureValue::Number(_) => None,
            MeasureValue::Data(s) => Some(s),
        }
    }
}

impl From<f64> for MeasureValue {
    fn from(n: f64) -> Self {
        MeasureValue::Number(n)
    }
}

impl From<String> for MeasureValue {
    fn from(s: String) -> Self {
        MeasureValue::Data(s)
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Number(n) => write!(f, "{n:?}"),
            MeasureValue::Data(s) => f.write_str(s),
        }
    }
}

/// One emitted measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    #[serde(serialize_with = "serialize_resource")]
    pub resource: Resource,
    pub metric: Metric,
    pub value: MeasureValue,
}

fn serialize_resource<S: serde::Serializer>(
    resource: &Resource,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&resource.key())
}

/// Destination for emitted measures.
///
/// Saving is side-effect only: a sink cannot reject a measure, and whatever
/// was saved before an extraction error stays saved.
pub trait MeasureSink {
    fn save(&mut self, resource: &Resource, metric: Metric, value: MeasureValue);
}

/// In-memory sink that records measures in emission order.
#[derive(Debug, Default)]
pub struct MeasureLog {
    pub measures: Vec<Measure>,
}

impl MeasureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// The value saved for `metric` on `resource`, if any.
    pub fn get(&self, resource: &Resource, metric: Metric) -> Option<&MeasureValue> {
        self.measures
            .iter()
            .find(|m| m.metric == metric && &m.resource == resource)
            .map(|m| &m.value)
    }

    /// Numeric shorthand for [`MeasureLog::get`].
    pub fn number(&self, resource: &Resource, metric: Metric) -> Option<f64> {
        self.get(resource, metric).and_then(MeasureValue::as_number)
    }

    /// All measures saved for one resource.
    pub fn for_resource<'a>(&'a self, resource: &'a Resource) -> impl Iterator<Item = &'a Measure> {
        self.measures.iter().filter(move |m| &m.resource == resource)
    }
}

impl MeasureSink for MeasureLog {
    fn save(&mut self, resource: &Resource, metric: Metric, value: MeasureValue) {
        self.measures.push(Measure {
            resource: resource.clone(),
            metric,
            value,
        });
    }
}

/// Counts what passes through to an inner sink.
pub(crate) struct CountingSink<'a> {
    inner: &'a mut dyn MeasureSink,
    pub(crate) saved: usize,
}

impl<'a> CountingSink<'a> {
    pub(crate) fn new(inner: &'a mut dyn MeasureSink) -> Self {
        Self { inner, saved: 0 }
    }
}

impl MeasureSink for CountingSink<'_> {
    fn save(&mut self, resource: &Resource, metric: Metric, value: MeasureValue) {
        self.saved += 1;
        self.inner.save(resource, metric, value);
    }
}
