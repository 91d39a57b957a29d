pub mod clover;
pub mod cobertura;
pub mod jacoco;

use std::io::BufRead;

use crate::detect::Format;
use crate::error::Result;
use crate::ingest::IngestContext;
use crate::model::MeasureSink;

/// What an extraction pass left behind besides the measures themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Files or classes that could not be mapped to a tracked resource.
    pub skipped: usize,
}

/// Every report dialect implements this trait.
pub trait CoverageParser {
    fn format(&self) -> Format;

    /// Walk the report and push measures into `sink` as they are computed.
    /// On error, measures saved before the failure stay saved.
    fn extract(
        &self,
        input: &mut dyn BufRead,
        ctx: &IngestContext,
        sink: &mut dyn MeasureSink,
    ) -> Result<Extraction>;
}

/// The parser for a format.
pub fn parser_for(format: Format) -> &'static dyn CoverageParser {
    match format {
        Format::Clover => &clover::CloverParser,
        Format::Jacoco => &jacoco::JacocoParser,
        Format::Cobertura => &cobertura::CoberturaParser,
    }
}
