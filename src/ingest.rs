use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detect::{detect_format, Format, HEAD_LEN};
use crate::error::{CoverageError, Result};
use crate::index::SourceIndex;
use crate::model::{CountingSink, MeasureSink};
use crate::parsers::parser_for;
use crate::resource::Resolver;

/// Static collaborators of an ingestion: how report paths map to resources,
/// and which source files are tracked.
#[derive(Debug, Clone, Default)]
pub struct IngestContext {
    pub resolver: Resolver,
    pub index: SourceIndex,
}

/// What one ingestion did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Format the report was read as; `None` when there was no report.
    pub format: Option<Format>,
    /// Number of measures saved to the sink.
    pub measures: usize,
    /// Files or classes that could not be mapped to a tracked resource.
    pub skipped: usize,
}

/// Read the coverage report at `path`, detect its format (or use the
/// override), and push every measure it yields into `sink`.
///
/// A missing report is not an error: nothing is emitted and the summary is
/// empty. On a malformed report the measures saved before the failure stay in
/// the sink.
pub fn ingest(
    path: &Path,
    format_override: Option<Format>,
    ctx: &IngestContext,
    sink: &mut dyn MeasureSink,
) -> Result<IngestSummary> {
    if !path.is_file() {
        info!("Coverage report not found: {}", path.display());
        return Ok(IngestSummary::default());
    }

    let file = File::open(path).map_err(|e| CoverageError::from(e).in_report(path))?;
    let mut reader = BufReader::with_capacity(HEAD_LEN.max(8 * 1024), file);

    let format = match format_override {
        Some(format) => format,
        None => {
            let head = reader
                .fill_buf()
                .map_err(|e| CoverageError::from(e).in_report(path))?;
            detect_format(head).ok_or_else(|| CoverageError::UnknownFormat.in_report(path))?
        }
    };
    info!("Parsing {} report {}", format, path.display());

    let mut counting = CountingSink::new(sink);
    let extraction = parser_for(format)
        .extract(&mut reader, ctx, &mut counting)
        .map_err(|e| e.in_report(path))?;

    let summary = IngestSummary {
        format: Some(format),
        measures: counting.saved,
        skipped: extraction.skipped,
    };
    if summary.measures == 0 {
        warn!(
            "No coverage measures found in {} ({} unresolved)",
            path.display(),
            summary.skipped
        );
    } else {
        debug!(
            "{} measures from {}, {} unresolved",
            summary.measures,
            path.display(),
            summary.skipped
        );
    }
    Ok(summary)
}
