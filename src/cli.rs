//! Command handler functions for the covmeasure CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::detect::{detect_file, Format};
use crate::ingest::{ingest, IngestSummary};
use crate::model::{Measure, MeasureLog};

/// Settings given on the command line. List values extend the config file's,
/// scalar values replace them.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_roots: Vec<String>,
    pub search_paths: Vec<String>,
    pub tracked_files: Option<PathBuf>,
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
    pub extension: Option<String>,
}

/// Load the config file (if any) and apply the command-line overrides.
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    config.source_roots.extend(overrides.source_roots);
    config.search_paths.extend(overrides.search_paths);
    config.inclusions.extend(overrides.inclusions);
    config.exclusions.extend(overrides.exclusions);
    if let Some(extension) = overrides.extension {
        config.extension = extension;
    }
    if let Some(list) = overrides.tracked_files {
        config.tracked_files.extend(read_tracked_files(&list)?);
    }
    Ok(config)
}

/// Read a tracked-file list: one path per line, blank lines and `#` comments
/// ignored.
pub fn read_tracked_files(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracked-file list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[derive(Serialize)]
struct IngestOutput<'a> {
    report: String,
    summary: IngestSummary,
    measures: &'a [Measure],
}

pub fn cmd_ingest(
    report: &Path,
    format: Option<&str>,
    config: &Config,
    json: bool,
) -> Result<String> {
    let format = format.map(str::parse::<Format>).transpose()?;
    let ctx = config.context().context("Invalid configuration")?;

    let mut log = MeasureLog::new();
    let summary = ingest(report, format, &ctx, &mut log)?;

    if json {
        let output = IngestOutput {
            report: report.display().to_string(),
            summary,
            measures: &log.measures,
        };
        let mut out = serde_json::to_string_pretty(&output)?;
        out.push('\n');
        return Ok(out);
    }

    let Some(format) = summary.format else {
        return Ok(format!("No coverage report at {}\n", report.display()));
    };
    let mut out = String::new();
    writeln!(
        out,
        "Ingested {} as format '{}': {} measures, {} unresolved",
        report.display(),
        format,
        summary.measures,
        summary.skipped
    )?;
    if log.is_empty() {
        return Ok(out);
    }
    writeln!(out)?;
    writeln!(out, "{:<50} {:<28} VALUE", "RESOURCE", "METRIC")?;
    writeln!(out, "{}", "-".repeat(88))?;
    for measure in &log.measures {
        writeln!(
            out,
            "{:<50} {:<28} {}",
            measure.resource.key(),
            measure.metric,
            measure.value
        )?;
    }
    Ok(out)
}

pub fn cmd_detect(report: &Path) -> Result<String> {
    let format = detect_file(report)?;
    Ok(match format {
        Some(format) => format!("{}: {}\n", report.display(), format),
        None => format!("{}: unknown format\n", report.display()),
    })
}
