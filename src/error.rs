use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Malformed report: {0}")]
    Malformed(String),

    #[error("Unknown coverage format")]
    UnknownFormat,

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{}: {}", .path.display(), .source)]
    Report {
        path: PathBuf,
        #[source]
        source: Box<CoverageError>,
    },
}

impl CoverageError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CoverageError::Malformed(msg.into())
    }

    /// Attach the report path to an extraction error.
    pub(crate) fn in_report(self, path: impl Into<PathBuf>) -> Self {
        CoverageError::Report {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
