/// Auto-detection of coverage report formats.
///
/// All supported dialects are XML, so detection peeks at the head of the
/// document:
///   1. `<coverage` carrying a `clover=` attribute is Clover
///   2. `<report` is JaCoCo
///   3. any other `<coverage` is Cobertura
///
/// An explicit `--format` override is handled by the caller.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{CoverageError, Result};

/// Number of leading bytes inspected by [`detect_format`].
pub const HEAD_LEN: usize = 4096;

/// Supported coverage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Clover,
    Jacoco,
    Cobertura,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Clover, Format::Jacoco, Format::Cobertura];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Clover => "clover",
            Format::Jacoco => "jacoco",
            Format::Cobertura => "cobertura",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = CoverageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clover" => Ok(Format::Clover),
            "jacoco" => Ok(Format::Jacoco),
            "cobertura" => Ok(Format::Cobertura),
            _ => Err(CoverageError::Config(format!(
                "Unknown format: '{}'. Supported: clover, jacoco, cobertura",
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

/// Detect the report format from the first bytes of its content.
pub fn detect_format(content: &[u8]) -> Option<Format> {
    // We only need to look at the first few KB
    let head_len = content.len().min(HEAD_LEN);
    let head = String::from_utf8_lossy(&content[..head_len]);

    if !head.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
        return None;
    }

    let coverage = head.contains("<coverage");
    if coverage && head.contains("clover=") {
        return Some(Format::Clover);
    }
    if head.contains("<report") {
        return Some(Format::Jacoco);
    }
    if coverage {
        return Some(Format::Cobertura);
    }
    None
}

/// Detect the format of the report at `path`.
pub fn detect_file(path: &Path) -> Result<Option<Format>> {
    if !path.is_file() {
        return Err(CoverageError::ReportNotFound(path.display().to_string()));
    }
    let mut head = Vec::with_capacity(HEAD_LEN);
    File::open(path)?
        .take(HEAD_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(detect_format(&head))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_clover() {
        let content = b"<?xml version=\"1.0\"?>\n<coverage generated=\"1\" clover=\"4.4.1\">";
        assert_eq!(detect_format(content), Some(Format::Clover));
    }

    #[test]
    fn test_detect_jacoco() {
        let content = b"<?xml version=\"1.0\"?><!DOCTYPE report PUBLIC \"-//JACOCO//DTD Report 1.1//EN\" \"report.dtd\"><report name=\"x\">";
        assert_eq!(detect_format(content), Some(Format::Jacoco));
    }

    #[test]
    fn test_detect_cobertura() {
        let content = b"<?xml version=\"1.0\"?>\n<coverage version=\"1.0\" line-rate=\"0.5\">";
        assert_eq!(detect_format(content), Some(Format::Cobertura));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_format(b"hello world"), None);
        assert_eq!(detect_format(b"TN:\nSF:/a.rs\n<coverage"), None);
        assert_eq!(detect_format(b"<html><body/></html>"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn test_detect_only_reads_head() {
        let mut content = b"<?xml version=\"1.0\"?>\n<!--".to_vec();
        content.extend(std::iter::repeat(b' ').take(HEAD_LEN));
        content.extend_from_slice(b"--><coverage clover=\"1\"/>");
        assert_eq!(detect_format(&content), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("Clover".parse::<Format>().unwrap(), Format::Clover);
        assert_eq!("JACOCO".parse::<Format>().unwrap(), Format::Jacoco);
        assert_eq!(" cobertura ".parse::<Format>().unwrap(), Format::Cobertura);
        let err = "lcov".parse::<Format>().unwrap_err();
        assert!(err.to_string().contains("lcov"), "{err}");
        for format in Format::ALL {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn test_detect_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jacoco.xml");
        std::fs::write(&path, "<report name=\"r\"/>").unwrap();
        assert_eq!(detect_file(&path).unwrap(), Some(Format::Jacoco));

        let missing = dir.path().join("missing.xml");
        assert!(matches!(
            detect_file(&missing),
            Err(CoverageError::ReportNotFound(_))
        ));
    }
}
