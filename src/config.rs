//! Ingestion settings loaded from a TOML file.
//!
//! ```toml
//! extension = "groovy"
//! source_roots = ["/work/src/main/groovy"]
//! search_paths = ["src/main/groovy"]
//! tracked_files = ["/work/src/main/groovy/org/acme/Foo.groovy"]
//! inclusions = ["org/acme/**"]
//! exclusions = ["**/*Test"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};
use crate::index::SourceIndex;
use crate::ingest::IngestContext;
use crate::resource::{Resolver, DEFAULT_EXTENSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source file extension, without the dot
    pub extension: String,

    /// Absolute directories that tracked source paths are relative to
    pub source_roots: Vec<String>,

    /// Extra prefixes tried when a report path does not match a tracked file
    pub search_paths: Vec<String>,

    /// Source files known to the host (absolute, or relative to a source root)
    pub tracked_files: Vec<String>,

    /// Only files matching one of these patterns get measures
    pub inclusions: Vec<String>,

    /// Files matching any of these patterns get no measures
    pub exclusions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            source_roots: vec![],
            search_paths: vec![],
            tracked_files: vec![],
            inclusions: vec![],
            exclusions: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoverageError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| CoverageError::Config(e.to_string()))
    }

    /// Resolver for this configuration. Fails on an invalid pattern.
    pub fn resolver(&self) -> Result<Resolver> {
        let extension = self.extension.trim();
        if extension.trim_start_matches('.').is_empty() {
            return Err(CoverageError::Config("extension must not be empty".to_string()));
        }
        Resolver::new(extension)
            .with_source_roots(self.source_roots.clone())
            .with_search_paths(self.search_paths.clone())
            .with_inclusions(&self.inclusions)?
            .with_exclusions(&self.exclusions)
    }

    /// Index of the tracked files, filtered through `resolver`.
    pub fn index(&self, resolver: &Resolver) -> SourceIndex {
        SourceIndex::build(&self.tracked_files, resolver)
    }

    pub fn context(&self) -> Result<IngestContext> {
        let resolver = self.resolver()?;
        let index = self.index(&resolver);
        Ok(IngestContext { resolver, index })
    }
}
