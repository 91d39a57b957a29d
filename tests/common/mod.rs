#![allow(dead_code)]

use std::path::PathBuf;

use covmeasure::index::SourceIndex;
use covmeasure::ingest::IngestContext;
use covmeasure::resource::Resolver;
use tempfile::TempDir;

/// Context with the default resolver and the given tracked files (relative
/// to a source root).
pub fn context(tracked: &[&str]) -> IngestContext {
    IngestContext {
        resolver: Resolver::default(),
        index: SourceIndex::from_relative_paths(tracked.iter().copied()),
    }
}

/// Write `content` to `name` inside a fresh temporary directory. The caller
/// must hold onto `TempDir` to keep the file alive.
pub fn write_report(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
