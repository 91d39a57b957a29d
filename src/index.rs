//! Index of tracked source files, keyed by their `/`-separated path relative
//! to a source root. The host supplies the file list; nothing here touches the
//! filesystem.

use std::collections::BTreeSet;

use tracing::debug;

use crate::resource::{normalize_path, Resource, Resolver};

#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    files: BTreeSet<String>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index paths that are already relative to a source root.
    pub fn from_relative_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    /// Index the host's tracked files. Absolute paths are made relative to the
    /// resolver's source roots; files without the source extension, outside
    /// every root, or rejected by the resolver's patterns are left out.
    pub fn build<I, S>(paths: I, resolver: &Resolver) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for path in paths {
            let path = path.as_ref();
            let Some(relative) = resolver.relative_source_path(path) else {
                debug!("Not a tracked source file: {path}");
                continue;
            };
            let included = Resource::from_relative_path(&relative)
                .is_some_and(|resource| resolver.is_included(&resource));
            if included {
                index.insert(&relative);
            }
        }
        index
    }

    pub fn insert(&mut self, relative_path: &str) {
        let path = normalize_path(relative_path.trim());
        let path = path.trim_start_matches("./").trim_start_matches('/');
        if !path.is_empty() {
            self.files.insert(path.to_string());
        }
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains(&normalize_path(relative_path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Find the tracked file for a report-relative `key`.
    ///
    /// Tries, in order: the key itself, the key under each search path, and
    /// finally the single tracked file whose path ends with `/key`. An
    /// ambiguous suffix match resolves to nothing.
    pub fn lookup(&self, key: &str, search_paths: &[String]) -> Option<&str> {
        let key = normalize_path(key);
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return None;
        }

        if let Some(found) = self.files.get(key) {
            return Some(found.as_str());
        }

        for search_path in search_paths {
            let base = normalize_path(search_path);
            let base = base.trim_matches('/');
            if base.is_empty() {
                continue;
            }
            if let Some(found) = self.files.get(&format!("{base}/{key}")) {
                return Some(found.as_str());
            }
        }

        let suffix = format!("/{key}");
        let mut candidates = self.files.iter().filter(|f| f.ends_with(&suffix));
        match (candidates.next(), candidates.next()) {
            (Some(found), None) => Some(found.as_str()),
            (Some(_), Some(_)) => {
                debug!("Ambiguous source file for {key}");
                None
            }
            _ => None,
        }
    }
}
