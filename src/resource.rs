//! Resources that measures attach to, and the rules that derive them from
//! raw report paths and class names.

use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::error::Result;
use crate::wildcard::WildcardPattern;

/// Display name of the unnamed package.
pub const DEFAULT_PACKAGE: &str = "[default]";

/// Source extension assumed when none is configured.
pub const DEFAULT_EXTENSION: &str = "groovy";

/// A project, a package (directory) or a file.
///
/// Package paths are `/`-separated; the empty path is the default package.
/// Two resources are equal when their [`Resource::key`]s are equal.
#[derive(Debug, Clone)]
pub enum Resource {
    Project,
    Package(String),
    File { package: String, name: String },
}

impl Resource {
    /// Package from a dotted package name (`org.acme` -> `org/acme`).
    pub fn package(name: &str) -> Self {
        Resource::Package(clean_package(&name.replace('.', "/")))
    }

    /// File `name` inside the package at `package_path` (already `/`-separated).
    pub fn file(package_path: &str, name: &str) -> Self {
        Resource::File {
            package: clean_package(package_path),
            name: name.trim().to_string(),
        }
    }

    /// File at a relative path, keeping the file name as is
    /// (`org/acme/Foo.groovy` -> package `org/acme`, name `Foo.groovy`).
    pub fn file_at(relative_path: &str) -> Self {
        let path = normalize_path(relative_path);
        match path.rsplit_once('/') {
            Some((dir, name)) => Resource::file(dir, name),
            None => Resource::file("", &path),
        }
    }

    /// Class-style resource from a path relative to a source root: the
    /// directory becomes the package and the extension is dropped
    /// (`org/acme/Foo.groovy` -> `org.acme.Foo`). Returns `None` when the path
    /// has no file name.
    pub fn from_relative_path(relative_path: &str) -> Option<Self> {
        let path = normalize_path(relative_path);
        let (package, file_name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path.as_str()),
        };
        let class_name = strip_extension(file_name).trim();
        if class_name.is_empty() {
            return None;
        }
        Some(Resource::file(package, class_name))
    }

    /// Canonical key string.
    pub fn key(&self) -> String {
        match self {
            Resource::Project => "<project>".to_string(),
            Resource::Package(path) if path.is_empty() => DEFAULT_PACKAGE.to_string(),
            Resource::Package(path) => path.clone(),
            Resource::File { package, name } if package.is_empty() => name.clone(),
            Resource::File { package, name } => format!("{package}/{name}"),
        }
    }

    /// Dot-joined class form used for pattern matching
    /// (`org/acme/Foo.groovy` -> `org.acme.Foo`).
    pub fn qualified_name(&self) -> String {
        let dotted = |path: &str| {
            if path.is_empty() {
                DEFAULT_PACKAGE.to_string()
            } else {
                path.replace('/', ".")
            }
        };
        match self {
            Resource::Project => String::new(),
            Resource::Package(path) => dotted(path),
            Resource::File { package, name } => {
                format!("{}.{}", dotted(package), strip_extension(name))
            }
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Resource::File { .. })
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.key() == other.key()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        self.key().hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn clean_package(path: &str) -> String {
    let path = normalize_path(path.trim());
    let path = path.trim_matches('/');
    if path == DEFAULT_PACKAGE {
        String::new()
    } else {
        path.to_string()
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Replace Windows separators with `/`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether a (normalized) path is absolute in either convention.
pub fn is_absolute(path: &str) -> bool {
    let path = normalize_path(path);
    let bytes = path.as_bytes();
    path.starts_with('/')
        || (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/')
}

/// The file name at the end of `path`, whichever separator it uses.
/// Bare names come back unchanged; blank names are unresolvable.
pub fn class_name_from_path(path: Option<&str>) -> Option<String> {
    let path = normalize_path(path?);
    let name = match path.rsplit_once('/') {
        Some((_, name)) => name,
        None => path.as_str(),
    };
    if name.trim().is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Path of `path` relative to the first source root that contains it.
/// `None` when the file lies outside every root.
pub fn relativize(path: &str, source_roots: &[String]) -> Option<String> {
    let path = normalize_path(path);
    source_roots.iter().find_map(|root| {
        let root = normalize_path(root);
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            return None;
        }
        let rest = path.strip_prefix(root)?.strip_prefix('/')?;
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    })
}

/// Pattern compiled for matching against [`Resource::qualified_name`].
fn resource_pattern(pattern: &str) -> Result<WildcardPattern> {
    let mut pattern = pattern.trim().to_string();
    let tail = pattern.rsplit_once('/').map_or("", |(_, tail)| tail);
    if !tail.contains('.') {
        pattern.push_str(".*");
    }
    WildcardPattern::compile(&pattern, '.')
}

fn matchable_key(resource: &Resource, extension: &str) -> String {
    let mut key = resource.qualified_name();
    let suffix = format!(".{extension}");
    if !key.ends_with(&suffix) {
        key.push_str(&suffix);
    }
    key
}

/// Match a resource against an ANT-style pattern where both `/` and `.`
/// separate path segments (`org/acme/*` and `org.acme.*` select the same
/// classes).
pub fn matches_pattern(resource: &Resource, pattern: &str, extension: &str) -> Result<bool> {
    Ok(resource_pattern(pattern)?.matches(&matchable_key(resource, extension)))
}

/// Static inputs for turning report paths into tracked resources: source
/// roots, extra search paths, the source extension and include/exclude
/// patterns.
#[derive(Debug, Clone)]
pub struct Resolver {
    source_roots: Vec<String>,
    search_paths: Vec<String>,
    extension: String,
    inclusions: Vec<WildcardPattern>,
    exclusions: Vec<WildcardPattern>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl Resolver {
    pub fn new(extension: &str) -> Self {
        Self {
            source_roots: Vec::new(),
            search_paths: Vec::new(),
            extension: extension.trim_start_matches('.').to_string(),
            inclusions: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    pub fn with_source_roots(mut self, roots: Vec<String>) -> Self {
        self.source_roots = roots;
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<String>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_inclusions<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.inclusions = patterns
            .iter()
            .map(|p| resource_pattern(p.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn with_exclusions<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.exclusions = patterns
            .iter()
            .map(|p| resource_pattern(p.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn source_roots(&self) -> &[String] {
        &self.source_roots
    }

    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Relative path of a source file, or `None` when it does not carry the
    /// source extension or lies outside every source root. Relative input is
    /// taken as already relative.
    pub fn relative_source_path(&self, path: &str) -> Option<String> {
        let normalized = normalize_path(path.trim());
        let suffix = format!(".{}", self.extension.to_ascii_lowercase());
        if !normalized.to_ascii_lowercase().ends_with(&suffix) {
            return None;
        }
        if is_absolute(&normalized) {
            relativize(&normalized, &self.source_roots)
        } else {
            Some(normalized.trim_start_matches("./").to_string())
        }
    }

    /// Class-style resource for a source file given by absolute path.
    pub fn from_absolute_path(&self, path: &str) -> Option<Resource> {
        let relative = self.relative_source_path(path)?;
        Resource::from_relative_path(&relative)
    }

    /// Whether measures for `resource` should be kept. Only files are ever
    /// filtered.
    pub fn is_included(&self, resource: &Resource) -> bool {
        if !resource.is_file() {
            return true;
        }
        let key = matchable_key(resource, &self.extension);
        let included =
            self.inclusions.is_empty() || self.inclusions.iter().any(|p| p.matches(&key));
        let excluded = self.exclusions.iter().any(|p| p.matches(&key));
        if !included || excluded {
            debug!("Resource {resource} filtered out by inclusion/exclusion patterns");
        }
        included && !excluded
    }
}
