//! Call-site resolution for failed checks.
//!
//! Every public check entry point is `#[track_caller]`, so the
//! [`Location`] handed to a resolver is always the test author's call site.
//! The resolver turns it into a [`CallSite`]: a project-relative path, the
//! line, and the source text of that line.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

static SHARED: Lazy<Arc<SourceCallSiteResolver>> =
    Lazy::new(|| Arc::new(SourceCallSiteResolver::from_env()));

/// What the check primitive knows about its caller.
#[derive(Debug, Clone, Copy)]
pub struct CheckSite<'a> {
    pub location: &'a Location<'a>,
    /// Stringified condition, when called through `assume!`.
    pub expression: Option<&'a str>,
    /// Enclosing function path, when called through `assume!`.
    pub function: Option<&'a str>,
}

impl<'a> CheckSite<'a> {
    pub fn new(location: &'a Location<'a>) -> Self {
        Self {
            location,
            expression: None,
            function: None,
        }
    }
}

/// A resolved call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: Option<String>,
    /// The full source line, if the file could be read.
    pub source_line: Option<String>,
}

/// Turns a caller location into file, line and source text.
pub trait CallSiteResolver: Send + Sync {
    fn resolve(&self, site: &CheckSite<'_>) -> CallSite;
}

/// Resolver that reads source files from disk.
///
/// Paths reported by `#[track_caller]` are relative to the package or
/// workspace root the code was compiled from, so lookups try the configured
/// root and then each of its ancestors. File contents are cached.
#[derive(Debug)]
pub struct SourceCallSiteResolver {
    roots: Vec<PathBuf>,
    cache: Mutex<HashMap<PathBuf, Option<Arc<Vec<String>>>>>,
}

impl SourceCallSiteResolver {
    /// Resolve relative to `root` and its ancestors.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            roots: root.ancestors().map(Path::to_path_buf).collect(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve relative to `CARGO_MANIFEST_DIR`, or the working directory
    /// when cargo did not set it.
    pub fn from_env() -> Self {
        let root = std::env::var_os("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        Self::new(root)
    }

    /// Process-wide resolver shared by every wrapper that was not given one.
    pub fn shared() -> Arc<SourceCallSiteResolver> {
        Arc::clone(&SHARED)
    }

    fn relative_path(&self, file: &str) -> String {
        let path = Path::new(file);
        if path.is_absolute() {
            for root in &self.roots {
                if root.as_os_str().is_empty() {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(root) {
                    return relative.display().to_string();
                }
            }
        }
        file.to_string()
    }

    fn source_line(&self, file: &str, line: u32) -> Option<String> {
        let lines = self.lines(file)?;
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        lines.get(index).cloned()
    }

    fn lines(&self, file: &str) -> Option<Arc<Vec<String>>> {
        let path = Path::new(file);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(path.to_path_buf())
            .or_insert_with(|| self.read_lines(path))
            .clone()
    }

    fn read_lines(&self, path: &Path) -> Option<Arc<Vec<String>>> {
        let candidates: Vec<PathBuf> = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            self.roots.iter().map(|root| root.join(path)).collect()
        };

        let content = candidates
            .iter()
            .find_map(|candidate| fs::read_to_string(candidate).ok());
        if content.is_none() {
            tracing::debug!(file = %path.display(), "source file not found for call site");
        }
        content.map(|text| Arc::new(text.lines().map(str::to_string).collect()))
    }
}

impl CallSiteResolver for SourceCallSiteResolver {
    fn resolve(&self, site: &CheckSite<'_>) -> CallSite {
        let file = site.location.file();
        CallSite {
            file: self.relative_path(file),
            line: site.location.line(),
            column: site.location.column(),
            function: site.function.map(str::to_string),
            source_line: self.source_line(file, site.location.line()),
        }
    }
}
