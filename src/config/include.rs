//! Recursive `!include` expansion for YAML package definitions.
//!
//! Include directives are expanded line-wise before the YAML parser ever sees
//! the document, so an included file behaves exactly as if its content had
//! been written at the inclusion point. Nesting is unbounded; a file that is
//! revisited while it is still being expanded is a hard error.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable with a colon-separated list of extra directories to
/// search for included documents.
pub const INCLUDE_PATH_VAR: &str = "YAML2RPM_INC";

/// Redirects a requested include-file name to an alternate name before the
/// search path is consulted. Used for test and site overrides of otherwise
/// fixed include references.
#[derive(Debug, Clone, Default)]
pub struct IncludeMap {
    map: HashMap<String, String>,
}

impl IncludeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized mapping literal, e.g. `{"compiler.yaml": "gcc.yaml"}`.
    pub fn from_json(literal: &str) -> Result<Self> {
        let map: HashMap<String, String> = serde_json::from_str(literal)?;
        Ok(Self { map })
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.map.insert(from.into(), to.into());
    }

    /// Rewrite `name` if a remapping exists, otherwise return it unchanged.
    pub fn remap<'a>(&'a self, name: &'a str) -> &'a str {
        self.map.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Expands include directives against a search path.
///
/// The search path for a directive is the including document's directory
/// followed by the directories named in [`INCLUDE_PATH_VAR`].
#[derive(Debug, Clone)]
pub struct Includer {
    extra_dirs: Vec<PathBuf>,
    map: IncludeMap,
}

impl Includer {
    /// Create an includer whose extra search directories come from the
    /// environment.
    pub fn new(map: IncludeMap) -> Self {
        let extra_dirs = std::env::var(INCLUDE_PATH_VAR)
            .map(|raw| {
                raw.split(':')
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        Self { extra_dirs, map }
    }

    /// Create an includer with an explicit list of extra search directories.
    pub fn with_dirs(map: IncludeMap, extra_dirs: Vec<PathBuf>) -> Self {
        Self { extra_dirs, map }
    }

    /// Read a document and expand every `!include` directive in place,
    /// recursively.
    pub fn expand(&self, path: &Path) -> Result<String> {
        let mut expanding = HashSet::new();
        self.expand_file(path, &mut expanding)
    }

    fn expand_file(&self, path: &Path, expanding: &mut HashSet<PathBuf>) -> Result<String> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !expanding.insert(canonical.clone()) {
            return Err(Error::CyclicInclude(canonical));
        }

        let text = std::fs::read_to_string(path)?;
        let root = parent_dir(path);
        let mut out = String::new();
        for line in text.lines() {
            if let Some(name) = include_directive(line) {
                let resolved = self.find(&root, name)?;
                debug!(directive = name, file = %resolved.display(), "expanding include");
                out.push_str(&self.expand_file(&resolved, expanding)?);
            } else {
                out.push_str(line);
                out.push('\n');
            }
        }

        // The same file may be included again by a sibling; only revisits
        // within one active chain are cyclic.
        expanding.remove(&canonical);
        Ok(out)
    }

    /// Directories searched for an include requested by a document in `root`.
    fn search_path(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs = vec![root.to_path_buf()];
        dirs.extend(self.extra_dirs.iter().cloned());
        dirs
    }

    fn find(&self, root: &Path, name: &str) -> Result<PathBuf> {
        let name = self.map.remap(name);
        let dirs = self.search_path(root);
        for dir in &dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(Error::IncludeNotFound {
            name: name.to_string(),
            search_path: dirs,
        })
    }
}

/// Parse a `!include <name>` directive line, returning the requested name.
fn include_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("!include")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    rest.split_whitespace().next()
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
