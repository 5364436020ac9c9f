//! Error types for document loading and configuration resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading documents and resolving configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// An included document was absent from every search-path directory.
    #[error("{name} not found in: {search_path:?}")]
    IncludeNotFound {
        name: String,
        search_path: Vec<PathBuf>,
    },

    /// An include chain revisited a file it is still expanding.
    #[error("include cycle detected while expanding {0}")]
    CyclicInclude(PathBuf),

    /// A dotted path resolved neither by nested traversal nor as a flat key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A directive entry expected "name value" but had no whitespace separator.
    #[error("malformed directive entry (expected \"name value\"): {0:?}")]
    MalformedReference(String),

    /// Variable substitution stopped making progress while unresolved
    /// patterns remain, or exceeded the pass cap.
    #[error("cyclic variable reference involving {{{{{0}}}}}")]
    CyclicReference(String),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("map literal parse error: {0}")]
    MapLiteral(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
