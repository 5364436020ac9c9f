//! Package-definition document loading.
//!
//! Documents are plain YAML with two extensions layered on top:
//! - a line-level `!include <name>` directive expanded before parsing, and
//! - package-over-defaults merging of multi-document files.
//!
//! ## Environment Variables
//! - `YAML2RPM_INC` - colon-separated extra directories searched for includes

mod include;
mod merge;

pub use include::{INCLUDE_PATH_VAR, IncludeMap, Includer};
pub use merge::{combine, merge_documents};

use crate::error::Result;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Load a physical document, expand its includes, and parse every top-level
/// YAML document it contains.
pub fn load_documents(includer: &Includer, path: &Path) -> Result<Vec<Value>> {
    let text = includer.expand(path)?;
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&text) {
        docs.push(Value::deserialize(document)?);
    }
    Ok(docs)
}

/// Load a document and merge its top-level structures into one mapping.
pub fn load_mapping(includer: &Includer, path: &Path) -> Result<Mapping> {
    Ok(merge_documents(load_documents(includer, path)?))
}
