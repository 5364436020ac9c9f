//! Document merging with package-over-defaults precedence.
//!
//! Keys are overwritten whole; there is no field-by-field deep merge. A key
//! present in both the defaults set and the package set always reflects the
//! package value after [`combine`].

use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Merge parsed YAML documents into a single mapping.
///
/// Documents are processed in order and later documents win for identical
/// keys. A document that is itself a sequence of mappings contributes its
/// first element; empty documents are skipped.
pub fn merge_documents(docs: Vec<Value>) -> Mapping {
    let mut merged = Mapping::new();
    for doc in docs {
        let doc = match doc {
            Value::Sequence(seq) => match seq.into_iter().next() {
                Some(first) => first,
                None => continue,
            },
            other => other,
        };
        match doc {
            Value::Mapping(map) => {
                for (key, value) in map {
                    merged.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                warn!(?other, "ignoring non-mapping document");
            }
        }
    }
    merged
}

/// Combine the site-defaults mapping and the package mapping.
///
/// If only one side is present it is used as-is; when both are present the
/// result starts from the defaults and every package key overwrites.
pub fn combine(defaults: Option<Mapping>, package: Option<Mapping>) -> Mapping {
    match (defaults, package) {
        (Some(defaults), Some(package)) => {
            let mut combo = defaults;
            for (key, value) in package {
                combo.insert(key, value);
            }
            combo
        }
        (Some(defaults), None) => defaults,
        (None, Some(package)) => package,
        (None, None) => Mapping::new(),
    }
}
