//! Dotted-path lookup and sequence flattening over YAML values.

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};

/// Collapse an arbitrarily nested sequence into one sequence of scalars.
///
/// Returns `None` for anything that is not a sequence. Scalar elements keep
/// their encounter order and come first; nested sequences are expanded after
/// them. Downstream separator joins depend on this ordering, so it must not
/// be "fixed" to interleave.
pub fn flatten(value: &Value) -> Option<Vec<Value>> {
    let Value::Sequence(items) = value else {
        return None;
    };

    let mut scalars = Vec::new();
    let mut nested = Vec::new();
    for item in items {
        match item {
            Value::Sequence(inner) => nested.extend(inner.iter().cloned()),
            other => scalars.push(other.clone()),
        }
    }
    if !nested.is_empty() {
        scalars.extend(flatten(&Value::Sequence(nested)).unwrap_or_default());
    }
    Some(scalars)
}

/// Resolve a dotted path against a mapping.
///
/// Components are traversed through nested mappings; if traversal fails at
/// any point, one flat lookup of the literal path is tried instead, so keys
/// that legitimately contain dots still resolve. Sequence results come back
/// flattened.
pub fn lookup(path: &str, root: &Mapping) -> Result<Value> {
    let found = lookup_nested(path, root)
        .or_else(|| root.get(path))
        .ok_or_else(|| Error::KeyNotFound(path.to_string()))?;
    match flatten(found) {
        Some(items) => Ok(Value::Sequence(items)),
        None => Ok(found.clone()),
    }
}

fn lookup_nested<'a>(path: &str, root: &'a Mapping) -> Option<&'a Value> {
    let mut components = path.split('.');
    let mut current = root.get(components.next()?)?;
    for component in components {
        match current {
            Value::Mapping(map) => current = map.get(component)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Render a resolved value as text.
///
/// Sequences are joined with `list_sep` (a single space when none is given);
/// null renders as the literal `None` sentinel, which the resolver layer
/// later normalizes to empty text.
pub fn stringify(value: &Value, list_sep: Option<&str>) -> String {
    match value {
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(scalar_text).collect();
            parts.join(list_sep.unwrap_or(" "))
        }
        other => scalar_text(other),
    }
}

/// Text form of a single scalar value.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        // Structured values have no single text form; fall back to their
        // YAML rendering.
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn flatten_rejects_non_sequences() {
        assert!(flatten(&Value::from("scalar")).is_none());
        assert!(flatten(&Value::Null).is_none());
    }

    #[test]
    fn flatten_is_identity_on_flat_sequences() {
        let value: Value = serde_yaml::from_str("[1, 2, 3]").unwrap();
        let flat = flatten(&value).unwrap();
        assert_eq!(flat, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[test]
    fn flatten_orders_scalars_before_expansions() {
        // [[1,2],[3,[4,5]]] -> [1,2,3,4,5]
        let value: Value = serde_yaml::from_str("[[1, 2], [3, [4, 5]]]").unwrap();
        let flat = flatten(&value).unwrap();
        let nums: Vec<i64> = flat.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(nums, vec![1, 2, 3, 4, 5]);

        // Scalars come first even when a nested group precedes them.
        let value: Value = serde_yaml::from_str("[[1, 2], 3]").unwrap();
        let flat = flatten(&value).unwrap();
        let nums: Vec<i64> = flat.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(nums, vec![3, 1, 2]);
    }

    #[test]
    fn flatten_of_empty_sequence_is_empty() {
        let value: Value = serde_yaml::from_str("[]").unwrap();
        assert_eq!(flatten(&value).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn dotted_traversal_matches_manual_indexing() {
        let root = mapping("build:\n  configure: ./configure\n  args:\n    extra: --static");
        assert_eq!(
            lookup("build.configure", &root).unwrap(),
            Value::from("./configure")
        );
        assert_eq!(
            lookup("build.args.extra", &root).unwrap(),
            Value::from("--static")
        );
    }

    #[test]
    fn flat_key_fallback_resolves_literal_dotted_keys() {
        let root = mapping("\"module.path\": /opt/modulefiles");
        assert_eq!(
            lookup("module.path", &root).unwrap(),
            Value::from("/opt/modulefiles")
        );
    }

    #[test]
    fn missing_path_is_key_not_found() {
        let root = mapping("name: foo");
        let err = lookup("build.configure", &root).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(path) if path == "build.configure"));
    }

    #[test]
    fn sequence_results_come_back_flattened() {
        let root = mapping("requires: [[gcc, make], cmake]");
        let value = lookup("requires", &root).unwrap();
        assert_eq!(stringify(&value, Some(" ")), "cmake gcc make");
    }

    #[test]
    fn stringify_renders_sentinels() {
        assert_eq!(scalar_text(&Value::Null), "None");
        assert_eq!(scalar_text(&Value::Bool(true)), "True");
        assert_eq!(scalar_text(&Value::from(42)), "42");
    }
}
