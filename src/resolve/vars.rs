//! Fixed-point template-variable resolution.
//!
//! Values anywhere in the merged configuration may reference other keys with
//! `{{ dotted.path }}` patterns. [`Resolver::resolve_vars`] builds a binding
//! table from every distinct pattern and re-substitutes until no binding
//! contains an unresolved pattern. A configuration whose reference graph is
//! cyclic fails with [`Error::CyclicReference`] instead of iterating forever.

use super::path::{flatten, lookup, scalar_text, stringify};
use crate::error::{Error, Result};
use regex_lite::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::debug;

/// Substitution passes allowed before a configuration is declared cyclic.
/// Mutually-referencing variables grow their bindings on every pass, so they
/// never reach the no-change exit on their own.
const MAX_PASSES: usize = 64;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{[A-Za-z0-9_. ]+\}\}").expect("valid pattern"))
}

/// The dotted path inside a `{{ ... }}` pattern occurrence.
fn pattern_path(pattern: &str) -> &str {
    pattern
        .trim_start_matches("{{")
        .trim_end_matches("}}")
        .trim()
}

/// Whether any string anywhere inside `value` contains a variable pattern.
fn has_vars(value: &Value) -> bool {
    match value {
        Value::String(s) => var_pattern().is_match(s),
        Value::Sequence(items) => items.iter().any(has_vars),
        Value::Mapping(map) => map.iter().any(|(k, v)| has_vars(k) || has_vars(v)),
        Value::Tagged(tagged) => has_vars(&tagged.value),
        _ => false,
    }
}

/// Collect the dotted path of every pattern occurring inside `value`.
fn collect_var_paths(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for found in var_pattern().find_iter(s) {
                out.insert(pattern_path(found.as_str()).to_string());
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_var_paths(item, out);
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                collect_var_paths(key, out);
                collect_var_paths(item, out);
            }
        }
        Value::Tagged(tagged) => collect_var_paths(&tagged.value, out),
        _ => {}
    }
}

/// Where nested patterns are resolved from during substitution.
#[derive(Clone, Copy)]
enum VarSource<'a> {
    /// The merged configuration; used while the binding table is being built.
    Combo(&'a Mapping),
    /// The finished binding table; used for lookups after resolution.
    Table(&'a BTreeMap<String, Value>),
}

/// The resolution engine: a merged configuration plus its variable binding
/// table. The table starts empty; call [`Resolver::resolve_vars`] once after
/// construction, then the resolver is read-only.
#[derive(Debug, Clone)]
pub struct Resolver {
    combo: Mapping,
    vars: BTreeMap<String, Value>,
}

impl Resolver {
    pub fn new(combo: Mapping) -> Self {
        Self {
            combo,
            vars: BTreeMap::new(),
        }
    }

    /// The merged configuration this resolver reads from.
    pub fn combo(&self) -> &Mapping {
        &self.combo
    }

    /// Resolve every template variable in the configuration to a fixed point.
    ///
    /// A variable referencing a path that exists nowhere in the merged
    /// configuration is fatal here, regardless of whether the key it appears
    /// under is ever looked up.
    pub fn resolve_vars(&mut self) -> Result<()> {
        // Every distinct pattern found anywhere in the configuration becomes
        // a pending binding, seeded with the raw value its path refers to.
        let mut paths = BTreeSet::new();
        for value in self.combo.values() {
            collect_var_paths(value, &mut paths);
        }
        let mut vars = BTreeMap::new();
        for path in paths {
            let seed = lookup(&path, &self.combo)?;
            vars.insert(path, seed);
        }
        debug!(bindings = vars.len(), "seeded variable table");

        let source_combo = self.combo.clone();
        for pass in 0..MAX_PASSES {
            let mut changed = false;
            let pending: Vec<String> = vars
                .iter()
                .filter(|(_, v)| has_vars(v))
                .map(|(k, _)| k.clone())
                .collect();
            for key in pending {
                let value = vars[&key].clone();
                let (next, did_change) =
                    self.substitute(&value, VarSource::Combo(&source_combo), None)?;
                if did_change {
                    vars.insert(key, next);
                    changed = true;
                }
            }
            if !changed {
                if let Some((key, _)) = vars.iter().find(|(_, v)| has_vars(v)) {
                    return Err(Error::CyclicReference(key.clone()));
                }
                debug!(passes = pass, "variable table reached fixed point");
                self.vars = vars;
                return Ok(());
            }
        }

        let offender = vars
            .iter()
            .find(|(_, v)| has_vars(v))
            .map(|(k, _)| k.clone())
            .unwrap_or_default();
        Err(Error::CyclicReference(offender))
    }

    /// Resolve a path and substitute variables, returning text. Empty-string
    /// normalization applies: a value that renders as the `None` sentinel
    /// becomes empty text so optional fields default to blank.
    pub fn r_lookup(&self, path: &str) -> Result<String> {
        self.r_lookup_with(path, None)
    }

    /// Like [`Resolver::r_lookup`] with a separator for sequence results.
    pub fn r_lookup_with(&self, path: &str, list_sep: Option<&str>) -> Result<String> {
        let rhs = lookup(path, &self.combo)?;
        let text = stringify(&rhs, list_sep);
        let (resolved, _) =
            self.substitute(&Value::String(text), VarSource::Table(&self.vars), None)?;
        let out = stringify(&resolved, list_sep);
        if out == "None" {
            Ok(String::new())
        } else {
            Ok(out)
        }
    }

    /// Resolve a path in raw mode: the native value, flattened if a sequence,
    /// without variable substitution. Callers substitute per element via
    /// [`Resolver::resolve_str`] or [`Resolver::resolve_entries`].
    pub fn r_lookup_raw(&self, path: &str) -> Result<Value> {
        lookup(path, &self.combo)
    }

    /// Substitute variable bindings into caller-supplied text.
    ///
    /// A variable whose binding is a sequence is joined with `list_sep`, or
    /// spliced and then space-joined when no separator is given.
    pub fn resolve_str(&self, text: &str, list_sep: Option<&str>) -> Result<String> {
        let (resolved, _) = self.substitute(
            &Value::String(text.to_string()),
            VarSource::Table(&self.vars),
            list_sep,
        )?;
        Ok(stringify(&resolved, list_sep))
    }

    /// Substitute variable bindings into one directive entry, splicing a
    /// sequence-valued variable into multiple entries.
    pub fn resolve_entries(&self, text: &str) -> Result<Vec<String>> {
        let (resolved, _) = self.substitute(
            &Value::String(text.to_string()),
            VarSource::Table(&self.vars),
            None,
        )?;
        match resolved {
            Value::Sequence(_) => {
                let items = flatten(&resolved).unwrap_or_default();
                Ok(items.iter().map(scalar_text).collect())
            }
            other => Ok(vec![scalar_text(&other)]),
        }
    }

    /// Look up a key whose value is a sequence of fragments, join the
    /// fragments with `join` into one token, and only then substitute the
    /// variables remaining inside it.
    pub fn lookup_and_resolve(
        &self,
        path: &str,
        join: &str,
        list_sep: Option<&str>,
    ) -> Result<String> {
        let elems = self.r_lookup_raw(path)?;
        let joined = match &elems {
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(scalar_text).collect();
                parts.join(join)
            }
            other => scalar_text(other),
        };
        self.resolve_str(&joined, list_sep)
    }

    /// One substitution step over a value. Returns the rewritten value and
    /// whether any substitution occurred.
    fn substitute(
        &self,
        value: &Value,
        source: VarSource<'_>,
        list_sep: Option<&str>,
    ) -> Result<(Value, bool)> {
        match value {
            Value::String(text) => self.substitute_text(text, source, list_sep),
            Value::Sequence(items) => {
                let mut out = Vec::new();
                let mut changed = false;
                for item in items {
                    let (next, did_change) = self.substitute(item, source, list_sep)?;
                    changed |= did_change;
                    match next {
                        // A string element that expanded into a sequence is
                        // spliced into the enclosing sequence.
                        Value::Sequence(elems) if matches!(item, Value::String(_)) => {
                            out.extend(elems);
                        }
                        next => out.push(next),
                    }
                }
                Ok((Value::Sequence(out), changed))
            }
            // Mappings must make progress too, or the no-change exit would
            // misread a resolvable mapping-valued binding as cyclic.
            Value::Mapping(map) => {
                let mut out = Mapping::new();
                let mut changed = false;
                for (key, item) in map {
                    let (next_key, key_changed) = self.substitute(key, source, list_sep)?;
                    let (next, did_change) = self.substitute(item, source, list_sep)?;
                    changed |= key_changed | did_change;
                    out.insert(next_key, next);
                }
                Ok((Value::Mapping(out), changed))
            }
            other => Ok((other.clone(), false)),
        }
    }

    fn substitute_text(
        &self,
        text: &str,
        source: VarSource<'_>,
        list_sep: Option<&str>,
    ) -> Result<(Value, bool)> {
        let patterns: Vec<String> = var_pattern()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        if patterns.is_empty() {
            return Ok((Value::String(text.to_string()), false));
        }

        let mut current = text.to_string();
        let mut changed = false;
        let mut spliced: Vec<Value> = Vec::new();
        let mut spliced_any = false;
        for pattern in &patterns {
            let expansion = self.lookup_var(pattern_path(pattern), source)?;
            match expansion {
                Value::Sequence(_) => {
                    // Resolve nested patterns inside the sequence first.
                    let (resolved, _) = self.substitute(&expansion, source, list_sep)?;
                    let items = flatten(&resolved).unwrap_or_default();
                    match list_sep {
                        Some(sep) => {
                            let parts: Vec<String> = items.iter().map(scalar_text).collect();
                            current = current.replace(pattern.as_str(), &parts.join(sep));
                            changed = true;
                        }
                        None => {
                            // Splicing expands the enclosing value into a
                            // sequence; surrounding text does not survive.
                            spliced.extend(items);
                            spliced_any = true;
                            changed = true;
                        }
                    }
                }
                scalar => {
                    let replacement = scalar_text(&scalar);
                    let next = current.replace(pattern.as_str(), &replacement);
                    if next != current {
                        current = next;
                        changed = true;
                    }
                }
            }
        }

        if spliced_any {
            Ok((Value::Sequence(spliced), true))
        } else {
            Ok((Value::String(current), changed))
        }
    }

    fn lookup_var(&self, path: &str, source: VarSource<'_>) -> Result<Value> {
        match source {
            VarSource::Combo(combo) => lookup(path, combo),
            VarSource::Table(table) => table
                .get(path)
                .cloned()
                .ok_or_else(|| Error::KeyNotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(yaml: &str) -> Resolver {
        let combo: Mapping = serde_yaml::from_str(yaml).unwrap();
        let mut resolver = Resolver::new(combo);
        resolver.resolve_vars().unwrap();
        resolver
    }

    #[test]
    fn scalar_substitution_reaches_fixed_point() {
        let r = resolver(
            "name: foo\nversion: \"2.0\"\ndescription: \"{{name}} pkg v{{version}}\"",
        );
        assert_eq!(r.r_lookup("description").unwrap(), "foo pkg v2.0");
    }

    #[test]
    fn chained_references_resolve_transitively() {
        let r = resolver(
            "root: /opt\nprefix: \"{{root}}/foo\"\nbindir: \"{{prefix}}/bin\"",
        );
        assert_eq!(r.r_lookup("bindir").unwrap(), "/opt/foo/bin");
    }

    #[test]
    fn dotted_variables_traverse_nested_mappings() {
        let r = resolver(
            "build:\n  target: install\ncommand: \"make {{build.target}}\"",
        );
        assert_eq!(r.r_lookup("command").unwrap(), "make install");
    }

    #[test]
    fn sequence_variable_joins_with_separator() {
        let r = resolver("mods: [gcc, mpi]\nuses: \"module load {{mods}}\"");
        assert_eq!(r.resolve_str("module load {{mods}}", Some(" ")).unwrap(), "module load gcc mpi");
    }

    #[test]
    fn sequence_variable_splices_without_separator() {
        let r = resolver("mods: [gcc, mpi]\nuses: \"{{mods}}\"");
        let entries = r.resolve_entries("{{mods}}").unwrap();
        assert_eq!(entries, vec!["gcc".to_string(), "mpi".to_string()]);
    }

    #[test]
    fn mapping_valued_bindings_resolve_through_their_values() {
        let r = resolver(
            "build:\n  cmd: \"make {{target}}\"\ntarget: install\nx: \"{{build}}\"",
        );
        assert_eq!(r.r_lookup("build.cmd").unwrap(), "make install");
    }

    #[test]
    fn patterns_inside_mapping_keys_resolve() {
        let r = resolver(
            "arch: x86_64\ntargets:\n  \"{{arch}}\": fast\nx: \"{{targets}}\"",
        );
        let binding = r.vars.get("targets").unwrap();
        let map = binding.as_mapping().unwrap();
        assert_eq!(map.get("x86_64"), Some(&Value::from("fast")));
    }

    #[test]
    fn resolving_twice_from_a_stable_table_changes_nothing() {
        let combo: Mapping =
            serde_yaml::from_str("name: foo\ndescription: \"{{name}} tool\"").unwrap();
        let mut r = Resolver::new(combo);
        r.resolve_vars().unwrap();
        let first = r.vars.clone();
        r.resolve_vars().unwrap();
        assert_eq!(first, r.vars);
    }

    #[test]
    fn self_reference_is_cyclic() {
        let combo: Mapping = serde_yaml::from_str("a: \"{{a}}\"").unwrap();
        let mut r = Resolver::new(combo);
        let err = r.resolve_vars().unwrap_err();
        assert!(matches!(err, Error::CyclicReference(path) if path == "a"));
    }

    #[test]
    fn mutual_references_are_cyclic() {
        let combo: Mapping =
            serde_yaml::from_str("a: \"x{{b}}\"\nb: \"y{{a}}\"").unwrap();
        let mut r = Resolver::new(combo);
        assert!(matches!(
            r.resolve_vars().unwrap_err(),
            Error::CyclicReference(_)
        ));
    }

    #[test]
    fn variable_referencing_missing_path_is_fatal() {
        let combo: Mapping = serde_yaml::from_str("a: \"{{ghost}}\"").unwrap();
        let mut r = Resolver::new(combo);
        assert!(matches!(
            r.resolve_vars().unwrap_err(),
            Error::KeyNotFound(path) if path == "ghost"
        ));
    }

    #[test]
    fn none_sentinel_normalizes_to_empty_text() {
        let r = resolver("release: null\nname: foo");
        assert_eq!(r.r_lookup("release").unwrap(), "");
    }

    #[test]
    fn inner_whitespace_in_patterns_is_insignificant() {
        let r = resolver("name: foo\ndescription: \"{{ name }} tool\"");
        assert_eq!(r.r_lookup("description").unwrap(), "foo tool");
    }

    #[test]
    fn variables_inside_nested_sequences_are_found() {
        let r = resolver(
            "root: /opt/foo\nmodule:\n  setenv:\n    - \"FOO_HOME {{root}}\"",
        );
        let raw = r.r_lookup_raw("module.setenv").unwrap();
        let items = flatten(&raw).unwrap();
        let line = r.resolve_str(&scalar_text(&items[0]), None).unwrap();
        assert_eq!(line, "FOO_HOME /opt/foo");
    }

    #[test]
    fn lookup_and_resolve_joins_before_substituting() {
        let r = resolver(
            "prefix: /opt\nfiles:\n  - \"{{prefix}}/bin\"\n  - \"{{prefix}}/lib\"",
        );
        assert_eq!(
            r.lookup_and_resolve("files", " ", None).unwrap(),
            "/opt/bin /opt/lib"
        );
    }
}
