//! Single-key query processing.
//!
//! Queries are scriptable: the outcome carries both the text to print and
//! whether the process should exit successfully.

use crate::resolve::Resolver;

/// Outcome of a query: what to print (if anything) and the exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub output: Option<String>,
    pub success: bool,
}

impl QueryOutcome {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            success: true,
        }
    }

    fn failed() -> Self {
        Self {
            output: Some("False".to_string()),
            success: false,
        }
    }

    fn silenced(self) -> Self {
        Self {
            output: None,
            ..self
        }
    }
}

/// Resolve a single query key.
///
/// Aliases: `patch` -> `build.patchfile`, `source` -> `vendor_source`. The
/// synthetic keys `tarball` and `pkgname` fall back to values computed from
/// the package name/version when not set explicitly. Any other key prints
/// its resolved text, the literal `True` when it resolves to empty text, or
/// the literal `False` with a failing status when it does not resolve.
/// `quiet` suppresses all output, leaving the exit status as the answer.
pub fn process(mk: &Resolver, query: &str, quiet: bool, list_sep: Option<&str>) -> QueryOutcome {
    let key = query.trim().to_lowercase();
    let key = match key.as_str() {
        "patch" => "build.patchfile",
        "source" => "vendor_source",
        other => other,
    };

    let outcome = match key {
        "tarball" => match mk.r_lookup("src_tarball") {
            Ok(tarball) => QueryOutcome::ok(tarball),
            Err(_) => match tarball_fallback(mk) {
                Ok(tarball) => QueryOutcome::ok(tarball),
                Err(_) => QueryOutcome::failed(),
            },
        },
        "pkgname" => match mk.r_lookup("pkgname") {
            Ok(pkgname) => QueryOutcome::ok(pkgname),
            Err(_) => match pkgname_fallback(mk) {
                Ok(pkgname) => QueryOutcome::ok(pkgname),
                Err(_) => QueryOutcome::failed(),
            },
        },
        key => match mk.r_lookup_with(key, list_sep) {
            Ok(value) if value.is_empty() => QueryOutcome::ok("True"),
            Ok(value) => QueryOutcome::ok(value),
            Err(_) => QueryOutcome::failed(),
        },
    };

    if quiet { outcome.silenced() } else { outcome }
}

/// `name-version.extension` when no explicit `src_tarball` is set.
fn tarball_fallback(mk: &Resolver) -> crate::error::Result<String> {
    Ok(format!(
        "{}-{}.{}",
        mk.r_lookup("name")?,
        mk.r_lookup("version")?,
        mk.r_lookup("extension")?
    ))
}

/// `name_version` when no explicit `pkgname` is set.
fn pkgname_fallback(mk: &Resolver) -> crate::error::Result<String> {
    Ok(format!(
        "{}_{}",
        mk.r_lookup("name")?,
        mk.r_lookup("version")?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn resolver(yaml: &str) -> Resolver {
        let combo: Mapping = serde_yaml::from_str(yaml).unwrap();
        let mut resolver = Resolver::new(combo);
        resolver.resolve_vars().unwrap();
        resolver
    }

    const BASE: &str = "name: foo\nversion: \"1.2\"\nextension: tar.gz";

    #[test]
    fn tarball_falls_back_to_name_version_extension() {
        let outcome = process(&resolver(BASE), "tarball", false, None);
        assert_eq!(outcome.output.as_deref(), Some("foo-1.2.tar.gz"));
        assert!(outcome.success);
    }

    #[test]
    fn explicit_src_tarball_wins() {
        let yaml = format!("{BASE}\nsrc_tarball: foo-custom.tgz");
        let outcome = process(&resolver(&yaml), "tarball", false, None);
        assert_eq!(outcome.output.as_deref(), Some("foo-custom.tgz"));
    }

    #[test]
    fn pkgname_falls_back_to_name_underscore_version() {
        let outcome = process(&resolver(BASE), "pkgname", false, None);
        assert_eq!(outcome.output.as_deref(), Some("foo_1.2"));
        assert!(outcome.success);
    }

    #[test]
    fn patch_aliases_to_build_patchfile() {
        let yaml = format!("{BASE}\nbuild:\n  patchfile: foo.patch");
        let outcome = process(&resolver(&yaml), "patch", false, None);
        assert_eq!(outcome.output.as_deref(), Some("foo.patch"));
    }

    #[test]
    fn missing_key_prints_false_and_fails() {
        let outcome = process(&resolver(BASE), "ghost", false, None);
        assert_eq!(outcome.output.as_deref(), Some("False"));
        assert!(!outcome.success);
    }

    #[test]
    fn quiet_suppresses_the_false_marker() {
        let outcome = process(&resolver(BASE), "ghost", true, None);
        assert_eq!(outcome.output, None);
        assert!(!outcome.success);
    }

    #[test]
    fn quiet_leaves_only_the_exit_status() {
        let outcome = process(&resolver(BASE), "name", true, None);
        assert_eq!(outcome.output, None);
        assert!(outcome.success);

        let yaml = format!("{BASE}\nrelease: null");
        let outcome = process(&resolver(&yaml), "release", true, None);
        assert_eq!(outcome.output, None);
        assert!(outcome.success);
    }

    #[test]
    fn empty_resolution_prints_true() {
        let yaml = format!("{BASE}\nrelease: null");
        let outcome = process(&resolver(&yaml), "release", false, None);
        assert_eq!(outcome.output.as_deref(), Some("True"));
        assert!(outcome.success);
    }

    #[test]
    fn sequence_results_join_with_the_supplied_separator() {
        let yaml = format!("{BASE}\nrequires: [gcc, make]");
        let outcome = process(&resolver(&yaml), "requires", false, Some(","));
        assert_eq!(outcome.output.as_deref(), Some("gcc,make"));
    }

    #[test]
    fn query_keys_are_case_insensitive() {
        let outcome = process(&resolver(BASE), "  Tarball ", false, None);
        assert_eq!(outcome.output.as_deref(), Some("foo-1.2.tar.gz"));
    }
}
