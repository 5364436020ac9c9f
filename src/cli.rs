//! CLI definition for gen-definitions.
//!
//! One positional package-definition file plus mode flags; the default mode
//! emits the build-include text to stdout.

use clap::Parser;
use std::path::PathBuf;

/// Conventional site-defaults file used when `--defaults` is not given.
pub const DEFAULT_DEFAULTS_FILE: &str = "pkg-defaults.yaml";

/// Generate build-system include files and environment modulefiles from
/// layered YAML package definitions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML file with packaging definitions
    pub pkg_file: PathBuf,

    /// YAML file for packaging defaults (default: pkg-defaults.yaml)
    #[arg(short, long)]
    pub defaults: Option<PathBuf>,

    /// Generate an environment modules file instead of a build include
    #[arg(short, long)]
    pub module: bool,

    /// Query a single resolved key (patch, source, pkgname, tarball, or any path)
    #[arg(short, long, value_name = "KEY")]
    pub query: Option<String>,

    /// Separator used when joining sequence-valued query results
    #[arg(short, long)]
    pub listsep: Option<String>,

    /// Suppress query output; the exit status alone carries the answer
    #[arg(short = 'Q', long)]
    pub quiet: bool,

    /// JSON mapping redirecting include-file names before path search,
    /// e.g. '{"compiler.yaml": "gcc.yaml"}'
    #[arg(short = 'M', long, value_name = "JSON")]
    pub map: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_flag_is_optional() {
        let cli = Cli::parse_from(["gen-definitions", "pkg.yaml"]);
        assert_eq!(cli.pkg_file, PathBuf::from("pkg.yaml"));
        assert_eq!(cli.defaults, None);
        assert!(!cli.module);
        assert!(!cli.quiet);
    }

    #[test]
    fn query_mode_with_listsep() {
        let cli = Cli::parse_from([
            "gen-definitions",
            "-q",
            "requires",
            "-l",
            ",",
            "pkg.yaml",
        ]);
        assert_eq!(cli.query.as_deref(), Some("requires"));
        assert_eq!(cli.listsep.as_deref(), Some(","));
    }
}
