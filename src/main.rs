//! gen-definitions
//!
//! Resolve a layered YAML package definition and emit a build-include file,
//! an environment modulefile, or the answer to a single-key query.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;
use yaml2rpm::cli::{Cli, DEFAULT_DEFAULTS_FILE};
use yaml2rpm::config::{self, IncludeMap, Includer, combine};
use yaml2rpm::emit::{self, ModulefileGenerator};
use yaml2rpm::query;
use yaml2rpm::resolve::Resolver;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let map = match &cli.map {
        Some(literal) => IncludeMap::from_json(literal)?,
        None => IncludeMap::new(),
    };
    let includer = Includer::new(map);

    let package = config::load_mapping(&includer, &cli.pkg_file)?;

    // An explicitly-requested defaults file must exist; the conventional one
    // is skipped when absent.
    let defaults = match &cli.defaults {
        Some(path) => Some(config::load_mapping(&includer, path)?),
        None => {
            let conventional = Path::new(DEFAULT_DEFAULTS_FILE);
            if conventional.is_file() {
                Some(config::load_mapping(&includer, conventional)?)
            } else {
                debug!("no {DEFAULT_DEFAULTS_FILE} found; continuing without site defaults");
                None
            }
        }
    };

    let combo = combine(defaults, Some(package));
    let mut resolver = Resolver::new(combo);
    resolver.resolve_vars()?;

    if let Some(key) = &cli.query {
        let outcome = query::process(&resolver, key, cli.quiet, cli.listsep.as_deref());
        if let Some(output) = outcome.output {
            println!("{output}");
        }
        if !outcome.success {
            std::process::exit(1);
        }
    } else if cli.module {
        let generator = ModulefileGenerator::new(&resolver)?;
        print!("{}", generator.generate()?);
    } else {
        print!("{}", emit::makefile::generate(&resolver)?);
    }

    Ok(())
}
