//! Environment-modules (Tcl modulefile) emitter.
//!
//! Emits a fixed header/footer framing, a whatis/description block, and one
//! directive block per optional sequence-valued key under `module.`. Each
//! entry is a "name value" pair split on the first run of whitespace.

use crate::error::{Error, Result};
use crate::resolve::{Resolver, flatten, scalar_text};

/// Generator for modulefile text. Caches the identity fields up front since
/// they are required for the description block.
pub struct ModulefileGenerator<'a> {
    mk: &'a Resolver,
    name: String,
    version: String,
    description: String,
}

impl<'a> ModulefileGenerator<'a> {
    /// Fails when `name`, `version`, or `description` is missing.
    pub fn new(mk: &'a Resolver) -> Result<Self> {
        Ok(Self {
            mk,
            name: mk.r_lookup("name")?,
            version: mk.r_lookup("version")?,
            description: mk.r_lookup("description")?,
        })
    }

    /// Render the complete modulefile.
    pub fn generate(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str(&self.header());
        out.push_str(&self.whatis());
        out.push_str(&self.setenv_block()?);
        out.push_str(&self.alias_block()?);
        out.push_str(&self.prereq_block()?);
        out.push_str(&self.prepend_path_block()?);
        out.push_str(TAIL);
        Ok(out)
    }

    fn header(&self) -> String {
        let today = chrono::Local::now().format("%Y-%m-%d");
        let host = build_host();
        format!(
            "#%Module1.0\n\
             #####################################################################\n\
             ## module.skeleton adapted from modulizer script originally written by Harry Mangalam (hjm)\n\
             ## Date: {today}\n\
             ## Built on: {host}\n\
             source /opt/rcic/include/rcic-module-head.tcl\n"
        )
    }

    fn whatis(&self) -> String {
        format!(
            "set DESC \"                            {}/{}\n{}\n\"\nmodule-whatis \"\n$DESC\n\"\n",
            self.name, self.version, self.description
        )
    }

    fn setenv_block(&self) -> Result<String> {
        self.pair_block("module.setenv", |name, value| {
            format!("setenv\t{name}\t{value}\n")
        })
    }

    fn alias_block(&self) -> Result<String> {
        self.pair_block("module.alias", |name, value| {
            format!("set-alias\t{name}\t{value}\n")
        })
    }

    fn prepend_path_block(&self) -> Result<String> {
        self.pair_block("module.prepend_path", |name, value| {
            format!("prepend-path\t{name}\t{value}\n")
        })
    }

    fn prereq_block(&self) -> Result<String> {
        let mut out = String::new();
        for module in self.resolved_entries("module.prereq")? {
            out.push_str(&format!(
                "if {{ [module-info mode load] }} {{ LoadPrereq \"{module}\" }}\nprereq\t{module}\n"
            ));
        }
        Ok(out)
    }

    /// Emit one directive line per entry of an optional sequence-valued key.
    /// A missing key yields an empty block; an entry without a whitespace
    /// separator is fatal for the directive.
    fn pair_block(
        &self,
        key: &str,
        render: impl Fn(&str, &str) -> String,
    ) -> Result<String> {
        let mut out = String::new();
        for entry in self.resolved_entries(key)? {
            let (name, value) = split_name_value(&entry)?;
            out.push_str(&render(
                &self.mk.resolve_str(name, None)?,
                &self.mk.resolve_str(value, None)?,
            ));
        }
        Ok(out)
    }

    /// The entries of an optional sequence-valued key, each with its
    /// variables resolved; sequence-valued variables splice into extra
    /// entries.
    fn resolved_entries(&self, key: &str) -> Result<Vec<String>> {
        let raw = match self.mk.r_lookup_raw(key) {
            Ok(raw) => raw,
            Err(Error::KeyNotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let items = match flatten(&raw) {
            Some(items) => items,
            None => vec![raw],
        };
        let mut entries = Vec::new();
        for item in &items {
            entries.extend(self.mk.resolve_entries(&scalar_text(item))?);
        }
        Ok(entries)
    }
}

const TAIL: &str = "\n\
    #####################################################################\n\
    ## Standard tail for invoking autoloading functionality \n\
    ## \n\
    source /opt/rcic/include/rcic-module-tail.tcl\n";

/// Split a directive entry into its name and value on the first run of
/// spaces or tabs.
fn split_name_value(entry: &str) -> Result<(&str, &str)> {
    let split_at = entry
        .find([' ', '\t'])
        .ok_or_else(|| Error::MalformedReference(entry.to_string()))?;
    let name = &entry[..split_at];
    let value = entry[split_at..].trim_start_matches([' ', '\t']);
    Ok((name, value))
}

fn build_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
