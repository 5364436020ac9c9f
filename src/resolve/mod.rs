//! Configuration resolution: dotted-path lookup, sequence flattening, and
//! fixed-point template-variable substitution.

mod path;
mod vars;

pub use path::{flatten, lookup, scalar_text, stringify};
pub use vars::Resolver;
