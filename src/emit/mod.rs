//! Text generators consuming the resolved configuration.

pub mod makefile;
pub mod modulefile;

pub use modulefile::ModulefileGenerator;
