//! yaml2rpm definition generator
//!
//! Resolves layered, template-variable-driven YAML package definitions and
//! renders build-system includes, environment modulefiles, and single-key
//! query answers. This module exports the core components for testing and
//! integration.

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod query;
pub mod resolve;
