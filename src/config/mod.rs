//! Run configuration
//!
//! Settings come from three layers: command line flags, an optional
//! `overalls.toml` at the project root, and built-in defaults. They are
//! folded once into an immutable [`RunConfig`] that the walker and the
//! dispatcher borrow.

pub mod overalls_toml;
pub mod run_config;

pub use overalls_toml::OverallsToml;
pub use run_config::{CoverMode, IgnoreSet, RunConfig, Settings};
