//! Command-line interface for execforge.
//!
//! Provides commands for running snippets through the adaptive pipeline and
//! benchmarking a snippet to surface pattern analysis and optimization
//! advice.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
