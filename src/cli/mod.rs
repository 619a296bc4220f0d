//! CLI module for the manifest-diff tool.
//!
//! This module provides the command-line interface for diffing rendered
//! resources between revisions.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
