//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// manifest-diff - Summarise how rendered resources change between two revisions.
#[derive(Parser, Debug)]
#[command(name = "manifest-diff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "MANIFEST_DIFF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render base and head revisions and diff their resources.
    Diff {
        /// Base branch, looked up on the configured remote.
        #[arg(long, env = "GITHUB_BASE_REF")]
        base_ref: Option<String>,

        /// Head branch; the checked-out HEAD is rendered for it.
        #[arg(long, env = "GITHUB_HEAD_REF")]
        head_ref: Option<String>,

        /// Directory the render command runs in.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Exit with status 2 when resources changed.
        #[arg(long)]
        exit_code: bool,
    },

    /// Diff two already-rendered manifest files.
    Compare {
        /// Rendered base manifests.
        base: PathBuf,

        /// Rendered head manifests.
        head: PathBuf,

        /// Exit with status 2 when resources changed.
        #[arg(long)]
        exit_code: bool,
    },

    /// List the resources decoded from a rendered manifest file.
    Parse {
        /// Rendered manifests.
        file: PathBuf,
    },

    /// Run the render command and stream its output.
    Render {
        /// Directory the render command runs in.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,

        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,
    },

    /// Write a default configuration file.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
