//! Error types for the manifest diff system.
//!
//! This module provides the error hierarchy for every stage of a diff run:
//! command execution, manifest parsing, diffing, configuration, version
//! control, and the orchestrating workflow.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the manifest diff system.
#[derive(Debug, Error)]
pub enum ManifestDiffError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External command errors.
    #[error("Command error: {0}")]
    Exec(#[from] ExecError),

    /// Manifest parsing errors.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Diff errors.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Version control errors.
    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),

    /// Workflow stage failures.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Errors raised by the line-streaming executor.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started.
    #[error("Unable to launch '{command}': {source}")]
    Launch {
        /// Rendered command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited with a failure status.
    #[error("'{command}' exited with {}", describe_exit(*code))]
    Execution {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` if the process was terminated by a signal.
        code: Option<i32>,
    },

    /// Reading output or reaping the process failed.
    #[error("I/O failure while running '{command}': {source}")]
    Io {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled through its cancellation token.
    #[error("'{command}' was cancelled")]
    Cancelled {
        /// Rendered command line.
        command: String,
    },

    /// The run exceeded its deadline.
    #[error("'{command}' did not finish within {timeout_secs}s")]
    TimedOut {
        /// Rendered command line.
        command: String,
        /// Deadline that was exceeded, in seconds.
        timeout_secs: u64,
    },
}

/// Whole-stream manifest parsing errors.
///
/// Individual documents that fail to decode are skipped and never surface here.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The stream or the registry makes parsing impossible as a whole.
    #[error("Cannot parse manifest stream: {message}")]
    Setup {
        /// Description of the fault.
        message: String,
    },
}

/// Which snapshot a resource or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The base revision.
    Base,
    /// The head revision.
    Head,
}

/// Diff engine errors.
#[derive(Debug, Error)]
pub enum DiffError {
    /// One of the input collections could not be obtained.
    #[error("Cannot obtain {side} resources: {source}")]
    Input {
        /// Side whose input failed.
        side: Side,
        /// Failure that prevented materialising the collection.
        #[source]
        source: Box<ManifestDiffError>,
    },

    /// A collection holds the same identity more than once under the reject policy.
    #[error("Duplicate identity {key} in {side} resources")]
    DuplicateIdentity {
        /// Side containing the duplicate.
        side: Side,
        /// Display form of the duplicated identity key.
        key: String,
    },
}

/// Version control errors.
#[derive(Debug, Error)]
pub enum VcsError {
    /// A reference could not be resolved to a revision.
    #[error("Unable to resolve reference '{reference}'")]
    UnresolvedReference {
        /// Reference that was looked up.
        reference: String,
    },

    /// A version control command failed.
    #[error("{operation} failed: {source}")]
    CommandFailed {
        /// Operation being performed.
        operation: String,
        /// Executor failure.
        #[source]
        source: ExecError,
    },
}

/// Stage of the orchestration workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolving base and head revisions.
    Resolve,
    /// Cleaning and restoring the working tree.
    Checkout,
    /// Running the render command.
    Render,
    /// Parsing rendered output.
    Parse,
    /// Computing the summary.
    Diff,
}

/// A failure tagged with the workflow stage and snapshot it happened in.
#[derive(Debug, Error)]
#[error("{stage} stage failed{}: {source}", side.map_or_else(String::new, |s| format!(" for {s}")))]
pub struct WorkflowError {
    /// Stage that failed.
    pub stage: Stage,
    /// Snapshot being processed, if the stage is per-snapshot.
    pub side: Option<Side>,
    /// Underlying failure.
    #[source]
    pub source: Box<ManifestDiffError>,
}

/// Result type alias for manifest diff operations.
pub type Result<T> = std::result::Result<T, ManifestDiffError>;

fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(
        || String::from("no exit code (terminated by signal)"),
        |c| format!("exit code {c}"),
    )
}

impl ManifestDiffError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl ParseError {
    /// Creates a setup error with the given message.
    #[must_use]
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}

impl ExecError {
    /// Returns the rendered command line the error refers to.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Launch { command, .. }
            | Self::Execution { command, .. }
            | Self::Io { command, .. }
            | Self::Cancelled { command }
            | Self::TimedOut { command, .. } => command,
        }
    }
}

impl WorkflowError {
    /// Wraps an error with its stage and snapshot.
    #[must_use]
    pub fn new(stage: Stage, side: Option<Side>, source: impl Into<ManifestDiffError>) -> Self {
        Self {
            stage,
            side,
            source: Box::new(source.into()),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Base => "base",
            Self::Head => "head",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resolve => "resolve",
            Self::Checkout => "checkout",
            Self::Render => "render",
            Self::Parse => "parse",
            Self::Diff => "diff",
        };
        write!(f, "{s}")
    }
}
