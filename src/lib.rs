// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # manifest-diff
//!
//! Summarises how the resources rendered from a configuration tree change
//! between a base and a head revision.
//!
//! ## Overview
//!
//! A review pipeline renders the tree at both revisions with a templating or
//! build command, decodes the resulting manifest streams and classifies every
//! resource as added, removed or modified:
//!
//! - Run external commands and consume their output line by line
//! - Decode multi-document manifest streams against a registry of known kinds
//! - Match resources across snapshots by identity and compare their payloads
//!
//! ## Architecture
//!
//! 1. **Executor**: runs the render and version control commands
//! 2. **Parser**: turns rendered text into a resource collection, skipping
//!    documents it cannot decode
//! 3. **Diff engine**: classifies the two collections into a summary
//! 4. **Workflow**: checks out, renders and parses each revision, then diffs
//!
//! ## Modules
//!
//! - [`exec`]: Line-streaming command execution
//! - [`manifest`]: Resource model, kind registry and parser
//! - [`diff`]: Diff engine and summary
//! - [`config`]: Configuration parsing and validation
//! - [`vcs`]: Version control backends
//! - [`workflow`]: Base/head orchestration
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! render:
//!   program: kustomize
//!   args: ["build", "./overlays/prod"]
//! diff:
//!   ignore_fields:
//!     - metadata.annotations
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod exec;
pub mod manifest;
pub mod vcs;
pub mod workflow;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ToolConfig};
pub use diff::{DiffEngine, Summary};
pub use error::{ManifestDiffError, Result};
pub use exec::{CommandTemplate, LineExecutor};
pub use manifest::{ManifestParser, Registry, Resource, ResourceCollection};
pub use vcs::{GitCli, VersionControl};
pub use workflow::{Workflow, WorkflowReport};
