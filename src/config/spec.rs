//! Configuration specification types.
//!
//! This module defines the structure of `manifest-diff.yaml`. Every section
//! is optional; a missing file behaves like an empty one.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::diff::{DiffEngine, DuplicatePolicy, IdentityPolicy, PayloadComparator};
use crate::error::ParseError;
use crate::exec::{CommandTemplate, LineExecutor};
use crate::manifest::{FieldPath, KindSpec, ManifestParser, Registry};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Render command settings.
    #[serde(default)]
    pub render: RenderConfig,
    /// Version control settings.
    #[serde(default)]
    pub vcs: VcsConfig,
    /// Diff policies.
    #[serde(default)]
    pub diff: DiffSettings,
    /// Kind registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Command that turns a checked-out tree into a manifest stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderConfig {
    /// Program to run.
    #[serde(default = "default_render_program")]
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default = "default_render_args")]
    pub args: Vec<String>,
    /// Optional deadline in seconds. No deadline when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Version control settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VcsConfig {
    /// Version control program.
    #[serde(default = "default_vcs_program")]
    pub program: String,
    /// Remote whose branch the base reference names.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Whether untracked files are removed before each checkout.
    #[serde(default = "default_clean")]
    pub clean: bool,
}

/// Diff policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSettings {
    /// How resources are matched across snapshots.
    #[serde(default)]
    pub identity: IdentityPolicy,
    /// What to do with repeated identities.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    /// Fields dropped from both payloads before comparing.
    #[serde(default)]
    pub ignore_fields: Vec<FieldPath>,
}

/// Kind registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Whether the built-in kinds are registered.
    #[serde(default = "default_builtin")]
    pub builtin: bool,
    /// Additional kinds.
    #[serde(default)]
    pub kinds: Vec<KindSpec>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: default_render_program(),
            args: default_render_args(),
            timeout_secs: None,
        }
    }
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            program: default_vcs_program(),
            remote: default_remote(),
            clean: default_clean(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            builtin: default_builtin(),
            kinds: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Returns the render command.
    #[must_use]
    pub fn template(&self) -> CommandTemplate {
        CommandTemplate::new(self.program.clone(), self.args.clone())
    }

    /// Returns the render deadline, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builds an executor honouring the render deadline.
    #[must_use]
    pub fn executor(&self) -> LineExecutor {
        LineExecutor::new().with_timeout(self.timeout())
    }
}

impl DiffSettings {
    /// Builds a diff engine with these policies.
    #[must_use]
    pub fn engine(&self) -> DiffEngine {
        DiffEngine::new()
            .with_identity(self.identity)
            .with_duplicates(self.duplicates)
            .with_comparator(PayloadComparator::new(self.ignore_fields.clone()))
    }
}

impl RegistryConfig {
    /// Builds the kind registry.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Setup`] if a kind is incomplete or conflicts
    /// with another registration.
    pub fn build(&self) -> Result<Registry, ParseError> {
        let mut registry = if self.builtin {
            Registry::builtin()
        } else {
            Registry::new()
        };

        for spec in &self.kinds {
            registry.register(spec.clone())?;
        }

        Ok(registry)
    }

    /// Builds a parser over the configured registry.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Setup`] if the registry cannot be built.
    pub fn parser(&self) -> Result<ManifestParser, ParseError> {
        self.build().map(ManifestParser::new)
    }
}

// Default value functions

fn default_render_program() -> String {
    String::from("kustomize")
}

fn default_render_args() -> Vec<String> {
    vec![String::from("build"), String::from("./")]
}

fn default_vcs_program() -> String {
    String::from("git")
}

fn default_remote() -> String {
    String::from("origin")
}

const fn default_clean() -> bool {
    true
}

const fn default_builtin() -> bool {
    true
}
