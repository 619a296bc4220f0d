//! Configuration validation.
//!
//! This module checks a loaded configuration for values that would only fail
//! later, in the middle of a diff run.

use crate::diff::IdentityPolicy;
use crate::error::{ConfigError, ManifestDiffError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{RegistryConfig, RenderConfig, ToolConfig, VcsConfig};

/// Validator for tool configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Whether warnings fail validation.
    strict: bool,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self { strict: false }
    }

    /// Makes warnings fail validation.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem if validation fails.
    pub fn validate(&self, config: &ToolConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if let Some(first_error) = result.errors.first() {
            return Err(ManifestDiffError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        if self.strict {
            if let Some(warning) = result.warnings.first() {
                return Err(ManifestDiffError::Config(ConfigError::validation_general(
                    format!("{warning} (strict mode)"),
                )));
            }
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &ToolConfig) -> ValidationResult {
        debug!("Validating configuration (strict: {})", self.strict);
        let mut result = ValidationResult::default();

        Self::validate_render(&config.render, &mut result);
        Self::validate_vcs(&config.vcs, &mut result);
        Self::validate_diff(config, &mut result);
        Self::validate_registry(&config.registry, &mut result);

        result
    }

    /// Validates the render command.
    fn validate_render(render: &RenderConfig, result: &mut ValidationResult) {
        if render.program.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("render.program"),
                message: String::from("Render program cannot be empty"),
            });
        }

        if render.timeout_secs == Some(0) {
            result.errors.push(ValidationError {
                field: String::from("render.timeout_secs"),
                message: String::from("Render timeout must be at least one second"),
            });
        }

        if render.args.iter().any(|arg| arg.contains('\n')) {
            result.warnings.push(String::from(
                "render.args: an argument contains a newline",
            ));
        }
    }

    /// Validates version control settings.
    fn validate_vcs(vcs: &VcsConfig, result: &mut ValidationResult) {
        if vcs.program.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("vcs.program"),
                message: String::from("Version control program cannot be empty"),
            });
        }

        if !is_valid_remote(&vcs.remote) {
            result.errors.push(ValidationError {
                field: String::from("vcs.remote"),
                message: format!("Remote name '{}' is invalid", vcs.remote),
            });
        }

        if !vcs.clean {
            result.warnings.push(String::from(
                "vcs.clean: untracked files will leak between base and head renders",
            ));
        }
    }

    /// Validates diff policies.
    fn validate_diff(config: &ToolConfig, result: &mut ValidationResult) {
        let diff = &config.diff;

        if diff.identity == IdentityPolicy::Name {
            result.warnings.push(String::from(
                "diff.identity: 'name' matches resources of different kinds with each other",
            ));
        }

        let mut seen = HashSet::new();
        for (i, path) in diff.ignore_fields.iter().enumerate() {
            let rendered = path.to_string();
            if !seen.insert(rendered.clone()) {
                result.warnings.push(format!(
                    "diff.ignore_fields[{i}]: '{rendered}' is listed more than once"
                ));
            }
            if rendered == "metadata" || rendered == "metadata.name" {
                result.errors.push(ValidationError {
                    field: format!("diff.ignore_fields[{i}]"),
                    message: format!("Ignoring '{rendered}' would hide renames"),
                });
            }
        }
    }

    /// Validates registry settings.
    fn validate_registry(registry: &RegistryConfig, result: &mut ValidationResult) {
        if !registry.builtin && registry.kinds.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("registry"),
                message: String::from(
                    "Registry is empty: enable builtin kinds or declare at least one kind",
                ),
            });
            return;
        }

        for (i, spec) in registry.kinds.iter().enumerate() {
            if spec.gvk.kind.is_empty() || !is_valid_kind(&spec.gvk.kind) {
                result.errors.push(ValidationError {
                    field: format!("registry.kinds[{i}].kind"),
                    message: format!("Kind '{}' is invalid", spec.gvk.kind),
                });
            }
            if spec.gvk.version.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("registry.kinds[{i}].version"),
                    message: format!("Kind '{}' has no version", spec.gvk.kind),
                });
            }
        }

        if let Err(e) = registry.build() {
            result.errors.push(ValidationError {
                field: String::from("registry.kinds"),
                message: e.to_string(),
            });
        }
    }
}

/// Checks a remote name: non-empty, no whitespace, no leading dash.
fn is_valid_remote(remote: &str) -> bool {
    !remote.is_empty()
        && !remote.starts_with('-')
        && !remote.chars().any(char::is_whitespace)
}

/// Checks a kind name: starts with an uppercase letter, alphanumeric.
fn is_valid_kind(kind: &str) -> bool {
    let mut chars = kind.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
