//! Configuration module for the manifest diff tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `manifest-diff.yaml`
//! - Environment variable overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_IDENTITY, ENV_REMOTE, ENV_RENDER_PROGRAM,
    ENV_RENDER_TIMEOUT, find_config_file,
};
pub use spec::{DiffSettings, RegistryConfig, RenderConfig, ToolConfig, VcsConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
