//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables. Environment variables take precedence over the file.

use crate::error::{ConfigError, ManifestDiffError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::ToolConfig;

/// Environment variable overriding `render.program`.
pub const ENV_RENDER_PROGRAM: &str = "MANIFEST_DIFF_RENDER_PROGRAM";
/// Environment variable overriding `render.timeout_secs`.
pub const ENV_RENDER_TIMEOUT: &str = "MANIFEST_DIFF_RENDER_TIMEOUT_SECS";
/// Environment variable overriding `diff.identity`.
pub const ENV_IDENTITY: &str = "MANIFEST_DIFF_IDENTITY";
/// Environment variable overriding `vcs.remote`.
pub const ENV_REMOTE: &str = "MANIFEST_DIFF_REMOTE";

/// Configuration parser for loading tool configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory holding `.env` and starting the configuration search.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory holding `.env` and starting the configuration search.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ToolConfig> {
        let path = path.as_ref().to_path_buf();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ManifestDiffError::Config(ConfigError::FileNotFound { path }));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            ManifestDiffError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(&path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ToolConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(ToolConfig::default());
        }

        let config: ToolConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ManifestDiffError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration: render with '{}', {} extra kinds",
            config.render.program,
            config.registry.kinds.len()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// With no explicit path the configuration file is searched for from the
    /// base path upwards; if none exists the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// holds an invalid value.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<ToolConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => {
                let start = self.base_path.clone().unwrap_or_else(|| PathBuf::from("."));
                match find_config_file(&start) {
                    Ok(found) => self.load_file(found)?,
                    Err(_) => {
                        debug!("No configuration file found, using defaults");
                        ToolConfig::default()
                    }
                }
            }
        };

        Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an override cannot be interpreted.
    pub fn apply_overrides<F>(config: &mut ToolConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(program) = lookup(ENV_RENDER_PROGRAM) {
            debug!("Overriding render.program from environment");
            config.render.program = program;
        }

        if let Some(timeout) = lookup(ENV_RENDER_TIMEOUT) {
            debug!("Overriding render.timeout_secs from environment");
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                ConfigError::validation(
                    format!("{ENV_RENDER_TIMEOUT} must be a whole number of seconds: {e}"),
                    "render.timeout_secs",
                )
            })?;
            config.render.timeout_secs = Some(secs);
        }

        if let Some(identity) = lookup(ENV_IDENTITY) {
            debug!("Overriding diff.identity from environment");
            config.diff.identity = identity
                .parse()
                .map_err(|e: String| ConfigError::validation(e, "diff.identity"))?;
        }

        if let Some(remote) = lookup(ENV_REMOTE) {
            debug!("Overriding vcs.remote from environment");
            config.vcs.remote = remote;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ManifestDiffError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "manifest-diff.yaml",
    ".manifest-diff.yaml",
    "manifest-diff.yml",
];

/// Finds the configuration file in the given directory or its parents,
/// falling back to the user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("manifest-diff").join("config.yaml"));
    if let Some(user_config) = user_config {
        if user_config.exists() {
            info!("Found user configuration file: {}", user_config.display());
            return Ok(user_config);
        }
    }

    Err(ManifestDiffError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DuplicatePolicy, IdentityPolicy};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_empty_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("", None).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
render:
  program: helm
  args: [template, ./chart]
  timeout_secs: 120
vcs:
  remote: upstream
  clean: false
diff:
  identity: name
  duplicates: reject
  ignore_fields:
    - metadata.annotations
    - status
registry:
  builtin: false
  kinds:
    - group: example.com
      version: v1
      kind: Widget
      required: [spec.size]
    - version: v1
      kind: Node
      namespaced: false
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.render.program, "helm");
        assert_eq!(config.render.args, vec!["template", "./chart"]);
        assert_eq!(config.render.timeout_secs, Some(120));
        assert_eq!(config.vcs.program, "git");
        assert_eq!(config.vcs.remote, "upstream");
        assert!(!config.vcs.clean);
        assert_eq!(config.diff.identity, IdentityPolicy::Name);
        assert_eq!(config.diff.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.diff.ignore_fields.len(), 2);
        assert!(!config.registry.builtin);
        assert_eq!(config.registry.kinds.len(), 2);
        assert_eq!(config.registry.kinds[0].required.len(), 1);
        assert!(!config.registry.kinds[1].namespaced);
        assert_eq!(config.registry.kinds[1].gvk.group, "");
    }

    #[test]
    fn test_parse_invalid_config() {
        let parser = ConfigParser::new();
        assert!(parser.parse_yaml("diff:\n  identity: uid\n", None).is_err());
        assert!(parser.parse_yaml("diff:\n  ignore_fields: ['a..b']\n", None).is_err());
        assert!(parser.parse_yaml("render: [", None).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = ToolConfig::default();
        ConfigParser::apply_overrides(
            &mut config,
            lookup(&[
                (ENV_RENDER_PROGRAM, "helm"),
                (ENV_RENDER_TIMEOUT, "45"),
                (ENV_IDENTITY, "name"),
                (ENV_REMOTE, "upstream"),
            ]),
        )
        .unwrap();

        assert_eq!(config.render.program, "helm");
        assert_eq!(config.render.timeout_secs, Some(45));
        assert_eq!(config.diff.identity, IdentityPolicy::Name);
        assert_eq!(config.vcs.remote, "upstream");
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = ToolConfig::default();
        assert!(
            ConfigParser::apply_overrides(&mut config, lookup(&[(ENV_RENDER_TIMEOUT, "soon")]))
                .is_err()
        );
        assert!(
            ConfigParser::apply_overrides(&mut config, lookup(&[(ENV_IDENTITY, "uid")])).is_err()
        );
    }

    #[test]
    fn test_find_config_file_upwards() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("overlays").join("prod");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".manifest-diff.yaml"), "vcs:\n  remote: fork\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(
            found,
            dir.path().canonicalize().unwrap().join(".manifest-diff.yaml")
        );

        let config = ConfigParser::new().with_base_path(&nested).load_file(&found).unwrap();
        assert_eq!(config.vcs.remote, "fork");
    }

    #[test]
    fn test_init_template_is_default() {
        let template = include_str!("../../templates/manifest-diff.yaml");
        let config = ConfigParser::new().parse_yaml(template, None).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ConfigParser::new().with_base_path(dir.path());
        let err = parser.load_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(
            err,
            ManifestDiffError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
