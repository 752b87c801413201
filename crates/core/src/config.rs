//! Configuration management for the blessed CLI.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.blessed/config.yaml` in the workspace, or `BLESSED_CONFIG`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default selector ceiling per output stylesheet (legacy IE limit).
pub const DEFAULT_MAX_SELECTORS: usize = 4095;

/// Options recognized by the splitting plugin.
///
/// Field names accept the camelCase spelling used by build-tool configs
/// (`cacheBuster`, `maxSelectors`, `sourceMaps`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOptions {
    /// Inject `@import` lines for fragments 1..N into fragment 0
    #[serde(default = "default_true")]
    pub imports: bool,

    /// Append a random `?z=<token>` query to injected import URLs
    #[serde(default = "default_true")]
    pub cache_buster: bool,

    /// Emit the per-document summary line
    #[serde(default)]
    pub log: bool,

    /// Selector ceiling used by the default chunker
    #[serde(default = "default_max_selectors")]
    pub max_selectors: usize,

    /// Propagate source maps when the input carries one
    #[serde(default = "default_true")]
    pub source_maps: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_selectors() -> usize {
    DEFAULT_MAX_SELECTORS
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            imports: true,
            cache_buster: true,
            log: false,
            max_selectors: DEFAULT_MAX_SELECTORS,
            source_maps: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working directory used to resolve relative input paths
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Splitting options
    pub split: SplitOptions,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    split: Option<SplitConfig>,
    logging: Option<LoggingConfig>,
}

/// The `split:` section; keys left out keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitConfig {
    imports: Option<bool>,
    cache_buster: Option<bool>,
    log: Option<bool>,
    max_selectors: Option<usize>,
    source_maps: Option<bool>,
}

impl SplitConfig {
    fn apply(self, options: &mut SplitOptions) {
        if let Some(imports) = self.imports {
            options.imports = imports;
        }
        if let Some(cache_buster) = self.cache_buster {
            options.cache_buster = cache_buster;
        }
        if let Some(log) = self.log {
            options.log = log;
        }
        if let Some(max_selectors) = self.max_selectors {
            options.max_selectors = max_selectors;
        }
        if let Some(source_maps) = self.source_maps {
            options.source_maps = source_maps;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::in_workspace(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl AppConfig {
    /// Default configuration rooted at `workspace`.
    pub fn in_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            split: SplitOptions::default(),
        }
    }

    /// Load configuration from environment variables, config file and defaults.
    ///
    /// Environment variables:
    /// - `BLESSED_WORKSPACE`: Override workspace path
    /// - `BLESSED_CONFIG`: Path to config file
    /// - `BLESSED_MAX_SELECTORS`: Selector ceiling for the default chunker
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use blessed_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(CliOverrides::default())
    }

    /// Load configuration with command-line flags layered on top.
    ///
    /// `--workspace` and `--config` are applied before the config file is
    /// read, so the file they name takes part in the normal precedence.
    pub fn load_with(overrides: CliOverrides) -> AppResult<Self> {
        Self::load_from_env(overrides, |key| std::env::var(key).ok())
    }

    fn load_from_env<F>(overrides: CliOverrides, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = env("BLESSED_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(config_file) = env("BLESSED_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(ref workspace) = overrides.workspace {
            config.workspace = workspace.clone();
        }
        if let Some(ref config_file) = overrides.config_file {
            config.config_file = Some(config_file.clone());
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(max) = env("BLESSED_MAX_SELECTORS") {
            config.split.max_selectors = parse_max_selectors(&max)?;
        }

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config.with_overrides(overrides))
    }

    /// Path of the config file this configuration reads.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => cf.clone(),
            None => self.workspace.join(".blessed").join("config.yaml"),
        }
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(split) = config_file.split {
            split.apply(&mut result.split);
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    pub fn with_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.split.max_selectors == 0 {
            return Err(AppError::Config(
                "maxSelectors must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Global flags supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

fn parse_max_selectors(value: &str) -> AppResult<usize> {
    value.trim().parse().map_err(|e| {
        AppError::Config(format!("Invalid BLESSED_MAX_SELECTORS {:?}: {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::in_workspace("/tmp");
        assert!(config.split.imports);
        assert!(config.split.cache_buster);
        assert!(!config.split.log);
        assert_eq!(config.split.max_selectors, DEFAULT_MAX_SELECTORS);
        assert!(!config.verbose);
    }

    #[test]
    fn test_config_path_default_location() {
        let config = AppConfig::in_workspace("/srv/site");
        assert_eq!(
            config.config_path(),
            PathBuf::from("/srv/site/.blessed/config.yaml")
        );
    }

    #[test]
    fn test_merge_yaml_camel_case_options() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "split:\n  imports: false\n  cacheBuster: false\n  log: true\n  maxSelectors: 100\nlogging:\n  level: warn\n  color: false\n",
        )
        .unwrap();

        let config = AppConfig::in_workspace(temp.path()).merge_yaml(&path).unwrap();
        assert!(!config.split.imports);
        assert!(!config.split.cache_buster);
        assert!(config.split.log);
        assert_eq!(config.split.max_selectors, 100);
        assert!(config.split.source_maps);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_merge_yaml_partial_split_section_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "split:\n  log: true\n").unwrap();

        let config = AppConfig::in_workspace(temp.path()).merge_yaml(&path).unwrap();
        assert!(config.split.imports);
        assert!(config.split.cache_buster);
        assert!(config.split.log);
    }

    #[test]
    fn test_merge_yaml_keeps_values_from_earlier_layers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "split:\n  log: true\n").unwrap();

        let mut config = AppConfig::in_workspace(temp.path());
        config.split.max_selectors = 100;
        config.split.imports = false;

        let config = config.merge_yaml(&path).unwrap();
        assert!(config.split.log);
        assert_eq!(config.split.max_selectors, 100);
        assert!(!config.split.imports);
    }

    #[test]
    fn test_env_overrides_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "split:\n  log: true\n  maxSelectors: 50\n").unwrap();

        let workspace = temp.path().to_string_lossy().into_owned();
        let env = |key: &str| match key {
            "BLESSED_WORKSPACE" => Some(workspace.clone()),
            "BLESSED_MAX_SELECTORS" => Some("100".to_string()),
            _ => None,
        };
        let overrides = CliOverrides {
            config_file: Some(path.clone()),
            ..CliOverrides::default()
        };

        let config = AppConfig::load_from_env(overrides, env).unwrap();
        assert!(config.split.log);
        assert_eq!(config.split.max_selectors, 100);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_cli_config_file_wins_over_env_path() {
        let temp = TempDir::new().unwrap();
        let from_env = temp.path().join("env.yaml");
        let from_cli = temp.path().join("cli.yaml");
        std::fs::write(&from_env, "split:\n  maxSelectors: 10\n").unwrap();
        std::fs::write(&from_cli, "split:\n  maxSelectors: 20\n").unwrap();

        let workspace = temp.path().to_string_lossy().into_owned();
        let env_path = from_env.to_string_lossy().into_owned();
        let env = |key: &str| match key {
            "BLESSED_WORKSPACE" => Some(workspace.clone()),
            "BLESSED_CONFIG" => Some(env_path.clone()),
            _ => None,
        };
        let overrides = CliOverrides {
            config_file: Some(from_cli),
            ..CliOverrides::default()
        };

        let config = AppConfig::load_from_env(overrides, env).unwrap();
        assert_eq!(config.split.max_selectors, 20);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().into_owned();
        let env = |key: &str| (key == "BLESSED_WORKSPACE").then(|| workspace.clone());
        let overrides = CliOverrides {
            config_file: Some(temp.path().join("nope.yaml")),
            ..CliOverrides::default()
        };

        let result = AppConfig::load_from_env(overrides, env);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_yaml_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "").unwrap();

        let config = AppConfig::in_workspace(temp.path()).merge_yaml(&path).unwrap();
        assert_eq!(config.split, SplitOptions::default());
    }

    #[test]
    fn test_merge_yaml_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "split: [1, 2").unwrap();

        let result = AppConfig::in_workspace(temp.path()).merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::in_workspace("/tmp").with_overrides(CliOverrides {
            workspace: Some(PathBuf::from("/srv")),
            config_file: None,
            log_level: None,
            verbose: true,
            no_color: false,
        });

        assert_eq!(config.workspace, PathBuf::from("/srv"));
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_zero_selectors() {
        let mut config = AppConfig::in_workspace("/tmp");
        assert!(config.validate().is_ok());
        config.split.max_selectors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_max_selectors() {
        assert_eq!(parse_max_selectors(" 4000 ").unwrap(), 4000);
        assert!(parse_max_selectors("lots").is_err());
    }
}
