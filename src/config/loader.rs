//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers the base TOML file, the
//! environment-specific TOML file and `ORDER_RESOLUTION__*` environment
//! variables, later layers overriding earlier ones.

use super::error::{ConfigResult, ConfigurationError};
use super::ResolutionConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Base configuration file name inside the configuration directory
pub const BASE_CONFIG_FILE: &str = "order-resolution.toml";

/// Prefix for environment variable overrides, e.g.
/// `ORDER_RESOLUTION__RETRY__MAX_ATTEMPTS=5`
pub const ENV_PREFIX: &str = "ORDER_RESOLUTION";

const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ResolutionConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment,
    /// reading overrides from the process environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Load configuration with an explicit set of environment overrides.
    ///
    /// `overrides` replaces the process environment as the source of
    /// `ORDER_RESOLUTION__*` variables when given, which keeps tests
    /// independent of each other.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<config::Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            config_directory = %config_directory.display(),
            "Loading resolution configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment, overrides)?;
        config.validate()?;

        info!(
            environment = environment,
            max_attempts = config.retry.max_attempts,
            gate_timeout_seconds = ?config.decision_gate.timeout_seconds,
            unhandled_policy = ?config.issues.unhandled_policy,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables:
    /// `RESOLUTION_ENV || APP_ENV || "development"`
    pub fn detect_environment() -> String {
        env::var("RESOLUTION_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let dir = PathBuf::from(manifest_dir).join("config");
            if dir.is_dir() {
                return dir;
            }
        }
        PathBuf::from("config")
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<config::Map<String, String>>,
    ) -> ConfigResult<ResolutionConfig> {
        if environment.is_empty() {
            return Err(ConfigurationError::environment_config_error(
                environment,
                "environment name must not be empty",
            ));
        }

        let base_file = config_directory.join(BASE_CONFIG_FILE);
        let env_file = config_directory.join(format!("{environment}.toml"));

        debug!(
            base_file = %base_file.display(),
            base_present = base_file.exists(),
            env_file = %env_file.display(),
            env_present = env_file.exists(),
            "Resolving configuration layers"
        );

        let settings = config::Config::builder()
            .add_source(config::File::from(base_file).required(false))
            .add_source(config::File::from(env_file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
