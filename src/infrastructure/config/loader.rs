use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::value::Dict;
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Environment variable prefix; `__` separates nested keys.
pub const ENV_PREFIX: &str = "PROVOST_";

const PROJECT_CONFIG: &str = ".provost/config.yaml";
const LOCAL_CONFIG: &str = ".provost/local.yaml";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid port: 0")]
    InvalidPort,

    #[error("Invalid agent_timeout_ms: must be greater than 0")]
    InvalidAgentTimeout,

    #[error("Invalid fan_out_max: must be at least 1")]
    InvalidFanOutMax,

    #[error("Invalid {field}: {value}. Must be between 0 and 1")]
    InvalidConfidence { field: &'static str, value: f64 },

    #[error("Invalid top_k: must be at least 1")]
    InvalidTopK,

    #[error("LLM provider config file not found: {0}")]
    MissingLlmConfig(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .provost/config.yaml
    /// 3. .provost/local.yaml
    /// 4. `llm.config_path`, if set, merged over the `llm` section
    /// 5. Environment variables (PROVOST_* prefix)
    pub fn load() -> Result<Config> {
        let files = [PathBuf::from(PROJECT_CONFIG), PathBuf::from(LOCAL_CONFIG)];
        let config = Self::extract(&files, true)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config = Self::extract(&[path.to_path_buf()], false)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn layered(files: &[PathBuf], llm_overlay: Option<Dict>, with_env: bool) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        for file in files {
            figment = figment.merge(Yaml::file(file));
        }
        if let Some(overlay) = llm_overlay {
            figment = figment.merge(Serialized::default("llm", overlay));
        }
        if with_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        figment
    }

    fn extract(files: &[PathBuf], with_env: bool) -> Result<Config> {
        let config: Config = Self::layered(files, None, with_env)
            .extract()
            .context("Failed to extract configuration from figment")?;

        let Some(llm_path) = config.llm.config_path.clone() else {
            return Ok(config);
        };
        if !Path::new(&llm_path).exists() {
            return Err(ConfigError::MissingLlmConfig(llm_path).into());
        }
        let overlay: Dict = Figment::from(Yaml::file(&llm_path))
            .extract()
            .with_context(|| format!("Failed to read LLM provider config {llm_path}"))?;
        tracing::debug!(path = %llm_path, "merging LLM provider config");

        Self::layered(files, Some(overlay), with_env)
            .extract()
            .context("Failed to extract configuration from figment")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(0));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !["json", "pretty"].contains(&config.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if !["daily", "hourly", "never"].contains(&config.logging.rotation.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let orchestration = &config.orchestration;
        if orchestration.agent_timeout_ms == 0 {
            return Err(ConfigError::InvalidAgentTimeout);
        }
        if orchestration.fan_out_max == 0 {
            return Err(ConfigError::InvalidFanOutMax);
        }
        if !(0.0..=1.0).contains(&orchestration.fan_out_min_confidence) {
            return Err(ConfigError::InvalidConfidence {
                field: "fan_out_min_confidence",
                value: orchestration.fan_out_min_confidence,
            });
        }
        if orchestration.fallback_agent.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "orchestration.fallback_agent cannot be empty".to_string(),
            ));
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if config.retrieval.embedding_dimension == 0 {
            return Err(ConfigError::ValidationFailed(
                "retrieval.embedding_dimension must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
