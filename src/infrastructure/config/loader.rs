use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid chunking: chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Invalid top_k: must be at least 1")]
    InvalidTopK,

    #[error("Invalid {0}: timeout must be at least 1 second")]
    ZeroTimeout(&'static str),

    #[error("Invalid {0}: retention limit must be at least 1")]
    InvalidRetention(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

const ENV_PREFIX: &str = "GENAGENT_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .genagent/config.yaml (project config)
    /// 3. .genagent/local.yaml (local overrides, optional)
    /// 4. Environment variables (GENAGENT_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".genagent/config.yaml"))
            .merge(Yaml::file(".genagent/local.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment variables still
    /// take precedence.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let knowledge = &config.knowledge;
        if knowledge.chunk_size == 0 || knowledge.chunk_overlap >= knowledge.chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: knowledge.chunk_size,
                overlap: knowledge.chunk_overlap,
            });
        }

        if knowledge.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }

        if knowledge.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("knowledge.timeout_secs"));
        }

        if knowledge.embedding.dimension == 0 {
            return Err(ConfigError::ValidationFailed(
                "knowledge.embedding.dimension must be at least 1".to_string(),
            ));
        }

        if config.runtime.model_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("runtime.model_timeout_secs"));
        }

        let memory = &config.runtime.memory;
        if memory.max_threads == 0 {
            return Err(ConfigError::InvalidRetention("runtime.memory.max_threads"));
        }
        if memory.max_messages_per_thread == 0 {
            return Err(ConfigError::InvalidRetention(
                "runtime.memory.max_messages_per_thread",
            ));
        }

        if config.catalog_path.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "catalog_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
