//! Configuration management for medianode
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use medianode::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Writing outputs to: {}", config.output.dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MEDIANODE__<section>__<key>`
//!
//! Examples:
//! - `MEDIANODE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `MEDIANODE__OUTPUT__DIR=/var/lib/medianode/output`
//! - `MEDIANODE__VIDEO__PRESET=veryfast`
//!
//! Provider API keys are only read from `GEMINI_API_KEY` and `OPENAI_API_KEY`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/medianode.toml`.
//! This can be overridden using the `MEDIANODE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, FontsConfig, GeminiConfig, HttpSettings, ModelsConfig, OpenAiConfig, OutputConfig,
    ProvidersConfig, ServerConfig, VideoConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`MEDIANODE__*`)
    /// 2. TOML file (default: `config/medianode.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides, `.env` and API keys still apply.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_with_secrets(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
