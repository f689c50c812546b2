//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

use serde::Deserialize;

use crate::blocklist::BlockListConfig;
use crate::bus::MessagingConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SMS_SENDER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SMS_SENDER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SMS_SENDER_LOG";

/// Settings taken from the environment as raw text.
///
/// Typed env parsing would read `007` as the integer 7; credentials must keep
/// their exact characters.
const VERBATIM_ENV_KEYS: &[&str] = &[
    "messaging.kafka.sasl_username",
    "messaging.kafka.sasl_password",
];

/// Environment variable name for a dotted settings key.
fn env_var_for(key: &str) -> String {
    format!(
        "{}__{}",
        CONFIG_ENV_PREFIX,
        key.replace('.', "__").to_uppercase()
    )
}

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delivery event broker.
    pub messaging: MessagingConfig,
    /// Destination block list.
    pub blocklist: BlockListConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` separated
    ///
    /// Credential keys in `VERBATIM_ENV_KEYS` are read from the environment as
    /// plain strings, never parsed as numbers or booleans.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("blocklist.baseline"),
        );

        for key in VERBATIM_ENV_KEYS {
            if let Ok(value) = std::env::var(env_var_for(key)) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder.build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.messaging.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("messaging.topic is required".to_string()));
        }
        if self.blocklist.key.trim().is_empty() {
            return Err(ConfigError::Invalid("blocklist.key is required".to_string()));
        }
        if self.messaging.channel.partitions < 1 {
            return Err(ConfigError::Invalid(
                "messaging.channel.partitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
