use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::mappings::HandlerKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NetworkType {
    #[default]
    Polkadot,
    Kusama,
    Westend,
}

impl NetworkType {
    pub fn ss58_prefix(&self) -> u16 {
        match self {
            NetworkType::Polkadot => 0,
            NetworkType::Kusama => 2,
            NetworkType::Westend => 42,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NetworkType::Polkadot => "polkadot",
            NetworkType::Kusama => "kusama",
            NetworkType::Westend => "westend",
        }
    }
}

impl FromStr for NetworkType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polkadot" => Ok(NetworkType::Polkadot),
            "kusama" => Ok(NetworkType::Kusama),
            "westend" => Ok(NetworkType::Westend),
            other => Err(ConfigError::ValidationError(format!(
                "unknown network: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Snapshot file name, resolved against `Config::data_dir` when relative.
    pub snapshot_file: PathBuf,
    /// Verify the SHA-512 trailer when loading a snapshot.
    pub verify_checksum: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            snapshot_file: PathBuf::from("rewards.snapshot"),
            verify_checksum: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// Log every handler invocation at debug level.
    pub log_handlers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_handlers: false,
        }
    }
}

/// Binds one handler to one event type (`section.method`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerMapping {
    pub handler: String,
    pub section: String,
    pub method: String,
}

impl HandlerMapping {
    pub fn new(handler: &str, section: &str, method: &str) -> Self {
        Self {
            handler: handler.to_string(),
            section: section.to_string(),
            method: method.to_string(),
        }
    }

    pub fn event_type(&self) -> String {
        format!("{}.{}", self.section, self.method)
    }
}

/// Staking handlers for both runtime eras. `Rewarded` replaced `Reward` in
/// a runtime upgrade (around block 6,500,000 on Polkadot); the payload is
/// unchanged.
pub fn default_handlers() -> Vec<HandlerMapping> {
    vec![
        HandlerMapping::new("handleStakingRewarded", "staking", "Rewarded"),
        HandlerMapping::new("handleSumRewarded", "staking", "Rewarded"),
        HandlerMapping::new("handleStakingReward", "staking", "Reward"),
        HandlerMapping::new("handleSumReward", "staking", "Reward"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkType,
    pub data_dir: PathBuf,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default = "default_handlers")]
    pub handlers: Vec<HandlerMapping>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("./data"))
            .join("reward-indexer");

        Self {
            network: NetworkType::Polkadot,
            data_dir,
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            handlers: default_handlers(),
        }
    }
}

impl Config {
    pub fn new(network: NetworkType, data_dir: Option<PathBuf>) -> Self {
        let mut config = Self {
            network,
            ..Self::default()
        };

        if let Some(dir) = data_dir {
            config.data_dir = dir;
        } else if network != NetworkType::Polkadot {
            config.data_dir = config.data_dir.join(network.display_name());
        }

        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Every mapping must name a known handler and a full event type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handlers.is_empty() {
            return Err(ConfigError::ValidationError(
                "no handlers registered".to_string(),
            ));
        }
        for mapping in &self.handlers {
            if mapping.section.is_empty() || mapping.method.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "handler {} has an incomplete event type '{}'",
                    mapping.handler,
                    mapping.event_type()
                )));
            }
            HandlerKind::from_str(&mapping.handler)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        if self.database.snapshot_file.is_absolute() {
            self.database.snapshot_file.clone()
        } else {
            self.data_dir.join(&self.database.snapshot_file)
        }
    }

    pub fn get_config_file(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Create the data directory and write a default config file into it.
/// Write a default config to `config_path`, or to `<data_dir>/config.toml`
/// when no path is given. Returns the config and where it was written.
pub fn create_default_config(
    network: NetworkType,
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<(Config, PathBuf), ConfigError> {
    let config = Config::new(network, data_dir);
    let config_path = config_path.unwrap_or_else(|| config.get_config_file());

    std::fs::create_dir_all(&config.data_dir).map_err(|e| ConfigError::IoError(e.to_string()))?;
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    config.to_file(&config_path)?;

    Ok((config, config_path))
}
