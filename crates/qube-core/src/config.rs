//! Application configuration and persistence utilities.
//!
//! A single JSON file under the platform config directory holds:
//! - Network and endpoint overrides
//! - The last connected wallet kind (for reconnect)
//! - Staking preferences (validator, memo, read policy)

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Network, ReadPolicy, ValidatorConfig, WalletKind};

/// Memo attached to transactions when the caller gives none.
pub const DEFAULT_MEMO: &str = "Staked via QubeNode";

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Other configuration error.
    #[error("{0}")]
    Other(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Selected network.
    #[serde(default)]
    pub network: Network,
    /// Custom REST (LCD) endpoint, overrides the network presets.
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Custom EVM JSON-RPC endpoint.
    #[serde(default)]
    pub evm_rpc_url: Option<String>,
    /// Wallet kind of the last successful connection.
    #[serde(default)]
    pub last_wallet: Option<WalletKind>,
    /// Reconnect the remembered wallet on startup.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
    /// Validator used by delegate/undelegate/claim.
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// How failed reads are handled while refreshing the overview.
    #[serde(default)]
    pub read_policy: ReadPolicy,
    #[serde(default = "default_memo")]
    pub default_memo: String,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_memo() -> String {
    DEFAULT_MEMO.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            rest_url: None,
            evm_rpc_url: None,
            last_wallet: None,
            auto_reconnect: true,
            validator: ValidatorConfig::default(),
            read_policy: ReadPolicy::Strict,
            default_memo: default_memo(),
        }
    }
}

impl AppConfig {
    /// Wallet kind to reconnect on startup, if enabled.
    pub fn reconnect_target(&self) -> Option<WalletKind> {
        if self.auto_reconnect {
            self.last_wallet
        } else {
            None
        }
    }
}

// ==================== Path Utilities ====================

/// Get the config directory.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("com", "qubenode", "qubenode")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))
}

/// Get the config file path.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    get_config_dir().map(|dir| dir.join("config.json"))
}

// ==================== Config I/O ====================

/// Load configuration from disk.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path()?)
}

/// Save configuration to disk.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path()?)
}

/// Load configuration from a given file; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a given file, creating parent directories.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
