//! Configuration for the points ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Mutation policy
    pub policy: PolicyConfig,

    /// Actor cooldown configuration
    pub cooldown: CooldownConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/points"),
            service_name: "points-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDbConfig::default(),
            policy: PolicyConfig::default(),
            cooldown: CooldownConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 2,
        }
    }
}

/// Mutation policy, owned by configuration and enforced by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Whether a REMOVE may take a balance below zero
    pub allow_negative: bool,

    /// Smallest permissible mutation amount
    pub min_amount: i64,

    /// Largest permissible mutation amount
    pub max_amount: i64,

    /// Whether actors may mutate their own balance.
    /// One shared flag for both ADD and REMOVE, read by the command
    /// layer before it reaches the engine.
    pub allow_self_actions: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_negative: false,
            min_amount: 1,
            max_amount: 1_000_000,
            allow_self_actions: false,
        }
    }
}

impl PolicyConfig {
    /// Engine-facing policy value for one mutation call
    pub fn to_policy(&self) -> crate::types::Policy {
        crate::types::Policy {
            allow_negative: self.allow_negative,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
        }
    }
}

/// Per-actor cooldown window (caller-side rate limiting)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Enable the cooldown tracker
    pub enabled: bool,

    /// Window an actor must wait between mutations (seconds)
    pub window_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 30,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("POINTS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(v) = std::env::var("POINTS_ALLOW_NEGATIVE") {
            config.policy.allow_negative = v == "1" || v.eq_ignore_ascii_case("true");
        }

        if let Ok(v) = std::env::var("POINTS_ALLOW_SELF_ACTIONS") {
            config.policy.allow_self_actions = v == "1" || v.eq_ignore_ascii_case("true");
        }

        if let Ok(v) = std::env::var("POINTS_MIN_AMOUNT") {
            config.policy.min_amount = v
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid POINTS_MIN_AMOUNT: {}", e)))?;
        }

        if let Ok(v) = std::env::var("POINTS_MAX_AMOUNT") {
            config.policy.max_amount = v
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid POINTS_MAX_AMOUNT: {}", e)))?;
        }

        if let Ok(v) = std::env::var("POINTS_COOLDOWN_SECS") {
            config.cooldown.window_secs = v
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid POINTS_COOLDOWN_SECS: {}", e)))?;
        }

        Ok(config)
    }
}
