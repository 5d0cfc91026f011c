// Path: crates/meridian-types/src/config.rs
//! Node configuration: JSON-backed, versioned, with an enumerated effect per field.

use serde::{Deserialize, Serialize};

/// The current configuration schema version this crate knows how to read.
pub const CONFIG_VERSION: u32 = 1;

/// Logging configuration, layered under a default `info` filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    /// An `RUST_LOG`-style directive string, e.g. `"info,meridian_node=debug"`.
    #[serde(default = "default_log_directive")]
    pub directive: String,
}

fn default_log_directive() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            directive: default_log_directive(),
        }
    }
}

/// Top-level node configuration, mirroring the JSON schema in the design document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Schema version; a version below [`CONFIG_VERSION`] fails to load.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Bind address for gossip/query UDP traffic.
    #[serde(default = "default_address")]
    pub address: String,
    /// UDP port for gossip/query traffic. Default `7175`, test network `54300`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Size of the shared async I/O thread pool; `max(4, cpu_count)` if unset.
    #[serde(default)]
    pub io_threads: Option<usize>,
    /// Peers dialed at startup to seed the peer table.
    #[serde(default)]
    pub preconfigured_peers: Vec<String>,
    /// If set, block notifications are POSTed to this URL.
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Account that reward sweeps (the Rewarder's emitted `reward`/`receive` blocks) target.
    #[serde(default)]
    pub forward_reward_to: Option<String>,
    /// Rewarder rate limit: at most this many sends per UTC day.
    #[serde(default = "default_daily_forward_times")]
    pub daily_forward_times: u32,
    /// Caps the number of parallel election scheduler slots.
    #[serde(default = "default_election_concurrency")]
    pub election_concurrency: usize,
    /// Whether to maintain the optional rich-list auxiliary index.
    #[serde(default)]
    pub enable_rich_list: bool,
    /// Whether to maintain the optional delegator-list auxiliary index.
    #[serde(default)]
    pub enable_delegator_list: bool,
    /// URL of an external validator/weight feed, if configured.
    #[serde(default)]
    pub validator_url: Option<String>,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Filesystem path of the ledger's data file.
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7175
}
fn default_daily_forward_times() -> u32 {
    24
}
fn default_election_concurrency() -> usize {
    256
}
fn default_data_path() -> String {
    "data.ldb".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: default_version(),
            address: default_address(),
            port: default_port(),
            io_threads: None,
            preconfigured_peers: Vec::new(),
            callback_url: None,
            forward_reward_to: None,
            daily_forward_times: default_daily_forward_times(),
            election_concurrency: default_election_concurrency(),
            enable_rich_list: false,
            enable_delegator_list: false,
            validator_url: None,
            log: LogConfig::default(),
            data_path: default_data_path(),
        }
    }
}

impl Config {
    /// Parses a `Config` from a JSON string, rejecting schema versions newer than this
    /// crate supports. Versions older than [`CONFIG_VERSION`] are accepted (forward-compatible
    /// defaults fill in new fields); no migration engine is in scope.
    pub fn from_json(data: &str) -> Result<Self, crate::error::ConfigError> {
        let config: Config =
            serde_json::from_str(data).map_err(|e| crate::error::ConfigError::Parse(e.to_string()))?;
        if config.version > CONFIG_VERSION {
            return Err(crate::error::ConfigError::UnsupportedVersion(config.version));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed = Config::from_json(&json).expect("parse");
        assert_eq!(parsed.port, config.port);
    }

    #[test]
    fn rejects_future_schema_version() {
        let json = r#"{"version": 999}"#;
        assert!(matches!(
            Config::from_json(json),
            Err(crate::error::ConfigError::UnsupportedVersion(999))
        ));
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config = Config::from_json("{}").expect("parse");
        assert_eq!(config.port, 7175);
        assert_eq!(config.daily_forward_times, 24);
    }
}
