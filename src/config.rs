use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};

fn default_native_symbol() -> String {
    "ELF".to_string()
}

fn default_fiat_symbol() -> String {
    "USD".to_string()
}

fn default_priced_symbols() -> Vec<String> {
    ["ELF", "USDT", "BTC", "ETH"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Default lifetime of a cached current valuation (5 minutes).
fn default_current_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

/// Default lock lease; reclaims locks abandoned by cancelled runs (30 minutes).
fn default_lock_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_lock_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_lock_wait_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Locking and caching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// How long a current valuation is served from cache before recomputing.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub current_ttl: Duration,

    /// Lease on every acquired lock.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub lock_ttl: Duration,

    /// Delay between retries while another caller holds an address lock.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub lock_poll_interval: Duration,

    /// Give up waiting for an address lock after this long.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub lock_wait_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            current_ttl: default_current_ttl(),
            lock_ttl: default_lock_ttl(),
            lock_poll_interval: default_lock_poll_interval(),
            lock_wait_timeout: default_lock_wait_timeout(),
        }
    }
}

/// Valuation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unit every holding is converted into before summing.
    pub native_symbol: String,

    /// Fiat unit used for the second set of totals and as the price quote.
    pub fiat_symbol: String,

    /// Decimal places kept on native-unit prices and values.
    pub native_decimals: u32,

    /// Decimal places kept on fiat values.
    pub fiat_decimals: u32,

    /// Holder records requested per page.
    pub page_size: usize,

    /// Fungible symbols that have a fiat price. Everything else values as zero.
    pub priced_symbols: Vec<String>,

    pub guard: GuardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            native_symbol: default_native_symbol(),
            fiat_symbol: default_fiat_symbol(),
            native_decimals: 8,
            fiat_decimals: 2,
            page_size: 1000,
            priced_symbols: default_priced_symbols(),
            guard: GuardConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be greater than zero");
        }
        if self.native_symbol.trim().is_empty() || self.fiat_symbol.trim().is_empty() {
            anyhow::bail!("native_symbol and fiat_symbol must be set");
        }
        if self.guard.lock_poll_interval.is_zero() {
            anyhow::bail!("guard.lock_poll_interval must be greater than zero");
        }
        Ok(())
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./tokenworth.toml` if it exists in current directory
/// 2. `tokenworth/tokenworth.toml` under the XDG config directory
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("tokenworth.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tokenworth").join("tokenworth.toml");
    }

    local_config
}
