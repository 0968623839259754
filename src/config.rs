//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The feed cadence and history retention have sensible defaults so a
//! minimal config file works out of the box.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    /// Accounts seeded into the in-memory ledger at startup.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Price refresh cadence. Fixed and independent of bet activity.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Upper bound on a single price-source request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BettingConfig {
    /// How many settled bets to keep for the history view.
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub name: String,
    pub balance: Decimal,
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_history_retention() -> usize {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            history_retention: default_history_retention(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
