use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// Schema version sent with every request as the `v` query parameter.
pub const API_VERSION: &str = "1.0.3";

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Root of the platform Bot API, e.g. `https://botapi.example.com/`.
    pub base_url: String,
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub version: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Maximum number of updates per fetched page.
    #[serde(default = "default_poll_limit")]
    pub limit: u32,
    /// Seconds the server may hold a long-poll request open. This is a
    /// server-side hold time, not a client deadline.
    #[serde(default = "default_poll_timeout")]
    pub timeout: u32,
    /// Seconds to pause between fetches once the backlog is drained.
    #[serde(default = "default_poll_pause")]
    pub pause: u64,
    /// Update types to ask the server for; empty means everything.
    #[serde(default)]
    pub types: Vec<String>,
    /// Capacity of the delivery channel. A slow consumer blocks the poller
    /// once this many updates are buffered, which throttles fetching.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_poll_limit() -> u32 {
    50
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_poll_pause() -> u64 {
    1
}

fn default_channel_capacity() -> usize {
    32
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            limit: default_poll_limit(),
            timeout: default_poll_timeout(),
            pause: default_poll_pause(),
            types: Vec::new(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}
