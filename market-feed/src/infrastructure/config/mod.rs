//! Configuration loading for the market feed simulator
//!
//! A JSON file provides the settings; `HOST`, `PORT`, `MAX_ROWS`,
//! `REFRESH_RATE_MS` and `CATALOG_PATH` environment variables override it.
//! Every field has a default, so `{}` is a valid configuration.

use crate::error::ConfigError;
use crate::infrastructure::generator::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration for the feed simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Service name, used in startup logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Leading catalog slots that are listed in the handshake and mutated
    /// by the generator
    #[serde(default = "default_max_rows", alias = "MaxRows")]
    pub max_rows: usize,

    /// Delay between ticks in milliseconds
    #[serde(default = "default_refresh_rate_ms", alias = "RefreshRateMs")]
    pub refresh_rate_ms: u64,

    /// Capacity of the change event channel between generator and dispatcher
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Path of the JSON catalog file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Random seed for reproducible ticks
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_name() -> String {
    "Market Data Simulator".to_string()
}

fn default_max_rows() -> usize {
    100
}

fn default_refresh_rate_ms() -> u64 {
    500
}

fn default_event_capacity() -> usize {
    1024
}

fn default_catalog_path() -> String {
    "data/items.json".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            server: ServerConfig::default(),
            max_rows: default_max_rows(),
            refresh_rate_ms: default_refresh_rate_ms(),
            event_capacity: default_event_capacity(),
            catalog_path: default_catalog_path(),
            seed: None,
        }
    }
}

impl FeedConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                source,
            })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from process environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_value("PORT", &port)?;
        }
        if let Some(rows) = lookup("MAX_ROWS") {
            self.max_rows = parse_value("MAX_ROWS", &rows)?;
        }
        if let Some(rate) = lookup("REFRESH_RATE_MS") {
            self.refresh_rate_ms = parse_value("REFRESH_RATE_MS", &rate)?;
        }
        if let Some(path) = lookup("CATALOG_PATH") {
            self.catalog_path = path;
        }
        Ok(())
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }

    /// Bind address `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        let config = GeneratorConfig::new(self.max_rows, self.refresh_rate());
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path upgraded to a WebSocket; every other path is left unrouted
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Frames buffered per connection before tick payloads are dropped
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_outbound_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}
