//! Server configuration
//!
//! One TOML file with a `[server]` table for the HTTP listener and logging
//! and an `[engine]` table passed through to the scenario store.

use grading_scenario::{EngineConfig, ScenarioError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// HTTP listener and logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Socket to bind
    pub bind: SocketAddr,
    /// Filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener and logging
    pub server: ListenerConfig,
    /// Scenario engine
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// With bind address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.server.bind = bind;
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.server.log_format = format;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ScenarioError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ScenarioError::Config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns `ScenarioError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
