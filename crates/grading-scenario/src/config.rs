//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use crate::error::ScenarioError;
use grading_core::{GradeLadder, Precision};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default relative tolerance when checking reconstructed inputs
pub const DEFAULT_RECONSTRUCTION_TOLERANCE: f64 = 1e-6;

/// Scenario engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Currency decimal places for derived bands
    pub precision: Precision,
    /// Relative tolerance for stored vs reconstructed vertical inputs
    pub reconstruction_tolerance: f64,
    /// Ladder used when a request does not carry one
    pub default_ladder: Option<GradeLadder>,
    /// JSON file backing the store; in-memory when absent
    pub data_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With precision
    #[inline]
    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// With reconstruction tolerance
    #[inline]
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.reconstruction_tolerance = tolerance;
        self
    }

    /// With default ladder
    #[inline]
    #[must_use]
    pub fn with_default_ladder(mut self, ladder: GradeLadder) -> Self {
        self.default_ladder = Some(ladder);
        self
    }

    /// With data file
    #[inline]
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ScenarioError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ScenarioError::Config(e.to_string()))?;
        config.validate()?;
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

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `ScenarioError::Config` for a non-finite or negative tolerance
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.reconstruction_tolerance.is_finite() || self.reconstruction_tolerance < 0.0 {
            return Err(ScenarioError::Config(format!(
                "reconstruction_tolerance must be a non-negative number, got {}",
                self.reconstruction_tolerance
            )));
        }
        if self.precision.decimals() > Precision::MAX_DECIMALS {
            return Err(ScenarioError::Config(format!(
                "precision must be at most {} decimals",
                Precision::MAX_DECIMALS
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            reconstruction_tolerance: DEFAULT_RECONSTRUCTION_TOLERANCE,
            default_ladder: None,
            data_path: None,
        }
    }
}
