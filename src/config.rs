use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for loop-finder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public loop search options
    pub analysis: LoopOptions,

    /// Window restricting where the precise search may start a loop
    pub precise: PreciseSearchConfig,

    /// Candidate scoring settings
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.precise.validate()?;
        Ok(())
    }
}

/// Options accepted by `analyze_loop` and `find_loop_candidates`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopOptions {
    /// Shortest loop the precise search may return (seconds)
    pub min_duration: f64,

    /// Longest loop the precise search may return, and the length of the
    /// default loop for onset-less input (seconds)
    pub max_duration: f64,

    /// Minimum precise-search score accepted without falling back to
    /// candidate ranking
    pub confidence_threshold: f64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            min_duration: 0.5,
            max_duration: 8.0,
            confidence_threshold: 0.5,
        }
    }
}

impl LoopOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.min_duration.is_finite() || self.min_duration <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.min_duration".to_string(),
                value: self.min_duration.to_string()
            }.into());
        }

        if !self.max_duration.is_finite() || self.max_duration < self.min_duration {
            return Err(ConfigError::InvalidValue {
                key: "analysis.duration_range".to_string(),
                value: format!("{}-{}", self.min_duration, self.max_duration)
            }.into());
        }

        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.confidence_threshold".to_string(),
                value: self.confidence_threshold.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Search window for the precise loop search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreciseSearchConfig {
    /// Loops may not start before this time (seconds); skips the intro
    pub search_start: f64,

    /// Loops may not start after this fraction of the track; skips the outro
    pub search_end_fraction: f64,
}

impl Default for PreciseSearchConfig {
    fn default() -> Self {
        Self {
            search_start: 1.0,
            search_end_fraction: 0.8,
        }
    }
}

impl PreciseSearchConfig {
    fn validate(&self) -> Result<()> {
        if !self.search_start.is_finite() || self.search_start < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "precise.search_start".to_string(),
                value: self.search_start.to_string()
            }.into());
        }

        if !(0.0..=1.0).contains(&self.search_end_fraction) {
            return Err(ConfigError::InvalidValue {
                key: "precise.search_end_fraction".to_string(),
                value: self.search_end_fraction.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Candidate scoring configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score candidates on the rayon pool instead of the calling thread
    pub parallel: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}
