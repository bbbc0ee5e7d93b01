//! Conversion service configuration
//!
//! Loaded from the `[conversion]` table of `emblem.toml`, or standalone:
//!
//! ```toml
//! cache_capacity = 512
//! eviction_percent = 25
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A field is out of range
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Tuning for the converter resolution cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Maximum number of cached resolutions
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Share of the capacity evicted at once when the cache overflows
    #[serde(default = "default_eviction_percent")]
    pub eviction_percent: u8,
}

fn default_cache_capacity() -> usize {
    256
}

fn default_eviction_percent() -> u8 {
    25
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            eviction_percent: default_eviction_percent(),
        }
    }
}

impl ConversionConfig {
    /// Parse and validate from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConversionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.eviction_percent == 0 || self.eviction_percent > 100 {
            return Err(ConfigError::ValidationError(format!(
                "eviction_percent must be within 1..=100, got {}",
                self.eviction_percent
            )));
        }
        Ok(())
    }

    /// Number of entries evicted per overflow
    pub fn eviction_batch(&self) -> usize {
        (self.cache_capacity * self.eviction_percent as usize / 100).max(1)
    }
}
