//! Metadata configuration
//!
//! Loaded from `emblem.toml`:
//!
//! ```toml
//! [conversion]
//! cache_capacity = 512
//!
//! [placeholders]
//! prefix = "${"
//! suffix = "}"
//! default_separator = ":"
//!
//! [builder]
//! inherit_all = false
//! ```

use std::path::Path;

use emblem_convert::ConversionConfig;
use serde::{Deserialize, Serialize};

pub use emblem_convert::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Conversion cache tuning
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Placeholder syntax
    #[serde(default)]
    pub placeholders: PlaceholderConfig,

    /// Builder behavior
    #[serde(default)]
    pub builder: BuilderConfig,
}

/// Placeholder syntax
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceholderConfig {
    /// Opening marker
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Closing marker
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Separates a key from its default value
    #[serde(default = "default_separator")]
    pub default_separator: String,
}

fn default_prefix() -> String {
    "${".to_string()
}

fn default_suffix() -> String {
    "}".to_string()
}

fn default_separator() -> String {
    ":".to_string()
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
            default_separator: default_separator(),
        }
    }
}

/// Builder behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Inherit every annotation from supertypes and overridden members, not
    /// only those whose type is marked inherited
    #[serde(default)]
    pub inherit_all: bool,
}

impl MetadataConfig {
    /// Parse and validate from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MetadataConfig = toml::from_str(content)?;
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
        self.conversion.validate()?;
        self.placeholders.validate()
    }
}

impl PlaceholderConfig {
    /// Reject empty markers
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() || self.suffix.is_empty() {
            return Err(ConfigError::ValidationError(
                "placeholder prefix and suffix must not be empty".to_string(),
            ));
        }
        if self.default_separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "placeholder default_separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
