//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [autosave]
//! delay_ms = 1000
//! save_capability = "save-data"
//!
//! [storage]
//! key_prefix = "planboard:"
//! ```
//!
//! Missing sections and keys fall back to their defaults.
//! `PLANBOARD_AUTOSAVE_DELAY_MS` overrides the debounce delay.

use crate::access::capabilities;
use crate::error::ConfigError;
use planboard_storage::DEFAULT_KEY_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `autosave.delay_ms`
pub const ENV_AUTOSAVE_DELAY_MS: &str = "PLANBOARD_AUTOSAVE_DELAY_MS";

/// Default debounce delay in milliseconds
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1_000;

/// Planboard configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanboardConfig {
    /// Auto-save behavior
    pub autosave: AutoSaveSettings,
    /// Storage layout
    pub storage: StorageSettings,
}

/// Auto-save settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveSettings {
    /// Debounce delay in milliseconds
    pub delay_ms: u64,
    /// Capability checked before every write
    pub save_capability: String,
}

impl AutoSaveSettings {
    /// Debounce delay
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            save_capability: capabilities::SAVE_DATA.to_string(),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Prefix of every physical key
    pub key_prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl PlanboardConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce delay
    #[inline]
    #[must_use]
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With save capability name
    #[inline]
    #[must_use]
    pub fn with_save_capability(mut self, capability: impl Into<String>) -> Self {
        self.autosave.save_capability = capability.into();
        self
    }

    /// With physical key prefix
    #[inline]
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage.key_prefix = prefix.into();
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the text does not match the schema
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidEnv` if a set variable cannot be parsed
    pub fn apply_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_AUTOSAVE_DELAY_MS) {
            self.autosave.delay_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_AUTOSAVE_DELAY_MS.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(self)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidEnv` if a set variable cannot be parsed
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }
}
