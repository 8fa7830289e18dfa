//! Configuration for the canlist application.
//!
//! A TOML file holds run defaults and the provider settings passed through to
//! [`canlist_sources::SourceConfig`]. API keys may instead come from the
//! environment so they never need to be written to disk.

use canlist_sources::{ApiKey, ProviderKind, SourceConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cities;
use crate::error::{CanlistError, Result};

/// Environment variable holding the Yelp Fusion API key.
pub const YELP_API_KEY_ENV: &str = "CANLIST_YELP_API_KEY";
/// Environment variable holding the Google Places API key.
pub const GOOGLE_API_KEY_ENV: &str = "CANLIST_GOOGLE_API_KEY";

/// Smallest accepted listing target.
pub const MIN_TARGET: usize = 1;
/// Largest accepted listing target.
pub const MAX_TARGET: usize = 500;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Defaults for `canlist search` flags.
    pub search: SearchDefaults,
    /// Provider, pacing and cache settings.
    pub sources: SourceConfig,
}

/// Defaults applied when a flag is not given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// Number of unique listings to collect.
    pub target: usize,
    /// Providers to query, highest priority first.
    ///
    /// The scraping fallbacks are opt-in.
    pub providers: Vec<ProviderKind>,
    /// Where the spreadsheet is written.
    pub output: PathBuf,
    /// Cities searched by `--canada-wide`, in order.
    pub cities: Vec<String>,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            target: 100,
            providers: vec![ProviderKind::Yelp, ProviderKind::GooglePlaces],
            output: PathBuf::from("business_listings.csv"),
            cities: cities::default_cities(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CanlistError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CanlistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/canlist/config.toml`.
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("canlist").join("config.toml"),
            None => PathBuf::from(".canlist").join("config.toml"),
        }
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise. API keys from the
    /// environment override those in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    tracing::debug!(path = %default_path.display(), "loading default config");
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Replace API keys with values from `lookup` where it has one.
    ///
    /// Blank values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(YELP_API_KEY_ENV).and_then(ApiKey::new) {
            self.sources.yelp.api_key = Some(key);
        }
        if let Some(key) = lookup(GOOGLE_API_KEY_ENV).and_then(ApiKey::new) {
            self.sources.google_places.api_key = Some(key);
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`CanlistError::Config`] for an out-of-range target, an empty
    /// provider list, a blank city or invalid provider settings.
    pub fn validate(&self) -> Result<()> {
        validate_target(self.search.target)?;
        if self.search.providers.is_empty() {
            return Err(CanlistError::Config(
                "search.providers must name at least one provider".into(),
            ));
        }
        if self.search.cities.iter().any(|c| c.trim().is_empty()) {
            return Err(CanlistError::Config(
                "search.cities must not contain blank entries".into(),
            ));
        }
        self.sources
            .validate()
            .map_err(|e| CanlistError::Config(e.to_string()))
    }
}

/// Check that `target` lies within [`MIN_TARGET`]..=[`MAX_TARGET`].
///
/// # Errors
///
/// Returns [`CanlistError::Config`] when it does not.
pub fn validate_target(target: usize) -> Result<()> {
    if (MIN_TARGET..=MAX_TARGET).contains(&target) {
        Ok(())
    } else {
        Err(CanlistError::Config(format!(
            "target must be between {MIN_TARGET} and {MAX_TARGET}, got {target}"
        )))
    }
}
