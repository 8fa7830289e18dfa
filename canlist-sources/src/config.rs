//! Provider configuration with sensible defaults.
//!
//! [`SourceConfig`] carries everything a provider needs at call time:
//! credentials, endpoints, timeouts, politeness delays and the per-provider
//! overfetch factor. It is passed explicitly to every provider; nothing is
//! read from process-wide state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::types::ProviderKind;

/// An API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// The raw key, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Yelp Fusion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YelpSettings {
    /// Bearer token for the Fusion API. The provider is skipped without one.
    pub api_key: Option<ApiKey>,
    /// API root, overridable for testing.
    pub base_url: String,
    /// Multiplier applied to the target when fetching.
    pub overfetch_factor: usize,
}

impl Default for YelpSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.yelp.com".into(),
            overfetch_factor: 1,
        }
    }
}

/// Google Places API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GooglePlacesSettings {
    /// Maps Platform key. The provider is skipped without one.
    pub api_key: Option<ApiKey>,
    /// API root, overridable for testing.
    pub base_url: String,
    /// Multiplier applied to the target when fetching.
    pub overfetch_factor: usize,
    /// Whether to call Place Details per result to resolve website and phone.
    pub resolve_contacts: bool,
    /// Wait before requesting the next page; Google rejects page tokens
    /// that are used too soon after they are issued.
    pub page_token_delay_ms: u64,
}

impl Default for GooglePlacesSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://maps.googleapis.com".into(),
            overfetch_factor: 1,
            resolve_contacts: true,
            page_token_delay_ms: 2_000,
        }
    }
}

/// Default Bing endpoint root.
pub const BING_BASE_URL: &str = "https://www.bing.com";
/// Default DuckDuckGo HTML endpoint root.
pub const DUCKDUCKGO_BASE_URL: &str = "https://html.duckduckgo.com";

/// Settings for a search-page scraping provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Search endpoint root, overridable for testing. `None` uses the
    /// engine's public endpoint.
    pub base_url: Option<String>,
    /// Multiplier applied to the target when fetching.
    pub overfetch_factor: usize,
    /// Site restriction appended to the query, e.g. `.ca`. Empty disables it.
    pub site_filter: String,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            overfetch_factor: 2,
            site_filter: ".ca".into(),
        }
    }
}

/// Configuration shared by all providers and the aggregator.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Per-call HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Random delay range in milliseconds `(min, max)` between successive
    /// calls to the same host. `(0, 0)` disables the delay.
    pub request_delay_ms: (u64, u64),
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// How long cached result streams stay valid, in seconds. 0 disables
    /// caching.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached result streams.
    pub cache_capacity: u64,
    /// How many of the highest-priority providers wide mode queries per city.
    pub wide_provider_count: usize,
    /// Yelp Fusion settings.
    pub yelp: YelpSettings,
    /// Google Places settings.
    pub google_places: GooglePlacesSettings,
    /// Bing scraping settings.
    pub bing: ScraperSettings,
    /// DuckDuckGo scraping settings.
    pub duckduckgo: ScraperSettings,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            request_delay_ms: (200, 500),
            user_agent: None,
            cache_ttl_seconds: 600,
            cache_capacity: 100,
            wide_provider_count: 1,
            yelp: YelpSettings::default(),
            google_places: GooglePlacesSettings::default(),
            bing: ScraperSettings::default(),
            duckduckgo: ScraperSettings::default(),
        }
    }
}

impl SourceConfig {
    /// Overfetch multiplier for `kind`. Never less than 1, so a provider is
    /// always asked for at least the target.
    pub fn overfetch_factor(&self, kind: ProviderKind) -> usize {
        let factor = match kind {
            ProviderKind::Yelp => self.yelp.overfetch_factor,
            ProviderKind::GooglePlaces => self.google_places.overfetch_factor,
            ProviderKind::Bing => self.bing.overfetch_factor,
            ProviderKind::DuckDuckGo => self.duckduckgo.overfetch_factor,
        };
        factor.max(1)
    }

    /// Effective endpoint root for `kind`.
    pub fn base_url(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::Yelp => &self.yelp.base_url,
            ProviderKind::GooglePlaces => &self.google_places.base_url,
            ProviderKind::Bing => self.bing.base_url.as_deref().unwrap_or(BING_BASE_URL),
            ProviderKind::DuckDuckGo => self
                .duckduckgo
                .base_url
                .as_deref()
                .unwrap_or(DUCKDUCKGO_BASE_URL),
        }
    }

    /// Whether credentials are present for `kind`. Scrapers need none.
    pub fn has_credentials(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Yelp => self.yelp.api_key.is_some(),
            ProviderKind::GooglePlaces => self.google_places.api_key.is_some(),
            ProviderKind::Bing | ProviderKind::DuckDuckGo => true,
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    /// - `wide_provider_count` must be greater than 0
    /// - every provider base URL must parse
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.timeout_seconds == 0 {
            return Err(SourceError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(SourceError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        if self.wide_provider_count == 0 {
            return Err(SourceError::Config(
                "wide_provider_count must be greater than 0".into(),
            ));
        }
        for &kind in ProviderKind::all() {
            let base = self.base_url(kind);
            if url::Url::parse(base).is_err() {
                return Err(SourceError::Config(format!(
                    "{} base_url is not a valid URL: {base}",
                    kind.slug()
                )));
            }
        }
        Ok(())
    }
}
