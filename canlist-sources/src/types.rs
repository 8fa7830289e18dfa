//! Core types: listing records, provider identification, and queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::orchestrator::identity::identity_key;

/// Attribute holding the provider-specific listing page URL.
pub const ATTR_LISTING_URL: &str = "listing_url";
/// Attribute holding the business's own website.
pub const ATTR_WEBSITE: &str = "website";
/// Attribute holding a phone number, passed through as the provider formats it.
pub const ATTR_PHONE: &str = "phone";
/// Attribute holding a single-line postal address.
pub const ATTR_ADDRESS: &str = "address";
/// Attribute naming the provider that produced the record.
pub const ATTR_SOURCE: &str = "source";
/// Attribute naming the city a wide-mode record was found under.
pub const ATTR_CITY: &str = "city";

/// One discovered business listing.
///
/// Records carry no identity beyond [`Record::identity_key`]: two records
/// with the same key are duplicates even when names or attributes differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display name. Not unique.
    pub name: String,
    /// Canonical URL used for de-duplication. Empty keys are never emitted
    /// by the aggregator.
    pub identity_key: String,
    /// Secondary fields such as website or phone. A missing key means
    /// "unknown".
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    /// Build a record whose identity key is the canonical form of `url`.
    pub fn new(name: impl Into<String>, url: &str) -> Self {
        Self {
            name: name.into(),
            identity_key: identity_key(url),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute. Empty values are skipped so that "unknown"
    /// stays distinguishable from a real value.
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.attributes.insert(key.to_owned(), value.to_owned());
        }
        self
    }

    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Listing sources the aggregator can query.
///
/// The order of kinds in an aggregation request is the de-duplication
/// tie-break: earlier providers win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Yelp Fusion business search. Structured data, highest trust.
    Yelp,
    /// Google Places nearby search with optional website/phone resolution.
    GooglePlaces,
    /// Bing web search scrape restricted to `.ca` sites.
    Bing,
    /// DuckDuckGo HTML search scrape restricted to `.ca` sites.
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
}

impl ProviderKind {
    /// Returns the human-readable name of this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yelp => "Yelp",
            Self::GooglePlaces => "Google Places",
            Self::Bing => "Bing",
            Self::DuckDuckGo => "DuckDuckGo",
        }
    }

    /// Returns the identifier used on the command line and in config files.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Yelp => "yelp",
            Self::GooglePlaces => "google-places",
            Self::Bing => "bing",
            Self::DuckDuckGo => "duckduckgo",
        }
    }

    /// Whether this provider scrapes free-text search results rather than
    /// calling a structured business-data API.
    pub fn is_scraper(&self) -> bool {
        matches!(self, Self::Bing | Self::DuckDuckGo)
    }

    /// Returns all providers in default priority order.
    pub fn all() -> &'static [ProviderKind] {
        &[Self::Yelp, Self::GooglePlaces, Self::Bing, Self::DuckDuckGo]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.slug() == wanted || kind.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|k| k.slug()).collect();
                format!("unknown provider '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// What a provider is asked to search for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingQuery {
    /// Business category or keywords, e.g. `"dentist"`.
    pub term: String,
    /// City or province, e.g. `"Toronto, ON"`.
    pub location: String,
}

impl ListingQuery {
    /// Create a query from a term and a location.
    pub fn new(term: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            location: location.into(),
        }
    }
}
