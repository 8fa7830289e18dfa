//! Concrete listing providers and the registry builder.

pub mod bing;
pub mod duckduckgo;
pub mod google_places;
pub mod yelp;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use google_places::GooglePlacesProvider;
pub use yelp::YelpProvider;

use crate::config::SourceConfig;
use crate::provider::{ListingProvider, ProviderSet};
use crate::types::{ListingQuery, ProviderKind};

/// Create the provider implementation for `kind`.
pub fn provider_for(kind: ProviderKind, config: &SourceConfig) -> Box<dyn ListingProvider> {
    match kind {
        ProviderKind::Yelp => Box::new(YelpProvider::new(config)),
        ProviderKind::GooglePlaces => Box::new(GooglePlacesProvider::new(config)),
        ProviderKind::Bing => Box::new(BingProvider::new(config)),
        ProviderKind::DuckDuckGo => Box::new(DuckDuckGoProvider::new(config)),
    }
}

/// Build the registry for `kinds`.
///
/// API providers without a configured key are left out with a notice
/// rather than failing every run at fetch time.
pub fn build_providers(config: &SourceConfig, kinds: &[ProviderKind]) -> ProviderSet {
    let mut set = ProviderSet::new();
    for &kind in kinds {
        if !config.has_credentials(kind) {
            tracing::info!(provider = %kind, "no API key configured, skipping provider");
            continue;
        }
        set.insert(provider_for(kind, config));
    }
    set
}

/// Free-text query for the search-engine scrapers: term, location and an
/// optional `site:` restriction.
pub(crate) fn scrape_query(query: &ListingQuery, site_filter: &str) -> String {
    let site_filter = site_filter.trim();
    if site_filter.is_empty() {
        format!("{} {}", query.term, query.location)
    } else {
        format!("{} {} site:{site_filter}", query.term, query.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;

    #[test]
    fn scrape_query_appends_site_filter() {
        let q = ListingQuery::new("dentist", "Ottawa, ON");
        assert_eq!(scrape_query(&q, ".ca"), "dentist Ottawa, ON site:.ca");
        assert_eq!(scrape_query(&q, "  "), "dentist Ottawa, ON");
    }

    #[test]
    fn build_providers_skips_api_providers_without_keys() {
        let set = build_providers(&SourceConfig::default(), ProviderKind::all());
        assert_eq!(set.kinds(), vec![ProviderKind::Bing, ProviderKind::DuckDuckGo]);
    }

    #[test]
    fn build_providers_includes_keyed_providers_in_order() {
        let mut config = SourceConfig::default();
        config.yelp.api_key = ApiKey::new("y");
        config.google_places.api_key = ApiKey::new("g");
        let set = build_providers(&config, &[ProviderKind::GooglePlaces, ProviderKind::Yelp]);
        assert_eq!(set.kinds(), vec![ProviderKind::GooglePlaces, ProviderKind::Yelp]);
    }

    #[test]
    fn provider_for_matches_kind() {
        for &kind in ProviderKind::all() {
            assert_eq!(provider_for(kind, &SourceConfig::default()).kind(), kind);
        }
    }
}
