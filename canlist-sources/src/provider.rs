//! Trait definition for pluggable listing providers.
//!
//! Each source (Yelp, Google Places, Bing, DuckDuckGo) implements
//! [`ListingProvider`] to give the aggregator a uniform way to fetch a
//! ranked stream of [`Record`]s.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{ListingQuery, ProviderKind, Record};

/// A pluggable listing source.
///
/// Implementors handle their own:
///
/// - URL construction and query encoding
/// - HTTP requests, including any per-record secondary lookups
/// - Response parsing into [`Record`]s with canonical identity keys
/// - Polite pacing between their own requests
///
/// The trait is object-safe so that the aggregator can walk a
/// priority-ordered list of heterogeneous providers.
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Fetch up to `limit` records for `query`, in the provider's rank order.
    ///
    /// Returning more than `limit` records is a contract violation; the
    /// aggregator truncates such streams.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on network, authentication or parse failure.
    /// The aggregator treats any error as an empty stream.
    async fn fetch(&self, query: &ListingQuery, limit: usize) -> Result<Vec<Record>, SourceError>;

    /// Which [`ProviderKind`] this implementation represents.
    fn kind(&self) -> ProviderKind;
}

/// The providers available to an aggregation run, looked up by kind.
///
/// An [`crate::orchestrator::aggregate::AggregationRequest`] names providers
/// by [`ProviderKind`]; the set supplies the implementation for each.
#[derive(Default)]
pub struct ProviderSet {
    providers: Vec<Box<dyn ListingProvider>>,
}

impl ProviderSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider, replacing any existing one of the same kind.
    pub fn insert(&mut self, provider: Box<dyn ListingProvider>) {
        let kind = provider.kind();
        self.providers.retain(|p| p.kind() != kind);
        self.providers.push(provider);
    }

    /// Builder-style [`ProviderSet::insert`].
    pub fn with(mut self, provider: impl ListingProvider + 'static) -> Self {
        self.insert(Box::new(provider));
        self
    }

    /// The provider registered for `kind`, if any.
    pub fn get(&self, kind: ProviderKind) -> Option<&dyn ListingProvider> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| &**p)
    }

    /// Whether a provider is registered for `kind`.
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }

    /// Registered kinds, in insertion order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProvider {
        kind: ProviderKind,
        records: Vec<Record>,
    }

    #[async_trait]
    impl ListingProvider for MockProvider {
        async fn fetch(
            &self,
            _query: &ListingQuery,
            limit: usize,
        ) -> Result<Vec<Record>, SourceError> {
            if self.records.is_empty() {
                return Err(SourceError::Parse("mock provider failure".into()));
            }
            Ok(self.records.iter().take(limit).cloned().collect())
        }

        fn kind(&self) -> ProviderKind {
            self.kind
        }
    }

    #[test]
    fn provider_is_object_safe() {
        let provider: Box<dyn ListingProvider> = Box::new(MockProvider {
            kind: ProviderKind::Bing,
            records: vec![],
        });
        assert_eq!(provider.kind(), ProviderKind::Bing);
    }

    #[tokio::test]
    async fn mock_provider_respects_limit() {
        let provider = MockProvider {
            kind: ProviderKind::Yelp,
            records: (0..5)
                .map(|i| Record::new(format!("Biz {i}"), &format!("https://biz{i}.ca")))
                .collect(),
        };
        let query = ListingQuery::new("dentist", "Toronto");
        let records = provider.fetch(&query, 3).await.expect("should succeed");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Biz 0");
    }

    #[tokio::test]
    async fn mock_provider_propagates_errors() {
        let provider = MockProvider {
            kind: ProviderKind::GooglePlaces,
            records: vec![],
        };
        let query = ListingQuery::new("dentist", "Toronto");
        let err = provider.fetch(&query, 3).await.unwrap_err();
        assert!(err.to_string().contains("mock provider failure"));
    }

    #[test]
    fn provider_set_lookup_by_kind() {
        let set = ProviderSet::new()
            .with(MockProvider {
                kind: ProviderKind::Yelp,
                records: vec![],
            })
            .with(MockProvider {
                kind: ProviderKind::Bing,
                records: vec![],
            });
        assert_eq!(set.len(), 2);
        assert!(set.contains(ProviderKind::Yelp));
        assert!(!set.contains(ProviderKind::GooglePlaces));
        assert_eq!(set.kinds(), vec![ProviderKind::Yelp, ProviderKind::Bing]);
    }

    #[test]
    fn provider_set_insert_replaces_same_kind() {
        let mut set = ProviderSet::new();
        set.insert(Box::new(MockProvider {
            kind: ProviderKind::Yelp,
            records: vec![],
        }));
        set.insert(Box::new(MockProvider {
            kind: ProviderKind::Yelp,
            records: vec![Record::new("x", "https://x.ca")],
        }));
        assert_eq!(set.len(), 1);
    }
}
