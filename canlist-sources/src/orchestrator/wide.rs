//! Wide mode: the same query repeated across a fixed city list.
//!
//! Each city is searched with a reduced provider subset (by default only
//! the highest-priority provider) to bound total work. All cities share one
//! seen-set, so a business found under Toronto is not repeated under
//! Mississauga. There is no global cap: every city may contribute up to
//! `target` new records.

use crate::cache::StreamCache;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::provider::ProviderSet;
use crate::types::{ListingQuery, ProviderKind};

use super::aggregate::{collect, Aggregation, AggregationRequest, Collector};

/// Providers wide mode queries: the first `count` kinds of `order` that
/// have a registered implementation.
pub fn wide_provider_subset(
    order: &[ProviderKind],
    providers: &ProviderSet,
    count: usize,
) -> Vec<ProviderKind> {
    order
        .iter()
        .copied()
        .filter(|kind| providers.contains(*kind))
        .take(count)
        .collect()
}

/// Run `request` once per city and union the results.
///
/// Any `location` on the request is ignored; `cities` supplies them.
/// Records are tagged with the city that produced them.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] if the request is degenerate,
/// `cities` is empty, or none of the requested providers is registered.
pub async fn aggregate_wide(
    request: &AggregationRequest,
    cities: &[&str],
    providers: &ProviderSet,
    config: &SourceConfig,
    cache: &StreamCache,
) -> Result<Aggregation, SourceError> {
    let request = AggregationRequest {
        location: None,
        ..request.clone()
    };
    request.validate()?;
    if cities.is_empty() {
        return Err(SourceError::InvalidRequest(
            "wide mode needs at least one city".into(),
        ));
    }

    let subset = wide_provider_subset(
        &request.provider_order,
        providers,
        config.wide_provider_count,
    );
    if subset.is_empty() {
        return Err(SourceError::InvalidRequest(
            "none of the requested providers is available for wide mode".into(),
        ));
    }
    tracing::debug!(providers = ?subset, cities = cities.len(), "wide mode provider subset");

    let mut collector = Collector::default();
    let mut outcomes = Vec::new();

    for &city in cities {
        let query = ListingQuery::new(request.term.as_str(), city);
        let added = collect(
            &mut collector,
            &query,
            request.target,
            &subset,
            providers,
            config,
            cache,
            Some(city),
            &mut outcomes,
        )
        .await;
        tracing::debug!(city, added, "city merged");
    }

    let records = collector.into_records();
    tracing::info!(
        count = records.len(),
        cities = cities.len(),
        "wide aggregation complete"
    );
    Ok(Aggregation { records, outcomes })
}
