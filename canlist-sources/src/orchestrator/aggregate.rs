//! Core aggregator: priority-ordered, first-seen-wins merge with early exit.
//!
//! Walks providers one at a time in the caller's priority order, collects
//! records with unique non-empty identity keys, and stops as soon as the
//! target is reached. Later providers are never invoked once the target is
//! met.

use std::collections::HashSet;

use crate::cache::{CacheKey, StreamCache};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::provider::{ListingProvider, ProviderSet};
use crate::types::{ListingQuery, ProviderKind, Record, ATTR_CITY};

/// One user-triggered aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    /// Business category or keywords.
    pub term: String,
    /// Location to search. `None` selects wide mode.
    pub location: Option<String>,
    /// Maximum number of records to return (per city in wide mode).
    pub target: usize,
    /// Providers to query, highest priority first.
    pub provider_order: Vec<ProviderKind>,
}

impl AggregationRequest {
    /// A request against a single location.
    pub fn single(
        term: impl Into<String>,
        location: impl Into<String>,
        target: usize,
        provider_order: Vec<ProviderKind>,
    ) -> Self {
        Self {
            term: term.into(),
            location: Some(location.into()),
            target,
            provider_order,
        }
    }

    /// A wide-mode request, run once per city of a fixed list.
    pub fn wide(term: impl Into<String>, target: usize, provider_order: Vec<ProviderKind>) -> Self {
        Self {
            term: term.into(),
            location: None,
            target,
            provider_order,
        }
    }

    /// Whether this request runs in wide mode.
    pub fn is_wide(&self) -> bool {
        self.location.is_none()
    }

    /// Check the preconditions that must hold before any provider is called.
    ///
    /// - `term` must not be blank
    /// - `target` must be greater than 0
    /// - `provider_order` must be non-empty and free of duplicates
    /// - in single-location mode, `location` must not be blank
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.term.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "term must not be empty".into(),
            ));
        }
        if self.target == 0 {
            return Err(SourceError::InvalidRequest(
                "target must be greater than 0".into(),
            ));
        }
        if self.provider_order.is_empty() {
            return Err(SourceError::InvalidRequest(
                "at least one provider must be selected".into(),
            ));
        }
        let mut seen = HashSet::new();
        for kind in &self.provider_order {
            if !seen.insert(kind) {
                return Err(SourceError::InvalidRequest(format!(
                    "provider {} listed more than once",
                    kind.slug()
                )));
            }
        }
        if let Some(location) = &self.location {
            if location.trim().is_empty() {
                return Err(SourceError::InvalidRequest(
                    "location must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// What happened to one provider during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// The provider returned a stream (possibly empty).
    Fetched {
        /// Records in the stream after truncation to the requested limit.
        returned: usize,
        /// Records that made it into the output.
        admitted: usize,
        /// Whether the stream came from the cache.
        cached: bool,
    },
    /// The provider failed; its stream counted as empty.
    Failed(String),
    /// No implementation was registered for this kind.
    Unavailable,
}

/// Per-provider outcome, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutcome {
    /// Which provider.
    pub provider: ProviderKind,
    /// Location the provider was queried for.
    pub location: String,
    /// What happened.
    pub status: ProviderStatus,
}

/// The merged output of a run plus a report of what each provider did.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// De-duplicated records in merge order.
    pub records: Vec<Record>,
    /// One entry per provider actually reached, in order.
    pub outcomes: Vec<ProviderOutcome>,
}

impl Aggregation {
    /// Providers that failed during the run, with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&ProviderOutcome, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            ProviderStatus::Failed(reason) => Some((o, reason.as_str())),
            _ => None,
        })
    }
}

/// Seen-set plus ordered output. Shared across cities in wide mode.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    seen: HashSet<String>,
    records: Vec<Record>,
}

impl Collector {
    /// Append `record` if its key is non-empty and unseen.
    fn admit(&mut self, record: Record) -> bool {
        if record.identity_key.is_empty() {
            return false;
        }
        if !self.seen.insert(record.identity_key.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub(crate) fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Run the aggregator and return only the merged records.
///
/// See [`aggregate_with_report`].
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] if the request is degenerate
/// (or is a wide-mode request, which needs a city list).
pub async fn aggregate(
    request: &AggregationRequest,
    providers: &ProviderSet,
    config: &SourceConfig,
    cache: &StreamCache,
) -> Result<Vec<Record>, SourceError> {
    Ok(aggregate_with_report(request, providers, config, cache)
        .await?
        .records)
}

/// Merge provider streams for a single-location request.
///
/// # Pipeline
///
/// 1. Validate the request; nothing is fetched if it is degenerate
/// 2. For each provider in `request.provider_order`, in order:
///    a. fetch `target * overfetch_factor` records (cache first)
///    b. log and treat failures as empty streams
///    c. admit records with non-empty, unseen keys in stream order
///    d. return as soon as `target` records have been admitted
/// 3. Return whatever accumulated if providers run out first
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] if the request is degenerate.
/// Provider failures never surface here.
pub async fn aggregate_with_report(
    request: &AggregationRequest,
    providers: &ProviderSet,
    config: &SourceConfig,
    cache: &StreamCache,
) -> Result<Aggregation, SourceError> {
    request.validate()?;
    let Some(location) = request.location.as_deref() else {
        return Err(SourceError::InvalidRequest(
            "wide-mode requests must go through aggregate_wide".into(),
        ));
    };

    let query = ListingQuery::new(request.term.as_str(), location);
    let mut collector = Collector::default();
    let mut outcomes = Vec::new();

    collect(
        &mut collector,
        &query,
        request.target,
        &request.provider_order,
        providers,
        config,
        cache,
        None,
        &mut outcomes,
    )
    .await;

    let records = collector.into_records();
    tracing::info!(
        count = records.len(),
        wanted = request.target,
        providers = outcomes.len(),
        "aggregation complete"
    );
    Ok(Aggregation { records, outcomes })
}

/// Greedy provider walk shared by single and wide mode.
///
/// Admits at most `budget` new records into `collector`. When `city` is
/// set, admitted records are tagged with it.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn collect(
    collector: &mut Collector,
    query: &ListingQuery,
    budget: usize,
    order: &[ProviderKind],
    providers: &ProviderSet,
    config: &SourceConfig,
    cache: &StreamCache,
    city: Option<&str>,
    outcomes: &mut Vec<ProviderOutcome>,
) -> usize {
    let mut added = 0;

    for &kind in order {
        if added >= budget {
            break;
        }

        let Some(provider) = providers.get(kind) else {
            tracing::warn!(provider = %kind, "no provider registered; skipping");
            outcomes.push(ProviderOutcome {
                provider: kind,
                location: query.location.clone(),
                status: ProviderStatus::Unavailable,
            });
            continue;
        };

        let limit = budget.saturating_mul(config.overfetch_factor(kind));
        let stream = match fetch_stream(provider, query, limit, cache).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(provider = %kind, error = %err, "provider failed; treating as empty");
                outcomes.push(ProviderOutcome {
                    provider: kind,
                    location: query.location.clone(),
                    status: ProviderStatus::Failed(err.to_string()),
                });
                continue;
            }
        };

        let returned = stream.records.len();
        let mut admitted = 0;
        for record in stream.records {
            let record = match city {
                Some(city) if record.attribute(ATTR_CITY).is_none() => {
                    record.with_attribute(ATTR_CITY, city)
                }
                _ => record,
            };
            if collector.admit(record) {
                admitted += 1;
                added += 1;
                if added >= budget {
                    break;
                }
            }
        }

        tracing::debug!(
            provider = %kind,
            returned,
            admitted,
            cached = stream.cached,
            "provider stream merged"
        );
        outcomes.push(ProviderOutcome {
            provider: kind,
            location: query.location.clone(),
            status: ProviderStatus::Fetched {
                returned,
                admitted,
                cached: stream.cached,
            },
        });
    }

    added
}

struct FetchedStream {
    records: Vec<Record>,
    cached: bool,
}

/// Look the stream up in the cache, or fetch and cache it.
async fn fetch_stream(
    provider: &dyn ListingProvider,
    query: &ListingQuery,
    limit: usize,
    cache: &StreamCache,
) -> Result<FetchedStream, SourceError> {
    let kind = provider.kind();
    let key = CacheKey::new(kind, query, limit);

    if let Some(records) = cache.lookup(&key).await {
        tracing::debug!(provider = %kind, count = records.len(), "cache hit");
        return Ok(FetchedStream {
            records,
            cached: true,
        });
    }

    tracing::trace!(provider = %kind, term = %query.term, location = %query.location, limit, "fetching");
    let mut records = provider.fetch(query, limit).await?;
    if records.len() > limit {
        tracing::warn!(
            provider = %kind,
            returned = records.len(),
            limit,
            "provider exceeded its limit; truncating"
        );
        records.truncate(limit);
    }

    cache.populate(key, records.clone()).await;
    Ok(FetchedStream {
        records,
        cached: false,
    })
}
