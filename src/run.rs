//! One end-to-end aggregation run: validate, build providers, dispatch.

use canlist_sources::{
    aggregate_wide, aggregate_with_report, build_providers, Aggregation, AggregationRequest,
    ProviderKind, ProviderSet, StreamCache,
};

use crate::config::{validate_target, AppConfig, GOOGLE_API_KEY_ENV, YELP_API_KEY_ENV};
use crate::error::{CanlistError, Result};

/// Where to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single user-supplied location.
    Location(String),
    /// Every city in the configured Canada-wide list.
    CanadaWide,
}

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Business category or keywords.
    pub term: String,
    /// Where to search.
    pub scope: Scope,
    /// Unique listings wanted (per city in Canada-wide mode).
    pub target: usize,
    /// Providers in priority order.
    pub providers: Vec<ProviderKind>,
}

impl RunRequest {
    /// A request using the target and providers from `config`.
    pub fn from_defaults(config: &AppConfig, term: impl Into<String>, scope: Scope) -> Self {
        Self {
            term: term.into(),
            scope,
            target: config.search.target,
            providers: config.search.providers.clone(),
        }
    }

    fn to_aggregation_request(&self) -> AggregationRequest {
        match &self.scope {
            Scope::Location(location) => AggregationRequest::single(
                self.term.trim(),
                location.trim(),
                self.target,
                self.providers.clone(),
            ),
            Scope::CanadaWide => {
                AggregationRequest::wide(self.term.trim(), self.target, self.providers.clone())
            }
        }
    }
}

/// Run `request` with providers built from `config` and a fresh cache.
///
/// # Errors
///
/// Returns [`CanlistError::Config`] for invalid configuration or target,
/// [`CanlistError::NoProviders`] when none of the requested providers has
/// credentials, and [`CanlistError::Sources`] for a degenerate request.
/// Individual provider failures are reported in the returned outcomes.
pub async fn execute(config: &AppConfig, request: RunRequest) -> Result<Aggregation> {
    config.validate()?;
    validate_target(request.target)?;

    let providers = build_providers(&config.sources, &request.providers);
    if providers.is_empty() {
        return Err(CanlistError::NoProviders(missing_credentials_hint(
            &request.providers,
        )));
    }
    let cache = StreamCache::from_config(&config.sources);

    execute_with(config, &request, &providers, &cache).await
}

/// Run `request` against caller-supplied providers and cache.
///
/// # Errors
///
/// Returns [`CanlistError::Sources`] for a degenerate request.
pub async fn execute_with(
    config: &AppConfig,
    request: &RunRequest,
    providers: &ProviderSet,
    cache: &StreamCache,
) -> Result<Aggregation> {
    let aggregation_request = request.to_aggregation_request();
    tracing::info!(
        wanted = request.target,
        providers = ?request.providers,
        wide = aggregation_request.is_wide(),
        "starting aggregation"
    );
    tracing::trace!(term = %request.term, scope = ?request.scope, "aggregation query");

    let report = match &request.scope {
        Scope::Location(_) => {
            aggregate_with_report(&aggregation_request, providers, &config.sources, cache).await?
        }
        Scope::CanadaWide => {
            let cities: Vec<&str> = config.search.cities.iter().map(String::as_str).collect();
            aggregate_wide(&aggregation_request, &cities, providers, &config.sources, cache)
                .await?
        }
    };

    for (outcome, reason) in report.failures() {
        tracing::warn!(
            provider = %outcome.provider,
            location = %outcome.location,
            reason,
            "provider contributed no listings"
        );
    }
    Ok(report)
}

fn missing_credentials_hint(requested: &[ProviderKind]) -> String {
    let mut hints = Vec::new();
    for kind in requested {
        match kind {
            ProviderKind::Yelp => hints.push(format!("set {YELP_API_KEY_ENV} for Yelp")),
            ProviderKind::GooglePlaces => {
                hints.push(format!("set {GOOGLE_API_KEY_ENV} for Google Places"))
            }
            ProviderKind::Bing | ProviderKind::DuckDuckGo => {}
        }
    }
    hints.push("or add --providers bing,duckduckgo".into());
    hints.join(", ")
}
