//! # canlist-sources
//!
//! Business-listing providers and the priority-ordered aggregator that
//! merges their streams into one de-duplicated list.
//!
//! ## Design
//!
//! - Yelp Fusion and Google Places for structured listings, Bing and
//!   DuckDuckGo HTML scraping as free-text fallbacks
//! - Providers are walked strictly in priority order; the first provider to
//!   report a listing wins its identity key
//! - The walk stops as soon as the target count is reached
//! - A failing provider contributes nothing and never aborts the run
//! - Optional stream cache keyed on provider, query and limit
//! - "Canada-wide" mode repeats a query across a fixed city list with a
//!   shared seen-set
//!
//! ## Security
//!
//! - API keys are redacted from `Debug` output and never appear in errors
//! - Search terms are logged only at trace level

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod types;

pub use cache::{CacheKey, StreamCache};
pub use config::{ApiKey, SourceConfig};
pub use error::{Result, SourceError};
pub use orchestrator::aggregate::{
    aggregate, aggregate_with_report, Aggregation, AggregationRequest, ProviderOutcome,
    ProviderStatus,
};
pub use orchestrator::identity::identity_key;
pub use orchestrator::wide::aggregate_wide;
pub use provider::{ListingProvider, ProviderSet};
pub use providers::build_providers;
pub use types::{ListingQuery, ProviderKind, Record};
