//! Yelp Fusion business search. Structured data, highest trust.
//!
//! Calls `GET /v3/businesses/search` with a bearer token, paging with
//! `offset` in steps of at most 50 until the limit is met, a short page is
//! returned, or Yelp's 240-result window runs out.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{ApiKey, SourceConfig};
use crate::error::SourceError;
use crate::http;
use crate::provider::ListingProvider;
use crate::types::{
    ListingQuery, ProviderKind, Record, ATTR_ADDRESS, ATTR_LISTING_URL, ATTR_PHONE, ATTR_SOURCE,
};

/// Largest page the search endpoint accepts.
const PAGE_SIZE: usize = 50;
/// `offset + limit` may not exceed this.
const RESULT_WINDOW: usize = 240;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<Business>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Business {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    display_phone: String,
    #[serde(default)]
    location: Option<BusinessLocation>,
}

#[derive(Debug, Deserialize)]
struct BusinessLocation {
    #[serde(default)]
    display_address: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    description: String,
}

/// Yelp Fusion API provider.
pub struct YelpProvider {
    config: SourceConfig,
}

impl YelpProvider {
    /// Create a provider using the Yelp settings in `config`.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v3/businesses/search",
            self.config.yelp.base_url.trim_end_matches('/')
        )
    }

    async fn fetch_page(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        api_key: &ApiKey,
        query: &ListingQuery,
        page_size: usize,
        offset: usize,
    ) -> Result<SearchResponse, SourceError> {
        let response = client
            .get(endpoint)
            .bearer_auth(api_key.expose())
            .query(&[
                ("term", query.term.as_str()),
                ("location", query.location.as_str()),
            ])
            .query(&[("limit", page_size), ("offset", offset)])
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest("Yelp", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest("Yelp", e))?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        parse_search_response(&body)
    }
}

#[async_trait]
impl ListingProvider for YelpProvider {
    async fn fetch(&self, query: &ListingQuery, limit: usize) -> Result<Vec<Record>, SourceError> {
        let api_key = self
            .config
            .yelp
            .api_key
            .as_ref()
            .ok_or_else(|| SourceError::Auth("no Yelp API key configured".into()))?;

        tracing::trace!(term = %query.term, location = %query.location, limit, "Yelp search");

        let client = http::build_client(&self.config)?;
        let endpoint = self.endpoint();
        let mut records = Vec::new();
        let mut offset = 0;

        while records.len() < limit && offset < RESULT_WINDOW {
            if offset > 0 {
                http::polite_delay(self.config.request_delay_ms).await;
            }
            let page_size = (limit - records.len())
                .min(PAGE_SIZE)
                .min(RESULT_WINDOW - offset);

            let page = match self
                .fetch_page(&client, &endpoint, api_key, query, page_size, offset)
                .await
            {
                Ok(page) => page,
                Err(err) if offset == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!(offset, error = %err, "Yelp page failed, keeping earlier pages");
                    break;
                }
            };
            let returned = page.businesses.len();
            let total = page.total;
            records.extend(page.businesses.into_iter().map(into_record));
            offset += returned;

            tracing::debug!(returned, offset, ?total, "Yelp page parsed");
            if returned < page_size || total.is_some_and(|t| offset >= t) {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Yelp
    }
}

fn parse_search_response(body: &str) -> Result<SearchResponse, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("Yelp response: {e}")))
}

fn api_error(status: reqwest::StatusCode, body: &str) -> SourceError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return SourceError::Auth(format!("Yelp rejected credentials ({status})"));
    }
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) if err.error.description.is_empty() => err.error.code,
        Ok(err) => format!("{}: {}", err.error.code, err.error.description),
        Err(_) => status.to_string(),
    };
    SourceError::Api {
        provider: "Yelp",
        message,
    }
}

fn into_record(business: Business) -> Record {
    let phone = if business.display_phone.trim().is_empty() {
        business.phone
    } else {
        business.display_phone
    };
    let address = business
        .location
        .map(|l| l.display_address.join(", "))
        .unwrap_or_default();

    let record = Record::new(business.name, &business.url);
    let listing = record.identity_key.clone();
    record
        .with_attribute(ATTR_LISTING_URL, listing)
        .with_attribute(ATTR_PHONE, phone)
        .with_attribute(ATTR_ADDRESS, address)
        .with_attribute(ATTR_SOURCE, ProviderKind::Yelp.name())
}
