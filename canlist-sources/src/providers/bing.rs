//! Bing web search scrape, the free-text fallback.
//!
//! Bing sometimes wraps organic links in a `/ck/a` click-tracking redirect
//! whose `u` parameter carries the target as `a1` + URL-safe base64. Those are
//! unwrapped before the identity key is built.

use async_trait::async_trait;
use base64::Engine as _;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::http;
use crate::provider::ListingProvider;
use crate::types::{ListingQuery, ProviderKind, Record, ATTR_SOURCE, ATTR_WEBSITE};

use super::scrape_query;

/// Organic results per Bing page.
const PAGE_SIZE: usize = 10;
/// Bing rarely serves anything useful past the fifth page.
const MAX_PAGES: usize = 5;

/// Bing HTML search scraper.
pub struct BingProvider {
    config: SourceConfig,
}

impl BingProvider {
    /// Create a provider using the Bing settings in `config`.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ListingProvider for BingProvider {
    async fn fetch(&self, query: &ListingQuery, limit: usize) -> Result<Vec<Record>, SourceError> {
        let q = scrape_query(query, &self.config.bing.site_filter);
        tracing::trace!(query = %q, limit, "Bing search");

        let client = http::build_client(&self.config)?;
        let endpoint = format!(
            "{}/search",
            self.config.base_url(ProviderKind::Bing).trim_end_matches('/')
        );
        let mut records = Vec::new();

        for page in 0..MAX_PAGES {
            if page > 0 {
                http::polite_delay(self.config.request_delay_ms).await;
            }
            let first = (page * PAGE_SIZE + 1).to_string();

            let html = match fetch_page(&client, &endpoint, &q, &first).await {
                Ok(html) => html,
                Err(err) if page == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!(page, error = %err, "Bing page failed, keeping earlier pages");
                    break;
                }
            };

            tracing::trace!(page, bytes = html.len(), "Bing response received");

            let parsed = parse_bing_html(&html, limit - records.len())?;
            let returned = parsed.len();
            records.extend(parsed);
            if returned == 0 || records.len() >= limit {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Bing
    }
}

async fn fetch_page(
    client: &reqwest::Client,
    endpoint: &str,
    q: &str,
    first: &str,
) -> Result<String, SourceError> {
    client
        .get(endpoint)
        .query(&[("q", q), ("setlang", "en"), ("first", first)])
        .header("Accept", "text/html,application/xhtml+xml")
        .header("Accept-Language", "en-CA,en;q=0.9")
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest("Bing", e))?
        .error_for_status()
        .map_err(|e| SourceError::from_reqwest("Bing", e))?
        .text()
        .await
        .map_err(|e| SourceError::from_reqwest("Bing", e))
}

/// Parse a Bing results page into records, at most `max` of them.
fn parse_bing_html(html: &str, max: usize) -> Result<Vec<Record>, SourceError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse("li.b_algo h2 a[href], h2 > a[href]")
        .map_err(|e| SourceError::Parse(format!("invalid result selector: {e:?}")))?;

    let mut records = Vec::new();

    for link in document.select(&result_sel) {
        if records.len() >= max {
            break;
        }

        let name = link.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }

        let Some(url) = link.value().attr("href").and_then(unwrap_click_url) else {
            continue;
        };

        records.push(
            Record::new(name, &url)
                .with_attribute(ATTR_WEBSITE, url.as_str())
                .with_attribute(ATTR_SOURCE, ProviderKind::Bing.name()),
        );
    }

    tracing::debug!(count = records.len(), "Bing results parsed");
    Ok(records)
}

/// Resolve a result `href` to the target URL.
///
/// Returns `None` for relative or non-web links (Bing's own navigation).
fn unwrap_click_url(href: &str) -> Option<String> {
    let parsed = Url::parse(href).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let is_click = parsed
        .host_str()
        .is_some_and(|h| h.ends_with("bing.com"))
        && parsed.path().starts_with("/ck/a");
    if !is_click {
        return Some(href.to_string());
    }

    let encoded = parsed
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    let payload = encoded.strip_prefix("a1")?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let target = String::from_utf8(bytes).ok()?;
    target.starts_with("http").then_some(target)
}
