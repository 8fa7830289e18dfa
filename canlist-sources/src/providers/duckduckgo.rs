//! DuckDuckGo HTML search scrape.
//!
//! Uses the JavaScript-free endpoint at `html.duckduckgo.com/html/`, which
//! takes a POST form and pages with the `s` (skip) field.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::http;
use crate::provider::ListingProvider;
use crate::types::{ListingQuery, ProviderKind, Record, ATTR_SOURCE, ATTR_WEBSITE};

use super::scrape_query;

const MAX_PAGES: usize = 3;

/// DuckDuckGo HTML search scraper.
pub struct DuckDuckGoProvider {
    config: SourceConfig,
}

impl DuckDuckGoProvider {
    /// Create a provider using the DuckDuckGo settings in `config`.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ListingProvider for DuckDuckGoProvider {
    async fn fetch(&self, query: &ListingQuery, limit: usize) -> Result<Vec<Record>, SourceError> {
        let q = scrape_query(query, &self.config.duckduckgo.site_filter);
        tracing::trace!(query = %q, limit, "DuckDuckGo search");

        let client = http::build_client(&self.config)?;
        let endpoint = format!(
            "{}/html/",
            self.config
                .base_url(ProviderKind::DuckDuckGo)
                .trim_end_matches('/')
        );
        let mut records = Vec::new();
        let mut skip = 0;

        for page in 0..MAX_PAGES {
            if page > 0 {
                http::polite_delay(self.config.request_delay_ms).await;
            }
            let s = skip.to_string();
            let dc = (skip + 1).to_string();
            let mut form = vec![("q", q.as_str()), ("kl", "ca-en")];
            if skip > 0 {
                form.push(("s", s.as_str()));
                form.push(("dc", dc.as_str()));
            }

            let html = match fetch_page(&client, &endpoint, &form).await {
                Ok(html) => html,
                Err(err) if page == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!(page, error = %err, "DuckDuckGo page failed, keeping earlier pages");
                    break;
                }
            };

            tracing::trace!(page, bytes = html.len(), "DuckDuckGo response received");

            let parsed = parse_duckduckgo_html(&html)?;
            let returned = parsed.len();
            skip += returned;
            records.extend(parsed);
            if returned == 0 || records.len() >= limit {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::DuckDuckGo
    }
}

async fn fetch_page(
    client: &reqwest::Client,
    endpoint: &str,
    form: &[(&str, &str)],
) -> Result<String, SourceError> {
    client
        .post(endpoint)
        .form(form)
        .header("Accept-Language", "en-CA,en;q=0.9")
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest("DuckDuckGo", e))?
        .error_for_status()
        .map_err(|e| SourceError::from_reqwest("DuckDuckGo", e))?
        .text()
        .await
        .map_err(|e| SourceError::from_reqwest("DuckDuckGo", e))
}

/// Extract the target URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps URLs like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.ca&rut=...`.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

/// Parse one DuckDuckGo results page. Ads are excluded.
fn parse_duckduckgo_html(html: &str) -> Result<Vec<Record>, SourceError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )
    .map_err(|e| SourceError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| SourceError::Parse(format!("invalid title selector: {e:?}")))?;

    let mut records = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let name = title_el.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }

        let Some(url) = title_el.value().attr("href").and_then(extract_url) else {
            continue;
        };

        records.push(
            Record::new(name, &url)
                .with_attribute(ATTR_WEBSITE, url.as_str())
                .with_attribute(ATTR_SOURCE, ProviderKind::DuckDuckGo.name()),
        );
    }

    tracing::debug!(count = records.len(), "DuckDuckGo results parsed");
    Ok(records)
}
