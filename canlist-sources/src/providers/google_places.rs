//! Google Places nearby search around the geocoded location.
//!
//! Three kinds of call, all on the same host:
//!
//! 1. Geocode the location text to coordinates.
//! 2. Nearby search ranked by distance with `keyword = term`, following
//!    `next_page_token` until the limit is met (Google serves at most three
//!    pages of twenty).
//! 3. Optionally, Place Details per result to resolve website and phone.
//!
//! With contact resolution on, the identity key is the business website;
//! places without one produce empty-key records that the aggregator drops.
//! With it off, the key is the place's Google Maps URL.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{ApiKey, SourceConfig};
use crate::error::SourceError;
use crate::http;
use crate::provider::ListingProvider;
use crate::types::{
    ListingQuery, ProviderKind, Record, ATTR_ADDRESS, ATTR_LISTING_URL, ATTR_PHONE, ATTR_SOURCE,
    ATTR_WEBSITE,
};

const PROVIDER: &str = "Google Places";
/// Nearby search never returns more than three pages.
const MAX_PAGES: usize = 3;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<Place>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    name: String,
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    vicinity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Google Places API provider.
pub struct GooglePlacesProvider {
    config: SourceConfig,
}

impl GooglePlacesProvider {
    /// Create a provider using the Google Places settings in `config`.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{path}",
            self.config.google_places.base_url.trim_end_matches('/')
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        client: &reqwest::Client,
        path: &str,
        params: &[(&str, &str)],
        key: &ApiKey,
    ) -> Result<T, SourceError> {
        let response = client
            .get(self.url(path))
            .query(params)
            .query(&[("key", key.expose())])
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))?
            .error_for_status()
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))?;
        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Parse(format!("{PROVIDER} response: {}", e.without_url())))
    }

    async fn geocode(
        &self,
        client: &reqwest::Client,
        location: &str,
        key: &ApiKey,
    ) -> Result<Option<LatLng>, SourceError> {
        let body: GeocodeResponse = self
            .get_json(client, "/maps/api/geocode/json", &[("address", location)], key)
            .await?;
        check_status(&body.status, body.error_message.as_deref())?;
        Ok(body.results.first().map(|r| r.geometry.location))
    }

    async fn nearby(
        &self,
        client: &reqwest::Client,
        term: &str,
        at: LatLng,
        limit: usize,
        key: &ApiKey,
    ) -> Result<Vec<Place>, SourceError> {
        let location = format!("{},{}", at.lat, at.lng);
        let mut places = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            if page > 0 {
                let wait = self.config.google_places.page_token_delay_ms;
                tokio::time::sleep(Duration::from_millis(wait)).await;
            }
            let params: Vec<(&str, &str)> = match page_token.as_deref() {
                Some(token) => vec![("pagetoken", token)],
                None => vec![
                    ("location", location.as_str()),
                    ("keyword", term),
                    ("rankby", "distance"),
                ],
            };
            let body = match self.nearby_page(client, &params, key).await {
                Ok(body) => body,
                Err(err) if page == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!(page, error = %err, "Google Places page failed, keeping earlier pages");
                    break;
                }
            };

            tracing::debug!(page, count = body.results.len(), "Google Places page parsed");
            places.extend(body.results);
            if places.len() >= limit {
                break;
            }
            match body.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        places.truncate(limit);
        Ok(places)
    }

    async fn nearby_page(
        &self,
        client: &reqwest::Client,
        params: &[(&str, &str)],
        key: &ApiKey,
    ) -> Result<NearbyResponse, SourceError> {
        let body: NearbyResponse = self
            .get_json(client, "/maps/api/place/nearbysearch/json", params, key)
            .await?;
        check_status(&body.status, body.error_message.as_deref())?;
        Ok(body)
    }

    async fn details(
        &self,
        client: &reqwest::Client,
        place_id: &str,
        key: &ApiKey,
    ) -> Result<PlaceDetails, SourceError> {
        let body: DetailsResponse = self
            .get_json(
                client,
                "/maps/api/place/details/json",
                &[
                    ("place_id", place_id),
                    ("fields", "website,formatted_phone_number,url"),
                ],
                key,
            )
            .await?;
        check_status(&body.status, body.error_message.as_deref())?;
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl ListingProvider for GooglePlacesProvider {
    async fn fetch(&self, query: &ListingQuery, limit: usize) -> Result<Vec<Record>, SourceError> {
        let key = self
            .config
            .google_places
            .api_key
            .as_ref()
            .ok_or_else(|| SourceError::Auth("no Google API key configured".into()))?;

        tracing::trace!(term = %query.term, location = %query.location, limit, "Google Places search");

        let client = http::build_client(&self.config)?;

        let Some(at) = self.geocode(&client, &query.location, key).await? else {
            tracing::debug!(location = %query.location, "location did not geocode");
            return Ok(Vec::new());
        };

        let places = self.nearby(&client, &query.term, at, limit, key).await?;
        let mut records = Vec::with_capacity(places.len());

        for (i, place) in places.into_iter().enumerate() {
            if !self.config.google_places.resolve_contacts {
                records.push(unresolved_record(place));
                continue;
            }
            if i > 0 {
                http::polite_delay(self.config.request_delay_ms).await;
            }
            let details = match self.details(&client, &place.place_id, key).await {
                Ok(details) => details,
                Err(err) => {
                    tracing::warn!(place = %place.name, error = %err, "place details lookup failed");
                    PlaceDetails::default()
                }
            };
            records.push(resolved_record(place, details));
        }

        Ok(records)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::GooglePlaces
    }
}

/// `OK` and `ZERO_RESULTS` are successes; anything else is an error.
fn check_status(status: &str, message: Option<&str>) -> Result<(), SourceError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "REQUEST_DENIED" => Err(SourceError::Auth(format!(
            "{PROVIDER} denied the request{}",
            message.map(|m| format!(": {m}")).unwrap_or_default()
        ))),
        other => Err(SourceError::Api {
            provider: PROVIDER,
            message: match message {
                Some(m) => format!("{other}: {m}"),
                None => other.to_string(),
            },
        }),
    }
}

fn maps_url(place_id: &str) -> String {
    if place_id.is_empty() {
        return String::new();
    }
    format!("https://www.google.com/maps/place/?q=place_id:{place_id}")
}

fn resolved_record(place: Place, details: PlaceDetails) -> Record {
    let website = details.website.unwrap_or_default();
    let listing = details.url.unwrap_or_else(|| maps_url(&place.place_id));
    Record::new(place.name, &website)
        .with_attribute(ATTR_WEBSITE, website.as_str())
        .with_attribute(ATTR_PHONE, details.formatted_phone_number.unwrap_or_default())
        .with_attribute(ATTR_ADDRESS, place.vicinity.unwrap_or_default())
        .with_attribute(ATTR_LISTING_URL, listing)
        .with_attribute(ATTR_SOURCE, PROVIDER)
}

fn unresolved_record(place: Place) -> Record {
    let listing = maps_url(&place.place_id);
    Record::new(place.name, &listing)
        .with_attribute(ATTR_ADDRESS, place.vicinity.unwrap_or_default())
        .with_attribute(ATTR_LISTING_URL, listing.as_str())
        .with_attribute(ATTR_SOURCE, PROVIDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, resolve: bool) -> SourceConfig {
        let mut config = SourceConfig {
            request_delay_ms: (0, 0),
            ..Default::default()
        };
        config.google_places.base_url = server.uri();
        config.google_places.api_key = ApiKey::new("g-key");
        config.google_places.resolve_contacts = resolve;
        config.google_places.page_token_delay_ms = 0;
        config
    }

    async fn mount_geocode(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "Toronto, ON"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{ "geometry": { "location": { "lat": 43.65, "lng": -79.38 } } }]
            })))
            .mount(server)
            .await;
    }

    fn place(i: usize) -> serde_json::Value {
        json!({ "name": format!("Shop {i}"), "place_id": format!("pid{i}"), "vicinity": format!("{i} Queen St") })
    }

    #[test]
    fn check_status_accepts_ok_and_zero_results() {
        assert!(check_status("OK", None).is_ok());
        assert!(check_status("ZERO_RESULTS", None).is_ok());
    }

    #[test]
    fn check_status_maps_denied_to_auth() {
        let err = check_status("REQUEST_DENIED", Some("The provided API key is invalid.")).unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }

    #[test]
    fn check_status_other_is_api_error() {
        let err = check_status("OVER_QUERY_LIMIT", None).unwrap_err();
        assert_eq!(err.to_string(), "Google Places API error: OVER_QUERY_LIMIT");
    }

    #[test]
    fn resolved_record_keys_on_website() {
        let place = Place {
            name: "Shop".into(),
            place_id: "abc".into(),
            vicinity: Some("1 Main St".into()),
        };
        let details = PlaceDetails {
            website: Some("https://shop.ca/".into()),
            formatted_phone_number: Some("(416) 555-0100".into()),
            url: Some("https://maps.google.com/?cid=1".into()),
        };
        let record = resolved_record(place, details);
        assert_eq!(record.identity_key, "https://shop.ca/");
        assert_eq!(record.attribute(ATTR_WEBSITE), Some("https://shop.ca/"));
        assert_eq!(record.attribute(ATTR_PHONE), Some("(416) 555-0100"));
        assert_eq!(record.attribute(ATTR_LISTING_URL), Some("https://maps.google.com/?cid=1"));
    }

    #[test]
    fn resolved_record_without_website_has_empty_key() {
        let place = Place {
            name: "Shop".into(),
            place_id: "abc".into(),
            vicinity: None,
        };
        let record = resolved_record(place, PlaceDetails::default());
        assert!(record.identity_key.is_empty());
        assert_eq!(record.attribute(ATTR_WEBSITE), None);
    }

    #[test]
    fn unresolved_record_keys_on_maps_url() {
        let place = Place {
            name: "Shop".into(),
            place_id: "abc".into(),
            vicinity: None,
        };
        let record = unresolved_record(place);
        assert_eq!(
            record.identity_key,
            "https://www.google.com/maps/place?q=place_id%3Aabc"
        );
    }

    #[tokio::test]
    async fn resolves_websites_through_details() {
        let server = MockServer::start().await;
        mount_geocode(&server).await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("keyword", "bakery"))
            .and(query_param("rankby", "distance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [place(1), place(2)]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/details/json"))
            .and(query_param("place_id", "pid1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": { "website": "https://shop1.ca/", "formatted_phone_number": "(416) 555-0001" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/details/json"))
            .and(query_param("place_id", "pid2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = GooglePlacesProvider::new(&config_for(&server, true));
        let records = provider
            .fetch(&ListingQuery::new("bakery", "Toronto, ON"), 10)
            .await
            .expect("fetch succeeds");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity_key, "https://shop1.ca/");
        assert_eq!(records[0].attribute(ATTR_PHONE), Some("(416) 555-0001"));
        // Failed details lookup degrades to an unknown website.
        assert!(records[1].identity_key.is_empty());
    }

    #[tokio::test]
    async fn later_page_failure_keeps_earlier_pages() {
        let server = MockServer::start().await;
        mount_geocode(&server).await;
        let first: Vec<_> = (0..20).map(place).collect();
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("keyword", "bakery"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": first,
                "next_page_token": "tok2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("pagetoken", "tok2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GooglePlacesProvider::new(&config_for(&server, false));
        let records = provider
            .fetch(&ListingQuery::new("bakery", "Toronto, ON"), 40)
            .await
            .expect("first page survives");
        assert_eq!(records.len(), 20);
        assert_eq!(records[19].name, "Shop 19");
    }

    #[tokio::test]
    async fn follows_next_page_token() {
        let server = MockServer::start().await;
        mount_geocode(&server).await;
        let first: Vec<_> = (0..20).map(place).collect();
        let second: Vec<_> = (20..25).map(place).collect();
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("keyword", "bakery"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": first,
                "next_page_token": "tok2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("pagetoken", "tok2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": second
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GooglePlacesProvider::new(&config_for(&server, false));
        let records = provider
            .fetch(&ListingQuery::new("bakery", "Toronto, ON"), 22)
            .await
            .expect("fetch succeeds");
        assert_eq!(records.len(), 22);
        assert_eq!(records[21].name, "Shop 21");
    }

    #[tokio::test]
    async fn ungeocodable_location_yields_empty_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "results": []
            })))
            .mount(&server)
            .await;

        let provider = GooglePlacesProvider::new(&config_for(&server, true));
        let records = provider
            .fetch(&ListingQuery::new("bakery", "Nowhere"), 10)
            .await
            .expect("empty is not an error");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn denied_key_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let provider = GooglePlacesProvider::new(&config_for(&server, true));
        let err = provider
            .fetch(&ListingQuery::new("bakery", "Toronto, ON"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
        assert!(!err.to_string().contains("g-key"));
    }

    #[tokio::test]
    async fn missing_key_is_auth_error_without_network() {
        let provider = GooglePlacesProvider::new(&SourceConfig::default());
        let err = provider
            .fetch(&ListingQuery::new("bakery", "Toronto"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }
}
