//! Identity-key policy: how a record's URL becomes its de-duplication key.
//!
//! Canonicalises URLs so that the same listing reached through different
//! links (tracking parameters, fragments, capitalisation, default ports)
//! produces the same key. The aggregator compares keys by exact string
//! equality, so every provider must build keys through [`identity_key`].

use url::Url;

/// Tracking query parameters that are stripped during canonicalisation.
///
/// Yelp appends `adjust_creative` and the UTM trio to every listing URL
/// returned by the Fusion API.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "adjust_creative",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
];

/// Build the identity key for a listing URL.
///
/// - Leading/trailing whitespace is trimmed; a blank URL yields an empty
///   key, which makes the record ineligible for aggregation.
/// - Absolute `http`/`https` URLs are canonicalised with
///   [`canonicalize_url`].
/// - Anything else is returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use canlist_sources::orchestrator::identity::identity_key;
///
/// let a = identity_key("https://www.yelp.ca/biz/maple-dental?adjust_creative=x&utm_source=y");
/// let b = identity_key("https://WWW.YELP.CA/biz/maple-dental/");
/// assert_eq!(a, b);
/// assert_eq!(identity_key("   "), "");
/// ```
pub fn identity_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    canonicalize_url(trimmed)
}

/// Canonicalise an absolute web URL.
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Remove default ports.
/// 3. Strip tracking parameters and sort the remaining ones.
/// 4. Remove the fragment.
/// 5. Remove a trailing slash unless the path is exactly `"/"`.
///
/// Inputs that do not parse, or are not `http`/`https`, are returned
/// unchanged.
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return raw.to_string();
    }

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    parsed.to_string()
}

fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        let result = canonicalize_url("HTTPS://Example.CA/Path");
        assert_eq!(result, "https://example.ca/Path");
    }

    #[test]
    fn removes_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://example.ca/path/"),
            "https://example.ca/path"
        );
    }

    #[test]
    fn preserves_root_slash() {
        assert_eq!(canonicalize_url("https://example.ca/"), "https://example.ca/");
    }

    #[test]
    fn removes_default_ports() {
        assert_eq!(
            canonicalize_url("http://example.ca:80/path"),
            "http://example.ca/path"
        );
        assert_eq!(
            canonicalize_url("https://example.ca:443/path"),
            "https://example.ca/path"
        );
    }

    #[test]
    fn preserves_non_default_port() {
        assert_eq!(
            canonicalize_url("https://example.ca:8080/path"),
            "https://example.ca:8080/path"
        );
    }

    #[test]
    fn strips_yelp_tracking_params() {
        let result = canonicalize_url(
            "https://www.yelp.ca/biz/maple-dental-toronto?adjust_creative=abc&utm_campaign=yelp_api_v3&utm_medium=api_v3_business_search&utm_source=abc",
        );
        assert_eq!(result, "https://www.yelp.ca/biz/maple-dental-toronto");
    }

    #[test]
    fn sorts_remaining_params() {
        let result = canonicalize_url("https://example.ca/search?z=1&a=2&m=3");
        assert_eq!(result, "https://example.ca/search?a=2&m=3&z=1");
    }

    #[test]
    fn tracking_param_match_ignores_case() {
        let result = canonicalize_url("https://example.ca/page?q=x&UTM_Source=twitter");
        assert_eq!(result, "https://example.ca/page?q=x");
    }

    #[test]
    fn removes_fragment() {
        assert_eq!(
            canonicalize_url("https://example.ca/page#hours"),
            "https://example.ca/page"
        );
    }

    #[test]
    fn non_web_scheme_returned_unchanged() {
        assert_eq!(canonicalize_url("mailto:info@example.ca"), "mailto:info@example.ca");
    }

    #[test]
    fn invalid_url_returned_unchanged() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
    }

    #[test]
    fn identity_key_blank_is_empty() {
        assert_eq!(identity_key(""), "");
        assert_eq!(identity_key(" \t\n"), "");
    }

    #[test]
    fn identity_key_trims_before_canonicalising() {
        assert_eq!(
            identity_key("  https://Example.ca/a/  "),
            "https://example.ca/a"
        );
    }

    #[test]
    fn identity_key_keeps_relative_strings() {
        assert_eq!(identity_key(" /biz/local "), "/biz/local");
    }
}
