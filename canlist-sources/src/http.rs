//! Shared HTTP client with User-Agent rotation and polite request pacing.
//!
//! Provides a configured [`reqwest::Client`] with browser-like headers,
//! cookie support, and rotating User-Agent strings, plus the randomized
//! pause providers take between successive calls to the same host.

use crate::config::SourceConfig;
use crate::error::SourceError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for provider requests.
///
/// The client has:
/// - Cookie store enabled (for consent pages on search engines)
/// - Per-call timeout from config
/// - Random User-Agent from built-in rotation list (or custom if configured)
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SourceConfig) -> Result<reqwest::Client, SourceError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}

/// Pick a delay uniformly from `(min_ms, max_ms)`.
pub fn jitter(range_ms: (u64, u64)) -> Duration {
    let (min, max) = range_ms;
    if max == 0 || min >= max {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

/// Sleep for a random duration in the configured range.
///
/// Called by providers between successive requests to the same host.
/// `(0, 0)` returns immediately.
pub async fn polite_delay(range_ms: (u64, u64)) {
    let delay = jitter(range_ms);
    if delay.is_zero() {
        return;
    }
    tracing::trace!(delay_ms = delay.as_millis() as u64, "polite delay");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_user_agent_returns_valid_ua() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
        assert!(ua.contains("Mozilla/5.0"));
    }

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&SourceConfig::default()).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = SourceConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..100 {
            let d = jitter((200, 500)).as_millis();
            assert!((200..=500).contains(&d), "out of range: {d}");
        }
    }

    #[test]
    fn jitter_zero_range_is_zero() {
        assert!(jitter((0, 0)).is_zero());
    }

    #[test]
    fn jitter_degenerate_range_uses_min() {
        assert_eq!(jitter((300, 300)), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn polite_delay_zero_returns_immediately() {
        let start = std::time::Instant::now();
        polite_delay((0, 0)).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
