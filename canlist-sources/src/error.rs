//! Error types for the canlist-sources crate.
//!
//! All errors use stable string messages suitable for display to users.
//! No API keys or other credentials appear in error messages.

/// Errors that can occur while querying a listing provider or preparing
/// an aggregation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider call exceeded its per-call timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Failed to parse a provider response (HTML or JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider answered, but with an application-level error status.
    #[error("{provider} API error: {message}")]
    Api {
        /// Display name of the provider that reported the error.
        provider: &'static str,
        /// The status or message returned by the API.
        message: String,
    },

    /// The provider rejected our credentials, or none were configured.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid provider or cache configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The aggregation request violates a precondition.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    /// Classify a [`reqwest::Error`] raised while talking to `provider`.
    ///
    /// Timeouts and 401/403 responses get their own variants so callers
    /// can tell a slow provider from a misconfigured one.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(format!("{provider} request timed out"));
        }
        match err.status() {
            Some(status) if status == 401 || status == 403 => {
                Self::Auth(format!("{provider} rejected credentials ({status})"))
            }
            Some(status) => Self::Http(format!("{provider} HTTP error: {status}")),
            None => Self::Http(format!("{provider} request failed: {}", err.without_url())),
        }
    }
}

/// Convenience type alias for canlist-sources results.
pub type Result<T> = std::result::Result<T, SourceError>;
