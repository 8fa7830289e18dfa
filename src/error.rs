//! Error types for canlist.

use canlist_sources::SourceError;

/// Top-level error type for a canlist run.
#[derive(Debug, thiserror::Error)]
pub enum CanlistError {
    /// Configuration file or value error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet export error.
    #[error("export error: {0}")]
    Export(String),

    /// Provider or aggregation error.
    #[error(transparent)]
    Sources(#[from] SourceError),

    /// None of the requested providers can run with the current config.
    #[error("no usable providers: {0}")]
    NoProviders(String),
}

impl From<csv::Error> for CanlistError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CanlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_display_transparently() {
        let err: CanlistError = SourceError::InvalidRequest("term must not be empty".into()).into();
        assert_eq!(err.to_string(), "invalid request: term must not be empty");
    }

    #[test]
    fn io_errors_convert() {
        let err: CanlistError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CanlistError::Io(_)));
    }

    #[test]
    fn no_providers_display() {
        let err = CanlistError::NoProviders("set CANLIST_YELP_API_KEY".into());
        assert_eq!(err.to_string(), "no usable providers: set CANLIST_YELP_API_KEY");
    }
}
