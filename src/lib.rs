//! canlist: Canadian business listings from several sources in one
//! de-duplicated spreadsheet.
//!
//! The heavy lifting lives in [`canlist_sources`]; this crate adds the
//! application layer around it:
//!
//! - **Config**: TOML file plus environment overrides for API keys
//! - **Run**: validates a request, builds the provider registry and
//!   dispatches to single-location or Canada-wide aggregation
//! - **Export**: CSV (or JSON) with one column per attribute seen
//! - **Logging**: tracing to stderr

pub mod cities;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod run;

pub use canlist_sources::{ProviderKind, Record};
pub use config::AppConfig;
pub use error::{CanlistError, Result};
pub use run::{execute, RunRequest, Scope};
