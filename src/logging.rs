//! Tracing subscriber setup for the CLI.
//!
//! All diagnostics go to stderr so stdout stays clean for listing output.

use tracing_subscriber::EnvFilter;

/// Filter directives for a given `-v` count.
///
/// Dependency crates stay at `warn` so HTTP internals do not drown out
/// provider logs.
pub fn default_directives(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("canlist={level},canlist_sources={level},reqwest=warn,hyper=warn,html5ever=warn")
}

/// Install the global subscriber. `RUST_LOG` overrides `verbose`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
