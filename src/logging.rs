//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for CSV, HTML and raw JSON.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. `RUST_LOG` takes precedence over `debug`.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialisation (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
