//! Shared helpers for the demo binaries.

use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// Installs a `fmt` subscriber once. The level comes from `LOGLEVEL`
/// (`trace`, `debug`, `info`, `warn`, `error`) and defaults to `info`.
pub fn setup_logger() {
    INIT.call_once(|| {
        let level = std::env::var("LOGLEVEL")
            .ok()
            .and_then(|value| value.parse::<Level>().ok())
            .unwrap_or(Level::INFO);
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_thread_names(true)
            .init();
    });
}
