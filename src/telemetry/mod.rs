//! Tracing initialization hooks.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber with env filter.
///
/// Use RUST_LOG to configure, e.g.:
/// RUST_LOG=debug,ludo_server::driver=info,tower_http=warn
pub fn init() {
    let fmt_layer = fmt::layer().with_target(true);

    // Per-request traces from the HTTP layer are only wanted on demand;
    // room lifecycle and driver activity stay visible at info.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
