//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialize logging.
///
/// Levels come from `RUST_LOG`, defaulting to `info` with debug output for
/// this crate. `log.json` switches the fmt layer to JSON lines.
pub fn init(log: &LogConfig) {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,htmx_chat_widget=debug"));

    let registry = tracing_subscriber::registry().with(filter_layer);

    if log.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}
