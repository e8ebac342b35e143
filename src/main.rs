//! HTMX Chat Widget Server
//!
//! Entry point: loads configuration, initialises logging and serves the widget.

use std::sync::Arc;

use anyhow::Context;
use mimalloc::MiMalloc;

use htmx_chat_widget::config::AppConfig;
use htmx_chat_widget::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load().context("loading configuration")?;

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.log);

    server::start_server(Arc::new(config)).await
}
