//! HTMX Chat Widget
//!
//! A server-rendered chat widget: it shows a message thread, accepts text
//! and dragged or picked file attachments, forwards each message to a remote
//! `POST /generate` endpoint and renders the reply (text plus inline PNGs).
//!
//! # Architecture
//!
//! - **Widget**: Composer, conversation store and the `Idle`/`Sending` state machine
//! - **Transport**: One multipart request per send, JSON reply decoding
//! - **Render**: Pure markup functions for the thread and composer
//! - **Server**: Axum routes driven by HTMX, with SSE re-rendering
//!
//! # Modules
//!
//! - [`widget`]: Widget state and send cycle
//! - [`transport`]: Endpoint client and error collapse
//! - [`render`]: HTML rendering
//! - [`session`]: Per-browser widget sessions
//! - [`server`]: HTTP surface
//! - [`config`]: Layered configuration

pub mod config;
pub mod render;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod transport;
pub mod widget;

use std::sync::Arc;

use crate::config::AppConfig;
use session::SessionStore;
use transport::Transport;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store for widget state.
    pub sessions: SessionStore,
    /// Transport used for every send.
    pub transport: Arc<dyn Transport>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create state with an empty session store.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: SessionStore::new(),
            transport,
            config,
        }
    }
}
