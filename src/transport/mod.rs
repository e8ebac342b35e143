//! Outbound exchange with the generate endpoint.
//!
//! A [`Transport`] turns one [`OutgoingMessage`] into the agent messages to
//! append. [`HttpTransport`] is the production implementation; tests supply
//! their own.
//!
//! Failures never reach the widget as errors: [`deliver`] logs them and
//! substitutes a single [`Message::error`] reply.

pub mod http;
pub mod reply;

pub use http::HttpTransport;
pub use reply::GenerateResponse;

use async_trait::async_trait;

use crate::widget::{Message, OutgoingMessage};

/// Errors raised while talking to the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured base URL cannot be used.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Connection, TLS or body transfer failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics only.
        body: String,
    },

    /// The body was not the expected JSON shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends a message and returns the agent messages to append.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Perform a single attempt. No retries.
    async fn exchange(&self, outgoing: OutgoingMessage) -> Result<Vec<Message>, TransportError>;
}

/// Run one exchange, collapsing every failure into the fixed error reply.
pub async fn deliver(transport: &dyn Transport, outgoing: OutgoingMessage) -> Vec<Message> {
    let file_count = outgoing.files.len();
    match transport.exchange(outgoing).await {
        Ok(replies) => {
            tracing::debug!(
                name: "chat.exchange.ok",
                replies = replies.len(),
                files = file_count,
                "Endpoint replied"
            );
            replies
        }
        Err(e) => {
            tracing::error!(
                name: "chat.exchange.failed",
                error = %e,
                files = file_count,
                "Endpoint exchange failed"
            );
            vec![Message::error()]
        }
    }
}
