//! Multipart HTTP transport.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use super::reply::GenerateResponse;
use super::{Transport, TransportError};
use crate::widget::{Message, OutgoingMessage};

/// Path appended to the configured base URL.
const GENERATE_PATH: &str = "generate";

/// Posts messages to `{base_url}/generate` as `multipart/form-data`.
///
/// The request carries an `input` text field and one `files` field per
/// attachment. No timeout is set beyond the HTTP client's defaults.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for the given base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, TransportError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a transport with a custom reqwest client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            http,
            endpoint: generate_url(base_url.as_ref())?,
        })
    }

    /// Full URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolve `generate` against a base URL, with or without a trailing slash.
fn generate_url(base_url: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(&format!("{}/", base_url.trim().trim_end_matches('/')))?;
    base.join(GENERATE_PATH)
}

/// Build the multipart body for one message.
fn build_form(outgoing: OutgoingMessage) -> Result<Form, TransportError> {
    let mut form = Form::new().text("input", outgoing.text);

    for file in outgoing.files {
        let len = file.len() as u64;
        let part = Part::stream_with_length(file.data().clone(), len)
            .file_name(file.name().to_string())
            .mime_str(file.mime())?;
        form = form.part("files", part);
    }

    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, outgoing: OutgoingMessage) -> Result<Vec<Message>, TransportError> {
        tracing::info!(
            name: "chat.exchange.start",
            endpoint = %self.endpoint,
            text_len = outgoing.text.len(),
            files = outgoing.files.len(),
            "Sending message"
        );

        let form = build_form(outgoing)?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let reply = GenerateResponse::from_slice(&body)?;
        Ok(reply.into_messages())
    }
}
