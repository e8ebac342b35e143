//! Conversation messages and attachments.

use axum::body::Bytes;
use mime_guess::mime::Mime;
use serde::Serialize;
use uuid::Uuid;

/// Text shown by the loading placeholder while a request is in flight.
pub const LOADING_TEXT: &str = "Loading...";

/// Fixed user-visible text for any failed exchange with the endpoint.
pub const ERROR_TEXT: &str = "Sorry, something went wrong. Please try again.";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the widget.
    User,
    /// The remote endpoint.
    Agent,
}

impl Sender {
    /// Lowercase name, used for CSS classes and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

/// A file selected or dropped by the user.
///
/// The bytes are immutable; cloning an `AttachedFile` shares the buffer
/// rather than copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    name: String,
    data: Bytes,
    mime: String,
}

impl AttachedFile {
    /// Create an attachment.
    ///
    /// `content_type` is kept when it parses as a MIME type; otherwise the
    /// type is guessed from the file name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            format!("file-{}", Uuid::new_v4())
        } else {
            name
        };

        let mime = content_type
            .and_then(|ct| ct.parse::<Mime>().ok())
            .unwrap_or_else(|| mime_guess::from_path(&name).first_or_octet_stream())
            .to_string();

        Self {
            name,
            data: data.into(),
            mime,
        }
    }

    /// Original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw file contents.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// MIME type, always a syntactically valid one.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One entry of the conversation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Body text.
    pub text: String,
    /// Who wrote it.
    pub sender: Sender,
    /// Attachments sent with a user message.
    pub files: Vec<AttachedFile>,
    /// `data:` URIs returned by the endpoint.
    pub images: Vec<String>,
}

impl Message {
    /// A user message carrying the given text and attachments.
    #[must_use]
    pub fn user(text: impl Into<String>, files: Vec<AttachedFile>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            files,
            images: Vec::new(),
        }
    }

    /// An agent reply with optional inline images.
    #[must_use]
    pub fn agent(text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Agent,
            files: Vec::new(),
            images,
        }
    }

    /// The loading placeholder shown while a send is in flight.
    #[must_use]
    pub fn loading() -> Self {
        Self::agent(LOADING_TEXT, Vec::new())
    }

    /// The synthetic reply used for every transport failure.
    #[must_use]
    pub fn error() -> Self {
        Self::agent(ERROR_TEXT, Vec::new())
    }
}

/// Text and attachments handed to the transport by a send.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    /// Value of the `input` form field.
    pub text: String,
    /// One `files` form field per entry, in order.
    pub files: Vec<AttachedFile>,
}
