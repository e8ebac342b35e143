//! Draft text and attachments waiting to be sent.

use super::message::{AttachedFile, OutgoingMessage};

/// Holds the not-yet-sent text and attachment list.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    text: String,
    files: Vec<AttachedFile>,
}

impl Composer {
    /// Create an empty composer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the draft text.
    pub fn update_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Append files in arrival order. Duplicate names are kept.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = AttachedFile>) {
        self.files.extend(files);
    }

    /// Remove the attachment at `index`.
    ///
    /// Returns `false` and leaves the list untouched when the index is out of
    /// range.
    pub fn remove_file(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.files.remove(index);
            true
        } else {
            false
        }
    }

    /// Current draft text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Pending attachments.
    #[must_use]
    pub fn files(&self) -> &[AttachedFile] {
        &self.files
    }

    /// Nothing worth sending: whitespace-only text and no files.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }

    /// Empty the composer, handing its contents to the caller.
    pub fn take(&mut self) -> OutgoingMessage {
        OutgoingMessage {
            text: std::mem::take(&mut self.text),
            files: std::mem::take(&mut self.files),
        }
    }
}
