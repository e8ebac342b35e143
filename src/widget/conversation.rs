//! Ordered message thread with a single loading placeholder slot.

use super::message::Message;

/// Append-only list of messages plus an optional in-flight placeholder.
///
/// The placeholder lives in its own field instead of the message list, so
/// clearing it can never remove a real message that happens to carry the
/// same text.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
    pending_placeholder: Option<Message>,
}

impl ConversationStore {
    /// Create an empty thread.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the thread.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Show the loading placeholder. Returns `false` if one is already shown.
    pub fn show_loading_placeholder(&mut self) -> bool {
        if self.pending_placeholder.is_some() {
            return false;
        }
        self.pending_placeholder = Some(Message::loading());
        true
    }

    /// Remove the loading placeholder. Returns `false` if none was shown.
    pub fn remove_loading_placeholder(&mut self) -> bool {
        self.pending_placeholder.take().is_some()
    }

    /// The placeholder, if a request is in flight.
    #[must_use]
    pub fn pending_placeholder(&self) -> Option<&Message> {
        self.pending_placeholder.as_ref()
    }

    /// Committed messages, oldest first. Excludes the placeholder.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Everything to display, oldest first, with the placeholder last.
    pub fn thread(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().chain(self.pending_placeholder.iter())
    }

    /// Number of committed messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message has been committed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
