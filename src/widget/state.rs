//! Widget state machine: composer, thread, drag highlight and send phase.

use tokio::sync::watch;
use uuid::Uuid;

use super::composer::Composer;
use super::conversation::ConversationStore;
use super::message::{AttachedFile, Message, OutgoingMessage};

/// Whether a send is in flight.
///
/// At most one send can be outstanding; the id ties the eventual reply to
/// the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Ready to send.
    #[default]
    Idle,
    /// Waiting on the transport.
    Sending {
        /// Id handed out by [`ChatWidget::begin_send`].
        request_id: Uuid,
    },
}

/// Reasons a send attempt did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    /// Whitespace-only text and no attachments. Nothing was changed.
    #[error("nothing to send")]
    EmptyDraft,
    /// Another send is still in flight.
    #[error("a send is already in flight")]
    Busy,
}

/// A send that has been committed to the thread and awaits its reply.
#[derive(Debug)]
pub struct PendingSend {
    /// Correlates the reply with this send.
    pub request_id: Uuid,
    /// What to hand to the transport.
    pub outgoing: OutgoingMessage,
}

/// All state of one chat widget.
///
/// Every mutation bumps a revision counter that subscribers can watch to
/// know when to re-render.
#[derive(Debug)]
pub struct ChatWidget {
    composer: Composer,
    conversation: ConversationStore,
    phase: Phase,
    dragging: bool,
    revision: watch::Sender<u64>,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatWidget {
    /// Create an idle widget with an empty thread.
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            composer: Composer::new(),
            conversation: ConversationStore::new(),
            phase: Phase::Idle,
            dragging: false,
            revision,
        }
    }

    /// Watch the revision counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Composer
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the draft text. Accepted while a send is in flight.
    pub fn update_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.composer.text() != text {
            self.composer.update_text(text);
            self.notify();
        }
    }

    /// Append attachments in arrival order.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = AttachedFile>) {
        let before = self.composer.files().len();
        self.composer.add_files(files);
        if self.composer.files().len() != before {
            self.notify();
        }
    }

    /// Remove the attachment at `index`; out-of-range indexes are ignored.
    pub fn remove_file(&mut self, index: usize) -> bool {
        let removed = self.composer.remove_file(index);
        if removed {
            self.notify();
        }
        removed
    }

    // ─────────────────────────────────────────────────────────────────────
    // Drop target
    // ─────────────────────────────────────────────────────────────────────

    /// A drag entered the drop target.
    pub fn drag_enter(&mut self) {
        if !self.dragging {
            self.dragging = true;
            self.notify();
        }
    }

    /// A drag left the drop target without dropping.
    pub fn drag_leave(&mut self) {
        if self.dragging {
            self.dragging = false;
            self.notify();
        }
    }

    /// Files were dropped: clear the highlight and attach them in drop order.
    pub fn drop_files(&mut self, files: impl IntoIterator<Item = AttachedFile>) {
        self.dragging = false;
        self.composer.add_files(files);
        self.notify();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Send cycle
    // ─────────────────────────────────────────────────────────────────────

    /// Start a send.
    ///
    /// On success the user message is already in the thread, the composer is
    /// empty, the loading placeholder is showing and the widget is
    /// [`Phase::Sending`]. The caller must pass the returned id back to
    /// [`complete_send`](Self::complete_send).
    pub fn begin_send(&mut self) -> Result<PendingSend, SendRejected> {
        if self.is_busy() {
            return Err(SendRejected::Busy);
        }
        if self.composer.is_blank() {
            return Err(SendRejected::EmptyDraft);
        }

        let outgoing = self.composer.take();
        self.conversation
            .append(Message::user(outgoing.text.clone(), outgoing.files.clone()));
        self.conversation.show_loading_placeholder();

        let request_id = Uuid::new_v4();
        self.phase = Phase::Sending { request_id };
        self.notify();

        Ok(PendingSend {
            request_id,
            outgoing,
        })
    }

    /// Finish the send identified by `request_id`.
    ///
    /// Replaces the placeholder with `replies` and returns to idle. A
    /// completion for any other id is ignored and `false` is returned.
    pub fn complete_send(&mut self, request_id: Uuid, replies: Vec<Message>) -> bool {
        match self.phase {
            Phase::Sending { request_id: current } if current == request_id => {}
            _ => return false,
        }

        self.conversation.remove_loading_placeholder();
        for reply in replies {
            self.conversation.append(reply);
        }
        self.phase = Phase::Idle;
        self.notify();
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    /// Draft state.
    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The thread.
    #[must_use]
    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a send is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Sending { .. })
    }

    /// Whether the drop target is highlighted.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
