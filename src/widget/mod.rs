//! Chat widget state.
//!
//! The widget is a single logical actor: a [`ChatWidget`] owns the draft
//! ([`Composer`]), the thread ([`ConversationStore`]) and the send
//! [`Phase`]. Nothing in this module performs I/O; the send cycle is split
//! into [`ChatWidget::begin_send`] and [`ChatWidget::complete_send`] so the
//! caller can await the transport in between without holding the widget.
//!
//! # Example
//!
//! ```rust
//! use htmx_chat_widget::widget::{ChatWidget, Message};
//!
//! let mut widget = ChatWidget::new();
//! widget.update_text("Hello!");
//!
//! let pending = widget.begin_send().unwrap();
//! assert!(widget.is_busy());
//!
//! widget.complete_send(pending.request_id, vec![Message::agent("Hi", Vec::new())]);
//! assert_eq!(widget.conversation().len(), 2);
//! ```

mod composer;
mod conversation;
mod message;
mod state;

pub use composer::Composer;
pub use conversation::ConversationStore;
pub use message::{AttachedFile, ERROR_TEXT, LOADING_TEXT, Message, OutgoingMessage, Sender};
pub use state::{ChatWidget, PendingSend, Phase, SendRejected};
