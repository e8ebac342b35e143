//! Session management.
//!
//! Each browser tab talks to its own [`ChatWidget`](crate::widget::ChatWidget),
//! held by a [`Session`]. Sessions live in memory only and are identified by
//! UUID.
//!
//! # Architecture
//!
//! - [`Session`]: Handle to one widget plus activity bookkeeping
//! - [`SessionStore`]: Thread-safe store for all active sessions
//!
//! # Example
//!
//! ```rust
//! use htmx_chat_widget::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create();
//! session.update(|widget| widget.update_text("Hello!"));
//!
//! let pending = session.begin_send().unwrap();
//! assert_eq!(pending.outgoing.text, "Hello!");
//! assert!(session.read(|widget| widget.is_busy()));
//! ```

mod thread;

pub use thread::{Session, SessionStore};
