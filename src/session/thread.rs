//! Per-browser widget sessions and their store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::transport::{self, Transport};
use crate::widget::{ChatWidget, PendingSend, SendRejected};

/// One chat widget bound to a browser session.
///
/// Cloning is cheap and yields a handle to the same widget. The widget lock
/// is only held for synchronous mutations, never across the transport call.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier.
    id: String,
    /// Widget state.
    widget: Mutex<ChatWidget>,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    /// Create a new session with the given ID.
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id,
                widget: Mutex::new(ChatWidget::new()),
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    fn lock(&self) -> MutexGuard<'_, ChatWidget> {
        self.inner
            .widget
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the widget.
    pub fn read<R>(&self, f: impl FnOnce(&ChatWidget) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the widget.
    pub fn update<R>(&self, f: impl FnOnce(&mut ChatWidget) -> R) -> R {
        let result = f(&mut self.lock());
        self.touch();
        result
    }

    /// Watch for widget changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.read(ChatWidget::subscribe)
    }

    /// Start a send. See [`ChatWidget::begin_send`].
    pub fn begin_send(&self) -> Result<PendingSend, SendRejected> {
        self.update(ChatWidget::begin_send)
    }

    /// Run the exchange for `pending` and apply its result.
    ///
    /// The widget stays unlocked while the transport is awaited, so edits to
    /// the draft are still accepted.
    pub async fn complete_exchange(&self, pending: PendingSend, transport: &dyn Transport) {
        let PendingSend {
            request_id,
            outgoing,
        } = pending;

        let replies = transport::deliver(transport, outgoing).await;

        let applied = self.update(|widget| widget.complete_send(request_id, replies));
        if !applied {
            tracing::warn!(
                name: "chat.send.stale",
                session_id = %self.id(),
                request_id = %request_id,
                "Discarding reply for a send that is no longer in flight"
            );
        }
    }

    /// Update the last activity timestamp.
    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the session has expired with a custom timeout.
    ///
    /// Sessions with a send in flight never expire.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        if self.read(ChatWidget::is_busy) {
            return false;
        }
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Negative duration means clock skew; treat as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    fn sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new session and return it.
    #[must_use]
    pub fn create(&self) -> Session {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new session with a specific ID, replacing any existing one.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Session {
        let id = id.into();
        let session = Session::new(id.clone());
        self.sessions_mut().insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions().get(id).cloned()
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        if let Some(session) = self.get(id) {
            return session;
        }
        self.sessions_mut()
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id.to_string()))
            .clone()
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions_mut().remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.sessions_mut();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    /// List all session IDs.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.sessions().keys().cloned().collect()
    }
}
