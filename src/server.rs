use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{
        Html, Redirect,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::render::{
    COMPOSER_EVENT, THREAD_EVENT, html_shell, render_composer, render_thread, render_widget,
};
use crate::session::{Session, SessionStore};
use crate::transport::HttpTransport;
use crate::widget::{AttachedFile, Message, SendRejected};

/// Multipart field carrying attachments.
const FILES_FIELD: &str = "files";

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&config.endpoint.base_url)?;

    info!(
        name: "chat.endpoint.configured",
        endpoint = %transport.endpoint(),
        "Generate endpoint configured"
    );

    let state = AppState::new(Arc::clone(&config), Arc::new(transport));

    spawn_session_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.session.idle_timeout_secs),
    );

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router. Exposed separately so tests can drive it in-process.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        // HTML pages
        .route("/", get(index_handler))
        .route("/chat/{id}", get(chat_page))
        .route("/chat/{id}/events", get(chat_events))
        // Composer
        .route("/chat/{id}/text", post(update_text))
        .route("/chat/{id}/files", post(add_files))
        .route("/chat/{id}/files/{index}/remove", post(remove_file))
        // Drop target
        .route("/chat/{id}/drag/enter", post(drag_enter))
        .route("/chat/{id}/drag/leave", post(drag_leave))
        .route("/chat/{id}/drop", post(drop_files))
        // Send cycle
        .route("/chat/{id}/send", post(send))
        // JSON
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        // Static assets
        .nest_service("/static", static_dir)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_session_sweeper(sessions: SessionStore, idle_timeout: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle_timeout);
            if removed > 0 {
                info!(
                    name: "session.expired",
                    removed,
                    remaining = sessions.len(),
                    "Expired idle sessions"
                );
            }
        }
    });
}

fn find_session(state: &AppState, id: &str) -> Result<Session, StatusCode> {
    state.sessions.get(id).ok_or(StatusCode::NOT_FOUND)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Start a fresh session.
async fn index_handler(State(state): State<AppState>) -> Redirect {
    let session = state.sessions.create();
    info!(name: "session.created", session_id = %session.id(), "Session created");
    Redirect::to(&format!("/chat/{}", session.id()))
}

/// GET /chat/:id - Full page for a session.
///
/// Only UUID ids are accepted; anything else starts a fresh session.
async fn chat_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, Redirect> {
    let Ok(uuid) = Uuid::parse_str(&id) else {
        tracing::debug!(session_id = %id.escape_debug(), "Rejecting non-UUID session id");
        return Err(Redirect::to("/"));
    };
    let canonical = uuid.to_string();
    if canonical != id {
        return Err(Redirect::to(&format!("/chat/{canonical}")));
    }

    let session = state.sessions.get_or_create(&canonical);
    let widget = session.read(|widget| render_widget(session.id(), widget));
    Ok(Html(html_shell(&state.config.ui, &widget)))
}

/// GET /chat/:id/events - Push re-rendered fragments on every change.
async fn chat_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, StatusCode> {
    let session = find_session(&state, &id)?;
    let mut changes = session.subscribe();

    let stream = async_stream::stream! {
        loop {
            changes.borrow_and_update();
            let (thread, composer) = session.read(|widget| {
                (
                    render_thread(widget.conversation()),
                    render_composer(session.id(), widget),
                )
            });
            yield Ok::<Event, Infallible>(Event::default().event(THREAD_EVENT).data(thread));
            yield Ok(Event::default().event(COMPOSER_EVENT).data(composer));

            if changes.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Composer Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form body carrying the draft text.
#[derive(Debug, Deserialize)]
struct TextForm {
    #[serde(default)]
    input: Option<String>,
}

/// POST /chat/:id/text - Replace the draft text.
async fn update_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<TextForm>,
) -> Result<StatusCode, StatusCode> {
    let session = find_session(&state, &id)?;
    session.update(|widget| widget.update_text(form.input.unwrap_or_default()));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat/:id/files - Attach picked files.
async fn add_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<StatusCode, (StatusCode, String)> {
    let session = find_session(&state, &id).map_err(|status| (status, String::new()))?;
    let files = read_files(multipart).await?;

    tracing::debug!(
        name: "chat.files.added",
        session_id = %id,
        count = files.len(),
        "Files attached"
    );
    session.update(|widget| widget.add_files(files));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat/:id/files/:index/remove - Detach one file.
async fn remove_file(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<StatusCode, StatusCode> {
    let session = find_session(&state, &id)?;
    if !session.update(|widget| widget.remove_file(index)) {
        tracing::debug!(session_id = %id, index, "Ignoring removal of missing attachment");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Collect every `files` part of a multipart body, in order.
async fn read_files(mut multipart: Multipart) -> Result<Vec<AttachedFile>, (StatusCode, String)> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {e}"),
        )
    })? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let filename = field.file_name().map(ToString::to_string).unwrap_or_default();
        let content_type = field.content_type().map(ToString::to_string);

        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file '{filename}': {e}"),
            )
        })?;

        // An empty file input still submits one nameless, empty part.
        if filename.is_empty() && data.is_empty() {
            continue;
        }

        files.push(AttachedFile::new(filename, data, content_type.as_deref()));
    }

    Ok(files)
}

// ─────────────────────────────────────────────────────────────────────────────
// Drop Target Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /chat/:id/drag/enter
async fn drag_enter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    find_session(&state, &id)?.update(|widget| widget.drag_enter());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat/:id/drag/leave
async fn drag_leave(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    find_session(&state, &id)?.update(|widget| widget.drag_leave());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat/:id/drop - Attach dropped files and clear the highlight.
async fn drop_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<StatusCode, (StatusCode, String)> {
    let session = find_session(&state, &id).map_err(|status| (status, String::new()))?;
    let files = read_files(multipart).await?;
    session.update(|widget| widget.drop_files(files));
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Send Handler
// ─────────────────────────────────────────────────────────────────────────────

/// POST /chat/:id/send - Commit the draft and start the exchange.
///
/// Returns as soon as the user message and placeholder are in the thread;
/// the reply arrives over the event stream.
async fn send(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<TextForm>,
) -> Result<StatusCode, StatusCode> {
    let session = find_session(&state, &id)?;

    if let Some(text) = form.input {
        session.update(|widget| widget.update_text(text));
    }

    let pending = match session.begin_send() {
        Ok(pending) => pending,
        Err(SendRejected::EmptyDraft) => return Ok(StatusCode::NO_CONTENT),
        Err(SendRejected::Busy) => {
            tracing::debug!(session_id = %id, "Send rejected while busy");
            return Err(StatusCode::CONFLICT);
        }
    };

    info!(
        name: "chat.send.accepted",
        session_id = %id,
        request_id = %pending.request_id,
        files = pending.outgoing.files.len(),
        "Send accepted"
    );

    let transport = Arc::clone(&state.transport);
    tokio::spawn(async move {
        session
            .complete_exchange(pending, transport.as_ref())
            .await;
    });

    Ok(StatusCode::ACCEPTED)
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON API
// ─────────────────────────────────────────────────────────────────────────────

/// Message DTO for API responses. Attachments are listed by name only.
#[derive(Debug, Serialize)]
struct MessageDto {
    sender: &'static str,
    text: String,
    files: Vec<String>,
    images: Vec<String>,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            sender: m.sender.as_str(),
            text: m.text.clone(),
            files: m.files.iter().map(|f| f.name().to_string()).collect(),
            images: m.images.clone(),
        }
    }
}

/// GET /api/sessions/:id/messages - Committed messages of a session.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let session = find_session(&state, &id)?;
    let messages = session.read(|widget| {
        widget
            .conversation()
            .messages()
            .iter()
            .map(MessageDto::from)
            .collect()
    });
    Ok(Json(messages))
}
