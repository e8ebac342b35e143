use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
};
use htmx_chat_widget::transport::{HttpTransport, Transport, TransportError, deliver};
use htmx_chat_widget::widget::{AttachedFile, ERROR_TEXT, OutgoingMessage, Sender};
use serde_json::{Value, json};

/// One multipart field as the upstream saw it.
#[derive(Debug, Clone, PartialEq)]
struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

type Captured = Arc<Mutex<Vec<Part>>>;

async fn capture(State(seen): State<Captured>, mut multipart: Multipart) -> Json<Value> {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part = Part {
            name: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(ToString::to_string),
            content_type: field.content_type().map(ToString::to_string),
            data: field.bytes().await.unwrap().to_vec(),
        };
        seen.lock().unwrap().push(part);
    }

    Json(json!({
        "messages": ["thinking", "here is your plot"],
        "files": { "plot": "iVBORw0KGgo=" }
    }))
}

async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Talk to the local upstream directly, whatever proxy the environment sets.
fn local_transport(base: impl AsRef<str>) -> HttpTransport {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpTransport::with_client(base, http).unwrap()
}

#[tokio::test]
async fn test_multipart_fields_and_reply() {
    let seen = Captured::default();
    let base = spawn_upstream(
        Router::new()
            .route("/generate", post(capture))
            .with_state(Arc::clone(&seen)),
    )
    .await;

    let transport = local_transport(&base);
    let outgoing = OutgoingMessage {
        text: "plot this".to_string(),
        files: vec![
            AttachedFile::new("data.csv", b"a,b\n1,2\n".to_vec(), Some("text/csv")),
            AttachedFile::new("notes.txt", b"hi".to_vec(), None),
        ],
    };

    let replies = transport.exchange(outgoing).await.unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].sender, Sender::Agent);
    assert_eq!(replies[0].text, "here is your plot");
    assert_eq!(
        replies[0].images,
        ["data:image/png;base64,iVBORw0KGgo=".to_string()]
    );

    let parts = seen.lock().unwrap().clone();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].name, "input");
    assert_eq!(parts[0].data, b"plot this");

    assert_eq!(parts[1].name, "files");
    assert_eq!(parts[1].file_name.as_deref(), Some("data.csv"));
    assert_eq!(parts[1].content_type.as_deref(), Some("text/csv"));
    assert_eq!(parts[1].data, b"a,b\n1,2\n");

    assert_eq!(parts[2].name, "files");
    assert_eq!(parts[2].file_name.as_deref(), Some("notes.txt"));
    assert_eq!(parts[2].content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_base_url_with_path_prefix() {
    let seen = Captured::default();
    let base = spawn_upstream(
        Router::new()
            .route("/api/v1/generate", post(capture))
            .with_state(seen),
    )
    .await;

    let transport = local_transport(format!("{base}/api/v1"));
    let replies = transport
        .exchange(OutgoingMessage {
            text: "hi".to_string(),
            files: Vec::new(),
        })
        .await
        .unwrap();

    assert_eq!(replies[0].text, "here is your plot");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let base = spawn_upstream(Router::new().route(
        "/generate",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    ))
    .await;

    let transport = local_transport(&base);
    let err = transport
        .exchange(OutgoingMessage::default())
        .await
        .unwrap_err();

    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let replies = deliver(&transport, OutgoingMessage::default()).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, ERROR_TEXT);
}

#[tokio::test]
async fn test_malformed_json_is_a_decode_error() {
    let base = spawn_upstream(Router::new().route(
        "/generate",
        post(|| async { Json(json!({ "messages": "not a list" })) }),
    ))
    .await;

    let transport = local_transport(&base);
    let err = transport
        .exchange(OutgoingMessage::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Grab a free port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = local_transport(format!("http://{addr}"));
    let err = transport
        .exchange(OutgoingMessage::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));

    let replies = deliver(&transport, OutgoingMessage::default()).await;
    assert_eq!(replies[0].sender, Sender::Agent);
    assert_eq!(replies[0].text, ERROR_TEXT);
}
