//! Route handlers.
//!
//! - `POST /api/chat`: one chat turn, streamed as server-sent events or
//!   returned whole.
//! - `POST /api/download`: marker-delimited text in, zip archive out.
//! - `GET /health`: liveness probe.

use crate::archive::{ARCHIVE_CONTENT_TYPE, ARCHIVE_FILE_NAME, ArchivePolicy, build_archive};
use crate::core::{ChatTurn, TurnMessage};
use crate::relay::{ChatService, DeliveryMode};
use crate::server::error::ApiError;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered between a relay session and its SSE body.
const SSE_BUFFER: usize = 32;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat sessions.
    pub chat: Arc<ChatService>,
    /// Limits for `/api/download`.
    pub archive: ArchivePolicy,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation owner.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Prior turns, last one is the prompt.
    #[serde(default)]
    pub messages: Option<Vec<TurnMessage>>,
    /// Ask for a streamed reply.
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    fn into_turn(self) -> Option<ChatTurn> {
        ChatTurn::new(self.user_id?, self.messages?)
    }
}

/// Body of `POST /api/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    /// Model output holding file markers.
    #[serde(default, rename = "aiText")]
    pub ai_text: Option<String>,
}

/// Builds the API routes.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/download", post(download_handler))
        .with_state(state)
}

/// Builds the health routes.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let stream_flag = request.stream;
    let turn = request.into_turn().ok_or(ApiError::MissingParameters)?;

    let accepts_event_stream = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"));

    match DeliveryMode::negotiate(stream_flag, accepts_event_stream) {
        DeliveryMode::Streaming => {
            let (tx, rx) = mpsc::channel(SSE_BUFFER);
            let chat = Arc::clone(&state.chat);
            tokio::spawn(async move {
                chat.respond(&turn, tx).await;
            });

            let events = ReceiverStream::new(rx)
                .map(|chunk| Ok::<_, Infallible>(Event::default().data(chunk.to_json())));
            Ok(Sse::new(events)
                .keep_alive(KeepAlive::default())
                .into_response())
        }
        DeliveryMode::Whole => {
            let reply = state.chat.reply(&turn).await;
            let status = if reply.failed {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::OK
            };
            Ok((status, Json(json!({ "reply": reply.text }))).into_response())
        }
    }
}

async fn download_handler(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let text = request
        .ai_text
        .filter(|text| !text.is_empty())
        .ok_or(ApiError::MissingAiOutput)?;

    let archive = build_archive(&text, &state.archive)?;
    tracing::info!(
        entries = archive.entries(),
        bytes = archive.size(),
        "serving project archive"
    );

    let headers = [
        (header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{ARCHIVE_FILE_NAME}\""),
        ),
    ];
    Ok((headers, archive.bytes).into_response())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "chatforge"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StreamChunk;
    use crate::error::GenerationError;
    use crate::generation::{Generation, Generator};
    use crate::relay::{DEFAULT_PLACEHOLDER, RelayPolicy};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::io::{Cursor, Read};
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl Generator for Echo {
        async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
            if prompt == "fail" {
                return Err(GenerationError::Transport("refused".to_string()));
            }
            Ok(Generation::Complete(format!("echo: {prompt}")))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn app(archive: ArchivePolicy) -> Router {
        let policy = RelayPolicy::new().with_chunk_size(4).unwrap().immediate();
        let state = AppState {
            chat: Arc::new(ChatService::new(Arc::new(Echo), policy)),
            archive,
        };
        api_routes(state).merge(health_routes())
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sse_chunks(body: &str) -> Vec<StreamChunk> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim_start()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ArchivePolicy::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "healthy", "service": "chatforge" })
        );
    }

    #[tokio::test]
    async fn test_chat_whole_reply() {
        let body = json!({ "userId": "u1", "messages": [{ "role": "user", "content": "hi" }] });
        let response = app(ArchivePolicy::default())
            .oneshot(post_json("/api/chat", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "reply": "echo: hi" }));
    }

    #[tokio::test]
    async fn test_chat_whole_reply_failure() {
        let body = json!({ "userId": "u1", "messages": [{ "role": "user", "content": "fail" }] });
        let response = app(ArchivePolicy::default())
            .oneshot(post_json("/api/chat", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await,
            json!({ "reply": DEFAULT_PLACEHOLDER })
        );
    }

    #[tokio::test]
    async fn test_chat_streaming() {
        let body = json!({
            "userId": "u1",
            "messages": [{ "role": "user", "content": "hi" }],
            "stream": true
        });
        let response = app(ArchivePolicy::default())
            .oneshot(post_json("/api/chat", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let chunks = sse_chunks(std::str::from_utf8(&bytes).unwrap());
        assert_eq!(
            chunks,
            vec![
                StreamChunk::token("echo"),
                StreamChunk::token(": hi"),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_streaming_via_accept_header() {
        let body = json!({ "userId": "u1", "messages": [{ "role": "user", "content": "fail" }] });
        let mut request = post_json("/api/chat", &body);
        request
            .headers_mut()
            .insert(header::ACCEPT, "text/event-stream".parse().unwrap());

        let response = app(ArchivePolicy::default()).oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let chunks = sse_chunks(std::str::from_utf8(&bytes).unwrap());
        assert_eq!(
            chunks,
            vec![StreamChunk::token(DEFAULT_PLACEHOLDER), StreamChunk::Done]
        );
    }

    #[tokio::test]
    async fn test_chat_missing_parameters() {
        for body in [
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
            json!({ "userId": "u1" }),
            json!({ "userId": "", "messages": [{ "role": "user", "content": "hi" }] }),
            json!({ "userId": "u1", "messages": [] }),
        ] {
            let response = app(ArchivePolicy::default())
                .oneshot(post_json("/api/chat", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Missing parameters" })
            );
        }
    }

    #[tokio::test]
    async fn test_chat_unknown_role_rejected() {
        let body = json!({ "userId": "u1", "messages": [{ "role": "system", "content": "x" }] });
        let response = app(ArchivePolicy::default())
            .oneshot(post_json("/api/chat", &body))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_download_archive() {
        let body = json!({ "aiText": "=== file: a.txt ===\nhello\n=== file: b/c.txt ===\nworld" });
        let response = app(ArchivePolicy::default())
            .oneshot(post_json("/api/download", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"project.zip\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut content = String::new();
        archive
            .by_name("b/c.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "world");
    }

    #[tokio::test]
    async fn test_download_errors() {
        let cases = [
            (json!({}), StatusCode::BAD_REQUEST),
            (json!({ "aiText": "" }), StatusCode::BAD_REQUEST),
            (json!({ "aiText": "no markers here" }), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (body, status) in cases {
            let response = app(ArchivePolicy::default())
                .oneshot(post_json("/api/download", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), status, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_download_over_cap() {
        let body = json!({ "aiText": "=== file: a.txt ===\n0123456789" });
        let response = app(ArchivePolicy::with_max_total_bytes(4))
            .oneshot(post_json("/api/download", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
