//! HTTP server.
//!
//! Exposes the chat relay and the archive builder over axum. Each request is
//! isolated: a failing backend or history store degrades that request only.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{RelaySettings, ServerConfig};
pub use error::ApiError;
pub use routes::{AppState, api_routes, health_routes};

use crate::error::{Error, IoError, Result};
use crate::generation::{Generator, HuggingFaceGenerator};
use crate::relay::ChatService;
use crate::storage::SharedStorage;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full application router.
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    api_routes(state)
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Builds the handler state from a validated configuration.
///
/// # Errors
///
/// Returns an error if the relay policy or HTTP client cannot be built.
pub fn build_state(config: &ServerConfig, storage: Option<SharedStorage>) -> Result<AppState> {
    let generator: Arc<dyn Generator> =
        Arc::new(HuggingFaceGenerator::new(config.backend.clone())?);
    let mut chat = ChatService::new(generator, config.relay.policy()?);
    if let Some(storage) = storage {
        chat = chat.with_storage(storage);
    }

    Ok(AppState {
        chat: Arc::new(chat),
        archive: config.archive,
    })
}

/// Binds the listener and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state cannot be built or the address cannot be
/// bound.
pub async fn serve(config: ServerConfig, storage: Option<SharedStorage>) -> Result<()> {
    let state = build_state(&config, storage)?;
    let app = build_router(state, config.body_limit);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| Error::Config {
            message: format!("cannot bind {address}: {e}"),
        })?;

    tracing::info!(
        address = %address,
        model = %config.backend.model,
        generation = config.backend.mode.as_str(),
        segmenter = %config.relay.segmenter,
        chunk_size = config.relay.chunk_size,
        "chatforge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IoError::Generic(e.to_string()))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn app(body_limit: usize) -> Router {
        let state = build_state(&ServerConfig::default(), None).unwrap();
        build_router(state, body_limit)
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let text = format!("=== file: a.txt ===\n{}", "x".repeat(4096));
        let body = serde_json::json!({ "aiText": text }).to_string();
        let request = Request::post("/api/download")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/chat")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(1024).oneshot(request).await.unwrap();
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
