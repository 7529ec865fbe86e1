//! # Blob Server
//!
//! A small bytebin-compatible store for greetings, so remote sharing works
//! without a third-party service.
//!
//! ## Usage
//!
//! ```bash
//! greetcard serve --listen 0.0.0.0:8080 --data-dir ./greetings
//! ```
//!
//! Then point sessions at it with `--backend bytebin:http://localhost:8080`.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /post` | Store a JSON body, answer `{"key": "..."}` |
//! | `GET /:key` | Stored JSON, or 404 |

mod handlers;
mod state;

pub use state::{AppState, DEFAULT_MAX_BLOB_BYTES, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::GreetcardError;

/// Build the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.config.max_blob_bytes;
    Router::new()
        .route(
            "/post",
            post(handlers::blob::post).layer(DefaultBodyLimit::max(limit)),
        )
        .route("/:key", get(handlers::blob::get))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use greetcard::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), greetcard::GreetcardError> {
/// serve(ServerConfig::new("0.0.0.0:8080", "./greetings")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), GreetcardError> {
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let app = router(Arc::new(AppState::new(config.clone())));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            GreetcardError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!(
        listen = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        "blob server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| GreetcardError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(dir: &std::path::Path) -> Router {
        router(Arc::new(AppState::new(ServerConfig::new("127.0.0.1:0", dir))))
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"name":"Alex"}"#;

        let response = app(dir.path())
            .oneshot(
                Request::post("/post")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let key = json["key"].as_str().unwrap().to_string();

        let response = app(dir.path())
            .oneshot(Request::get(format!("/{}", key)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_unknown_key_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/abc1234").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejects_non_json() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::post("/post").body(Body::from("hello")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::new("127.0.0.1:0", dir.path());
        config.max_blob_bytes = 16;
        let app = router(Arc::new(AppState::new(config)));

        let response = app
            .oneshot(
                Request::post("/post")
                    .body(Body::from(r#"{"name":"a long enough name"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
