//! Blob API handlers, bytebin-compatible.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::super::state::AppState;
use crate::error::GreetcardError;

/// Response from the post endpoint.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub key: String,
}

/// POST /post - Store the request body, answer with its key.
pub async fn post(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty body").into_response();
    }
    if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
        return (StatusCode::BAD_REQUEST, "Body must be JSON").into_response();
    }

    match state.blobs.put_raw(&body).await {
        Ok(key) => {
            info!(%key, bytes = body.len(), "blob stored");
            (
                StatusCode::CREATED,
                [(header::LOCATION, key.clone())],
                Json(PostResponse { key }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "blob store failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /:key - Return a stored blob.
pub async fn get(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    match state.blobs.get_raw(&key).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, "public, max-age=604800, immutable"),
            ],
            bytes,
        )
            .into_response(),
        Err(GreetcardError::NotFound(_)) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            warn!(%key, error = %e, "blob read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
