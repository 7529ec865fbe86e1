//! bytebin-style paste service.
//!
//! - `POST {base}/post` with the JSON document → `{"key": "<id>"}`
//! - `GET {base}/{id}` → the JSON document, or 404
//!
//! The id travels in the response body, which avoids relying on a
//! `Location` header that some browsers hide behind CORS.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{RemoteStore, http_client, parse_loaded, unavailable, validate_id};
use crate::document::GreetingDocument;
use crate::error::GreetcardError;

/// Public bytebin instance.
pub const DEFAULT_BASE_URL: &str = "https://bytebin.lucko.me";

#[derive(Debug, Deserialize)]
struct PostResponse {
    key: Option<String>,
}

pub struct BytebinStore {
    base_url: String,
    client: reqwest::Client,
}

impl BytebinStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GreetcardError> {
        Ok(Self::with_client(base_url, http_client()?))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteStore for BytebinStore {
    fn name(&self) -> &'static str {
        "bytebin"
    }

    async fn save(&self, doc: &GreetingDocument) -> Result<String, GreetcardError> {
        let url = format!("{}/post", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(doc)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "bytebin rejected save");
            return Err(GreetcardError::StoreRejected {
                status: status.as_u16(),
            });
        }

        let body: PostResponse = response.json().await.map_err(|e| {
            GreetcardError::StoreUnavailable(format!("Invalid response from storage service: {}", e))
        })?;
        let key = body.key.filter(|k| validate_id(k).is_ok()).ok_or_else(|| {
            GreetcardError::StoreUnavailable("Invalid response from storage service".to_string())
        })?;
        debug!(%key, "bytebin saved greeting");
        Ok(key)
    }

    async fn load(&self, id: &str) -> Result<GreetingDocument, GreetcardError> {
        validate_id(id)?;
        let url = format!("{}/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(GreetcardError::NotFound(format!("no greeting stored under '{}'", id)));
        }
        if !status.is_success() {
            return Err(GreetcardError::StoreRejected {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(unavailable)?;
        parse_loaded(id, &bytes)
    }
}
