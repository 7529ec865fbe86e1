//! jsonblob-style service.
//!
//! - `POST {base}/api/jsonBlob` → `201 Created`, id in the `X-jsonblob-id`
//!   header or as the last segment of `Location`
//! - `GET {base}/api/jsonBlob/{id}` → the JSON document, or 404

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, LOCATION};
use tracing::{debug, warn};

use super::{RemoteStore, http_client, parse_loaded, unavailable, validate_id};
use crate::document::GreetingDocument;
use crate::error::GreetcardError;

/// Public jsonblob instance.
pub const DEFAULT_BASE_URL: &str = "https://jsonblob.com";

const ID_HEADER: &str = "x-jsonblob-id";

pub struct JsonBlobStore {
    base_url: String,
    client: reqwest::Client,
}

impl JsonBlobStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GreetcardError> {
        Ok(Self::with_client(base_url, http_client()?))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    fn blob_url(&self) -> String {
        format!("{}/api/jsonBlob", self.base_url)
    }
}

/// Pull the blob id out of the save response headers.
fn id_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_id_header = headers
        .get(ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let from_location = || {
        headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .map(str::to_string)
    };
    from_id_header
        .or_else(from_location)
        .filter(|id| validate_id(id).is_ok())
}

#[async_trait]
impl RemoteStore for JsonBlobStore {
    fn name(&self) -> &'static str {
        "jsonblob"
    }

    async fn save(&self, doc: &GreetingDocument) -> Result<String, GreetcardError> {
        let url = self.blob_url();
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(doc)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "jsonblob rejected save");
            return Err(GreetcardError::StoreRejected {
                status: status.as_u16(),
            });
        }

        let id = id_from_headers(response.headers()).ok_or_else(|| {
            GreetcardError::StoreUnavailable(
                "Storage service response carried no blob id".to_string(),
            )
        })?;
        debug!(%id, "jsonblob saved greeting");
        Ok(id)
    }

    async fn load(&self, id: &str) -> Result<GreetingDocument, GreetcardError> {
        validate_id(id)?;
        let url = format!("{}/{}", self.blob_url(), id);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
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
