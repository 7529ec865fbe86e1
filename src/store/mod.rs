//! # Remote Stores
//!
//! Backends that persist a greeting and hand back a short reference id for
//! `?id=<id>` links.
//!
//! ## Available Backends
//!
//! - [`local`]: JSON files in a directory on this machine
//! - [`bytebin`]: bytebin-style paste service (id in the JSON response body).
//!   The bundled `greetcard serve` speaks this protocol.
//! - [`jsonblob`]: jsonblob-style service (id in a response header)
//!
//! Every backend maps its own response quirks onto the same contract:
//!
//! | Situation | Error |
//! |-----------|-------|
//! | connection refused, timeout, unreadable body | `StoreUnavailable` |
//! | non-success status on save | `StoreRejected` |
//! | unknown or malformed id on load | `NotFound` |
//!
//! Nothing here retries; the caller decides.

pub mod bytebin;
pub mod jsonblob;
pub mod local;

pub use bytebin::BytebinStore;
pub use jsonblob::JsonBlobStore;
pub use local::LocalStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::document::GreetingDocument;
use crate::error::GreetcardError;

/// Longest reference id any backend hands out.
pub const MAX_ID_LEN: usize = 128;

/// Request timeout for HTTP backends.
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Save/load capability shared by every backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist a document and return its reference id.
    async fn save(&self, doc: &GreetingDocument) -> Result<String, GreetcardError>;

    /// Fetch the document stored under `id`.
    async fn load(&self, id: &str) -> Result<GreetingDocument, GreetcardError>;
}

/// Reject ids that could not have come from a backend before any I/O.
///
/// Ids are `[A-Za-z0-9_-]{1,128}`, which also keeps them safe as file names
/// and URL path segments.
pub fn validate_id(id: &str) -> Result<(), GreetcardError> {
    let ok = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(GreetcardError::NotFound(format!("malformed id '{}'", id)))
    }
}

/// Shared HTTP client setup for the web backends.
pub(crate) fn http_client() -> Result<reqwest::Client, GreetcardError> {
    reqwest::Client::builder()
        .user_agent(concat!("greetcard/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| GreetcardError::StoreUnavailable(format!("HTTP client error: {}", e)))
}

pub(crate) fn unavailable(e: reqwest::Error) -> GreetcardError {
    GreetcardError::StoreUnavailable(e.to_string())
}

/// Map a load response body onto a document. Anything unparsable counts as
/// "no greeting here" rather than a transport failure.
pub(crate) fn parse_loaded(id: &str, body: &[u8]) -> Result<GreetingDocument, GreetcardError> {
    serde_json::from_slice(body)
        .map_err(|e| GreetcardError::NotFound(format!("no greeting stored under '{}': {}", id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("abc123").is_ok());
        assert!(validate_id("a-b_C").is_ok());
        assert!(matches!(validate_id(""), Err(GreetcardError::NotFound(_))));
        assert!(validate_id("../etc/passwd").is_err());
        assert!(validate_id("abc?x=1").is_err());
        assert!(validate_id(&"a".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_parse_loaded_garbage_is_not_found() {
        let err = parse_loaded("abc", b"<html>").unwrap_err();
        assert!(matches!(err, GreetcardError::NotFound(_)));
    }
}
