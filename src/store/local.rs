//! Directory-backed store: one JSON file per greeting.
//!
//! Also the storage engine behind the bundled blob server, which is why the
//! raw byte helpers are public.

use async_trait::async_trait;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{RemoteStore, parse_loaded, validate_id};
use crate::document::GreetingDocument;
use crate::error::GreetcardError;

/// Length of generated keys.
pub const KEY_LEN: usize = 7;

/// Attempts at finding an unused key before giving up.
const KEY_ATTEMPTS: usize = 8;

/// Greetings persisted as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Store raw bytes under a fresh random key.
    ///
    /// Written to a temp file first and renamed, so readers never see a
    /// partial blob.
    pub async fn put_raw(&self, bytes: &[u8]) -> Result<String, GreetcardError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_unavailable)?;

        for _ in 0..KEY_ATTEMPTS {
            let key = random_key();
            let path = self.path_for(&key);
            if tokio::fs::try_exists(&path).await.map_err(io_unavailable)? {
                continue;
            }
            let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));
            tokio::fs::write(&tmp, bytes).await.map_err(io_unavailable)?;
            tokio::fs::rename(&tmp, &path).await.map_err(io_unavailable)?;
            debug!(key = %key, bytes = bytes.len(), dir = %self.dir.display(), "stored blob");
            return Ok(key);
        }
        Err(GreetcardError::StoreUnavailable(
            "could not allocate a free key".to_string(),
        ))
    }

    /// Read the raw bytes stored under `key`.
    pub async fn get_raw(&self, key: &str) -> Result<Vec<u8>, GreetcardError> {
        validate_id(key)?;
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GreetcardError::NotFound(format!("no greeting stored under '{}'", key)))
            }
            Err(e) => Err(io_unavailable(e)),
        }
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn save(&self, doc: &GreetingDocument) -> Result<String, GreetcardError> {
        let bytes = serde_json::to_vec(doc)
            .map_err(|e| GreetcardError::StoreUnavailable(format!("serialize failed: {}", e)))?;
        self.put_raw(&bytes).await
    }

    async fn load(&self, id: &str) -> Result<GreetingDocument, GreetcardError> {
        let bytes = self.get_raw(id).await?;
        parse_loaded(id, &bytes)
    }
}

/// Random alphanumeric key, bytebin style.
pub fn random_key() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

fn io_unavailable(e: std::io::Error) -> GreetcardError {
    GreetcardError::StoreUnavailable(format!("local store: {}", e))
}
