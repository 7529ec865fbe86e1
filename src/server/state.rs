//! Server state and configuration.

use std::path::PathBuf;

use crate::store::LocalStore;

/// Largest blob accepted by `POST /post`.
pub const DEFAULT_MAX_BLOB_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory blobs are written to
    pub data_dir: PathBuf,
    /// Request body limit for uploads
    pub max_blob_bytes: usize,
}

impl ServerConfig {
    pub fn new(listen_addr: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            data_dir: data_dir.into(),
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub blobs: LocalStore,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let blobs = LocalStore::new(config.data_dir.clone());
        Self { config, blobs }
    }
}
