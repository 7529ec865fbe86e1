//! # Error Types
//!
//! This module defines error types used throughout the greetcard library.
//!
//! Every variant is recoverable: the [`DocumentStore`](crate::session::DocumentStore)
//! turns them into transient [`Notice`](crate::session::Notice)s instead of
//! letting them reach the presentation layer.

use thiserror::Error;

/// Notice for a link whose greeting could not be restored.
pub const BROKEN_LINK: &str = "This link looks broken, so we started a fresh greeting.";

/// Main error type for greetcard operations
#[derive(Debug, Error)]
pub enum GreetcardError {
    /// State token is truncated, has non-alphabet characters, or does not
    /// decode to a valid document
    #[error("Invalid state token: {0}")]
    Decode(String),

    /// Encoded state exceeds what the transport accepts
    #[error("Greeting is too large to share ({len} bytes, limit {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Input bytes are not a decodable image
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Remote id has no data behind it (unknown or malformed id)
    #[error("Greeting not found: {0}")]
    NotFound(String),

    /// Network or transport failure talking to the remote store
    #[error("Storage service unavailable: {0}")]
    StoreUnavailable(String),

    /// Remote store answered with a non-success response
    #[error("Storage service error: {status}")]
    StoreRejected { status: u16 },

    /// Operation attempted before hydration finished
    #[error("Greeting is still loading")]
    Loading,

    /// Mutation attempted while the session is read-only
    #[error("Greeting is read-only")]
    ReadOnly,

    /// Edit target or value outside what the document accepts
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Address that cannot be parsed as a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// AI wish generation failed
    #[error("Wish generation failed: {0}")]
    Generation(String),

    /// Server bind/serve failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GreetcardError {
    /// Message shown to the user in a transient notice.
    pub fn user_message(&self) -> String {
        match self {
            GreetcardError::Decode(_) => BROKEN_LINK.to_string(),
            GreetcardError::PayloadTooLarge { .. } => {
                "Your greeting is too large to share. Try smaller or fewer photos.".to_string()
            }
            GreetcardError::UnsupportedImage(_) => {
                "That file could not be read as an image.".to_string()
            }
            GreetcardError::NotFound(_) => {
                "We couldn't find that greeting, so we started a fresh one.".to_string()
            }
            GreetcardError::StoreUnavailable(_) | GreetcardError::StoreRejected { .. } => {
                "Could not reach the storage service. Please try again.".to_string()
            }
            GreetcardError::ReadOnly => "This greeting can't be edited.".to_string(),
            other => other.to_string(),
        }
    }
}
