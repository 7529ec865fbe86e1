//! # Greetcard - Shareable Birthday Slideshows
//!
//! Greetcard keeps a personalized birthday slideshow (recipient name, slide
//! copy, gallery photos and an optional AI-written wish) in sync with the
//! link that carries it. It provides:
//!
//! - **Document store**: the session state machine (create, edit, save, read-only)
//! - **State tokens**: the whole greeting packed into a `#data=` link fragment
//! - **Image codec**: uploaded photos resized into compact JPEG data URLs
//! - **Remote stores**: short `?id=` links backed by bytebin, jsonblob or a directory
//! - **Blob server**: a bundled bytebin-compatible store
//!
//! ## Quick Start
//!
//! ```no_run
//! use greetcard::{
//!     DocumentStore, GreetcardConfig,
//!     document::FieldLocator,
//!     location::MemoryHistory,
//!     session::ShareOutcome,
//! };
//!
//! # async fn example() -> Result<(), greetcard::GreetcardError> {
//! let history = MemoryHistory::parse("https://cards.example/")?;
//! let store = DocumentStore::from_config(GreetcardConfig::default(), Box::new(history))?;
//!
//! store.hydrate().await;
//! store.mutate(FieldLocator::Name, "Alex")?;
//!
//! if let ShareOutcome::Link(url) = store.share().await? {
//!     println!("Send this to Alex: {}", url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Greeting data model and field locators |
//! | [`token`] | Document ⇄ URL-safe state token |
//! | [`image_codec`] | Photo resize and JPEG data URLs |
//! | [`store`] | Remote store trait and backends |
//! | [`location`] | Link parsing and browser-history abstraction |
//! | [`session`] | Document store state machine |
//! | [`edit`] | Single open text field with draft |
//! | [`wish`] | AI wish generation with fallbacks |
//! | [`config`] | Persistence strategy and tuning |
//! | [`server`] | Bundled blob server |
//! | [`error`] | Error types |

pub mod config;
pub mod debounce;
pub mod document;
pub mod edit;
pub mod error;
pub mod image_codec;
pub mod location;
pub mod server;
pub mod session;
pub mod store;
pub mod token;
pub mod wish;

// Re-exports for convenience
pub use config::GreetcardConfig;
pub use document::GreetingDocument;
pub use error::GreetcardError;
pub use session::DocumentStore;
