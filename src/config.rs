//! # Configuration
//!
//! Which persistence strategy a session uses and how it is tuned.
//!
//! ```
//! use greetcard::config::{BackendConfig, GreetcardConfig, Persistence};
//!
//! let config = GreetcardConfig {
//!     persistence: Persistence::Remote,
//!     backend: "bytebin".parse().unwrap(),
//!     ..Default::default()
//! };
//! assert!(config.persistence.saves_remote());
//! assert!(matches!(config.backend, BackendConfig::Bytebin { .. }));
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::document::DEFAULT_GALLERY_SLOTS;
use crate::error::GreetcardError;
use crate::image_codec::{ImageCodec, ImageProfile};
use crate::store::{self, BytebinStore, JsonBlobStore, LocalStore, RemoteStore};
use crate::token::{DEFAULT_MAX_TOKEN_LEN, TokenCodec, TokenFormat};

/// Default quiet period before an edit is written to the link.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default cap on a document sent to a remote store.
pub const DEFAULT_MAX_REMOTE_BYTES: usize = 5 * 1024 * 1024;

/// Room reserved in a derived token limit for the name and slide copy.
const TEXT_HEADROOM_BYTES: usize = 64 * 1024;

/// Where a greeting lives between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Whole greeting in the link fragment, rewritten after every edit.
    Fragment,
    /// Greeting saved to a remote store on share; link carries the id.
    Remote,
    /// Fragment autosave while editing, remote save on share.
    #[default]
    Hybrid,
}

impl Persistence {
    /// Edits are mirrored into the `#data=` fragment.
    pub fn autosyncs(&self) -> bool {
        matches!(self, Persistence::Fragment | Persistence::Hybrid)
    }

    /// Share uploads to the remote store.
    pub fn saves_remote(&self) -> bool {
        matches!(self, Persistence::Remote | Persistence::Hybrid)
    }
}

impl std::str::FromStr for Persistence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fragment" | "url" => Ok(Persistence::Fragment),
            "remote" => Ok(Persistence::Remote),
            "hybrid" => Ok(Persistence::Hybrid),
            _ => Err(format!("Unknown persistence '{}' (fragment, remote, hybrid)", s)),
        }
    }
}

/// Remote store selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendConfig {
    #[default]
    None,
    Local { dir: PathBuf },
    Bytebin { base_url: String },
    JsonBlob { base_url: String },
}

impl BackendConfig {
    /// Instantiate the backend.
    pub fn build(&self) -> Result<Option<Arc<dyn RemoteStore>>, GreetcardError> {
        let store: Arc<dyn RemoteStore> = match self {
            BackendConfig::None => return Ok(None),
            BackendConfig::Local { dir } => Arc::new(LocalStore::new(dir.clone())),
            BackendConfig::Bytebin { base_url } => Arc::new(BytebinStore::new(base_url.clone())?),
            BackendConfig::JsonBlob { base_url } => {
                Arc::new(JsonBlobStore::new(base_url.clone())?)
            }
        };
        Ok(Some(store))
    }
}

/// Parses `none`, `local:<dir>`, `bytebin[:<url>]`, `jsonblob[:<url>]`.
impl std::str::FromStr for BackendConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        match (kind.to_lowercase().as_str(), arg) {
            ("none", None) => Ok(BackendConfig::None),
            ("local", Some(dir)) if !dir.is_empty() => Ok(BackendConfig::Local {
                dir: PathBuf::from(dir),
            }),
            ("local", _) => Err("local backend needs a directory: local:<dir>".to_string()),
            ("bytebin", arg) => Ok(BackendConfig::Bytebin {
                base_url: arg
                    .unwrap_or(store::bytebin::DEFAULT_BASE_URL)
                    .to_string(),
            }),
            ("jsonblob", arg) => Ok(BackendConfig::JsonBlob {
                base_url: arg
                    .unwrap_or(store::jsonblob::DEFAULT_BASE_URL)
                    .to_string(),
            }),
            _ => Err(format!(
                "Unknown backend '{}' (none, local:<dir>, bytebin[:<url>], jsonblob[:<url>])",
                s
            )),
        }
    }
}

/// Session-wide settings.
#[derive(Debug, Clone)]
pub struct GreetcardConfig {
    pub persistence: Persistence,
    pub backend: BackendConfig,
    /// Quiet period before an edit reaches the link fragment.
    pub debounce: Duration,
    pub token_format: TokenFormat,
    /// Longest token written to or read from a link; `None` derives it
    /// from the photo profile and slot count.
    pub max_token_len: Option<usize>,
    /// Largest document JSON sent to a remote store.
    pub max_remote_bytes: usize,
    pub gallery_slots: usize,
    /// Photo profile; `None` picks one from `persistence`.
    pub image_profile: Option<ImageProfile>,
    /// Open fragment links as read-only presentations.
    pub token_links_read_only: bool,
}

impl Default for GreetcardConfig {
    fn default() -> Self {
        Self {
            persistence: Persistence::default(),
            backend: BackendConfig::default(),
            debounce: DEFAULT_DEBOUNCE,
            token_format: TokenFormat::default(),
            max_token_len: None,
            max_remote_bytes: DEFAULT_MAX_REMOTE_BYTES,
            gallery_slots: DEFAULT_GALLERY_SLOTS,
            image_profile: None,
            token_links_read_only: false,
        }
    }
}

impl GreetcardConfig {
    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(self.token_format, self.token_limit())
    }

    /// Token length limit in effect.
    ///
    /// Without an explicit `max_token_len`, every slot holding a photo at
    /// the profile's byte budget must still fit. Escaping and base64 grow
    /// a data URL by under 1.5x.
    pub fn token_limit(&self) -> usize {
        self.max_token_len.unwrap_or_else(|| {
            let payload = self.gallery_slots * self.photo_profile().max_bytes() + TEXT_HEADROOM_BYTES;
            (payload + payload / 2).max(DEFAULT_MAX_TOKEN_LEN)
        })
    }

    /// Fragment-only greetings carry photos in the link, so they get the
    /// small profile.
    pub fn photo_profile(&self) -> ImageProfile {
        self.image_profile.unwrap_or(match self.persistence {
            Persistence::Fragment => ImageProfile::Embedded,
            Persistence::Remote | Persistence::Hybrid => ImageProfile::Upload,
        })
    }

    pub fn image_codec(&self) -> ImageCodec {
        ImageCodec::new(self.photo_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backends() {
        assert_eq!("none".parse::<BackendConfig>().unwrap(), BackendConfig::None);
        assert_eq!(
            "local:/tmp/cards".parse::<BackendConfig>().unwrap(),
            BackendConfig::Local {
                dir: PathBuf::from("/tmp/cards")
            }
        );
        assert_eq!(
            "bytebin:http://127.0.0.1:8080".parse::<BackendConfig>().unwrap(),
            BackendConfig::Bytebin {
                base_url: "http://127.0.0.1:8080".to_string()
            }
        );
        assert_eq!(
            "jsonblob".parse::<BackendConfig>().unwrap(),
            BackendConfig::JsonBlob {
                base_url: store::jsonblob::DEFAULT_BASE_URL.to_string()
            }
        );
        assert!("local".parse::<BackendConfig>().is_err());
        assert!("s3".parse::<BackendConfig>().is_err());
    }

    #[test]
    fn test_image_profile_follows_persistence() {
        let fragment = GreetcardConfig {
            persistence: Persistence::Fragment,
            ..Default::default()
        };
        assert_eq!(fragment.image_codec().profile(), ImageProfile::Embedded);
        assert_eq!(
            GreetcardConfig::default().image_codec().profile(),
            ImageProfile::Upload
        );
    }

    #[test]
    fn test_token_limit_fits_full_gallery() {
        let hybrid = GreetcardConfig::default();
        let photos = hybrid.gallery_slots * ImageProfile::Upload.max_bytes();
        assert!(hybrid.token_limit() > photos + photos / 3);

        let fragment = GreetcardConfig {
            persistence: Persistence::Fragment,
            ..Default::default()
        };
        assert_eq!(fragment.token_limit(), DEFAULT_MAX_TOKEN_LEN);

        let explicit = GreetcardConfig {
            max_token_len: Some(4096),
            ..Default::default()
        };
        assert_eq!(explicit.token_limit(), 4096);
        assert_eq!(explicit.token_codec().max_len, 4096);
    }

    #[test]
    fn test_build_none() {
        assert!(BackendConfig::None.build().unwrap().is_none());
    }

    #[test]
    fn test_persistence_flags() {
        assert!(Persistence::Fragment.autosyncs());
        assert!(!Persistence::Fragment.saves_remote());
        assert!(!Persistence::Remote.autosyncs());
        assert!(Persistence::Hybrid.autosyncs() && Persistence::Hybrid.saves_remote());
    }
}
