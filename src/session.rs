//! # Document Store
//!
//! Owns the one mutable [`GreetingDocument`] of a session and keeps it in step
//! with the link that represents it.
//!
//! ## States
//!
//! ```text
//!             hydrate()
//! Hydrating ─────────────┬──> Ready(Create)          no token / id, or load failed
//!                        ├──> Ready(Edit{unsaved:false})   #data= token decoded
//!                        └──> Ready(ReadOnly)        ?id= reference loaded
//!
//! Ready(Create | Edit) ──mutate──> Ready(Edit{unsaved:true})
//! Ready(Create | Edit) ──share───> Saving(mode) ──ok──> Ready(Edit{unsaved:false})
//!                                               └─err─> Ready(mode)
//! ```
//!
//! All transitions happen under one lock that is never held across an
//! `.await`, so each operation is atomic with respect to the others. The
//! slow parts (remote load, photo resizing, remote save, wish generation)
//! run with the lock released and re-check the state when they finish.
//!
//! Failures never escape as faults: every error is also queued as a
//! [`Notice`] for the shell to show as a toast.

use parking_lot::Mutex;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::GreetcardConfig;
use crate::debounce::Debouncer;
use crate::document::{AiWish, FieldLocator, GreetingDocument, ImagePatch, WishStyle};
use crate::error::{BROKEN_LINK, GreetcardError};
use crate::image_codec::ImageCodec;
use crate::location::{self, Navigator};
use crate::store::RemoteStore;
use crate::token::TokenCodec;
use crate::wish::{WishGenerator, generate_or_fallback};

/// Toast shown after a successful share.
pub const LINK_COPIED: &str = "Link copied! Send it to your friend.";

/// Toast shown once when the greeting outgrows the link but can still be
/// shared through the remote store.
pub const AUTOSAVE_PAUSED: &str =
    "Link autosave is paused: the greeting is too big for a link. Use Share to save it.";

// ============================================================================
// STATE TYPES
// ============================================================================

/// Editing mode of a ready session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fresh greeting from defaults.
    Create,
    /// Greeting restored from a link or already edited.
    Edit { unsaved: bool },
    /// Recipient view; every mutation is rejected.
    ReadOnly,
}

impl Mode {
    pub fn is_editable(&self) -> bool {
        !matches!(self, Mode::ReadOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Hydrating,
    Ready(Mode),
    /// Remote save in flight; carries the mode to return to.
    Saving(Mode),
}

impl SessionState {
    pub fn mode(&self) -> Option<Mode> {
        match self {
            SessionState::Hydrating => None,
            SessionState::Ready(mode) | SessionState::Saving(mode) => Some(*mode),
        }
    }
}

/// Coarse loading indicator for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Hydration failed and the session fell back to defaults.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Where hydration takes the greeting from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationSource {
    Reference(String),
    Token(String),
    Fresh,
}

/// Pick the hydration source for `url`.
///
/// A reference id wins over an embedded token when there is a remote store
/// to resolve it against. Without one the token is used, and a bare id is
/// still returned so hydration can report it as unresolvable.
pub fn hydration_source(url: &Url, remote_available: bool) -> HydrationSource {
    let token = location::token_in(url);
    if let Some(id) = location::reference_in(url)
        && (remote_available || token.is_none())
    {
        return HydrationSource::Reference(id);
    }
    match token {
        Some(token) => HydrationSource::Token(token.to_string()),
        None => HydrationSource::Fresh,
    }
}

/// Read model handed to the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: GreetingDocument,
    pub state: SessionState,
    pub load_state: LoadState,
    pub url: Url,
}

impl Snapshot {
    pub fn is_read_only(&self) -> bool {
        self.state.mode() == Some(Mode::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Link to hand to the recipient.
    Link(Url),
    /// A save is already running; this request was dropped.
    AlreadySaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageUpdate {
    Applied,
    /// A newer upload for the same slot started while this one was resizing.
    Superseded,
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct Inner {
    doc: GreetingDocument,
    state: SessionState,
    load_state: LoadState,
    hydration_started: bool,
    closed: bool,
    /// Fragment autosync stopped on an oversized token; cleared by the
    /// next successful write.
    autosync_paused: bool,
    /// Bumped on every applied mutation.
    revision: u64,
    /// Latest upload ticket per gallery slot.
    slot_uploads: Vec<u64>,
    navigator: Box<dyn Navigator>,
    notices: Vec<Notice>,
}

impl Inner {
    fn lock_state(&self) -> Result<(), GreetcardError> {
        match self.state {
            SessionState::Hydrating => Err(GreetcardError::Loading),
            SessionState::Ready(Mode::ReadOnly) | SessionState::Saving(Mode::ReadOnly) => {
                Err(GreetcardError::ReadOnly)
            }
            _ => Ok(()),
        }
    }

    fn editable(&self, op: &str) -> Result<(), GreetcardError> {
        let result = self.lock_state();
        if let Err(e) = &result {
            debug!(op, error = %e, "mutation rejected");
        }
        result
    }

    fn mark_dirty(&mut self) {
        self.revision += 1;
        let dirty = Mode::Edit { unsaved: true };
        self.state = match self.state {
            SessionState::Saving(_) => SessionState::Saving(dirty),
            _ => SessionState::Ready(dirty),
        };
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn fail(&mut self, err: &GreetcardError) {
        let level = match err {
            GreetcardError::Decode(_) | GreetcardError::NotFound(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.notify(level, err.user_message());
    }

    /// Hydration fell back to the stock greeting because of `err`.
    fn fall_back(&mut self, slots: usize, err: &GreetcardError) {
        self.enter(GreetingDocument::with_slots(slots), Mode::Create, LoadState::Error);
        let message = match err {
            GreetcardError::Decode(_) | GreetcardError::PayloadTooLarge { .. } => BROKEN_LINK.to_string(),
            other => other.user_message(),
        };
        self.notify(NoticeLevel::Warning, message);
    }

    fn enter(&mut self, doc: GreetingDocument, mode: Mode, load_state: LoadState) {
        self.doc = doc;
        self.state = SessionState::Ready(mode);
        self.load_state = load_state;
        info!(?mode, ?load_state, "session ready");
    }
}

struct Shared {
    config: GreetcardConfig,
    tokens: TokenCodec,
    images: ImageCodec,
    remote: Option<Arc<dyn RemoteStore>>,
    inner: Mutex<Inner>,
    autosync: Mutex<Debouncer>,
}

impl Shared {
    /// Debounced write of the latest document into the link fragment.
    fn autosync_now(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        if let Err(e) = inner.lock_state() {
            debug!(error = %e, "autosync skipped, session not editable");
            return;
        }
        match self.write_fragment(&mut inner) {
            Ok(_) => inner.autosync_paused = false,
            Err(e @ GreetcardError::PayloadTooLarge { .. }) if self.shares_remotely() => {
                if !inner.autosync_paused {
                    warn!(error = %e, "greeting outgrew the link, autosave paused");
                    inner.autosync_paused = true;
                    inner.notify(NoticeLevel::Warning, AUTOSAVE_PAUSED);
                }
            }
            Err(e) => {
                warn!(error = %e, "autosync failed");
                inner.fail(&e);
            }
        }
    }

    /// Share goes through the remote store rather than the link.
    fn shares_remotely(&self) -> bool {
        self.config.persistence.saves_remote() && self.remote.is_some()
    }

    /// Encode the document and replace the current history entry with it.
    fn write_fragment(&self, inner: &mut Inner) -> Result<Url, GreetcardError> {
        let token = self.tokens.encode(&inner.doc)?;
        let current = inner.navigator.current();
        let next = location::with_token(&location::without_reference(&current), &token);
        inner.navigator.replace(next.clone());
        debug!(len = token.len(), revision = inner.revision, "greeting written to link");
        Ok(next)
    }

    fn slots(&self) -> usize {
        self.config.gallery_slots
    }
}

enum SharePlan {
    Fragment(Result<Url, GreetcardError>),
    Remote {
        remote: Arc<dyn RemoteStore>,
        doc: GreetingDocument,
        revision: u64,
    },
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

/// Handle to a greeting session. Clones share the same session.
#[derive(Clone)]
pub struct DocumentStore {
    shared: Arc<Shared>,
}

impl DocumentStore {
    /// New session in `Hydrating` state holding the stock greeting.
    pub fn create(
        config: GreetcardConfig,
        remote: Option<Arc<dyn RemoteStore>>,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        let slots = config.gallery_slots;
        let inner = Inner {
            doc: GreetingDocument::with_slots(slots),
            state: SessionState::Hydrating,
            load_state: LoadState::Loading,
            hydration_started: false,
            closed: false,
            autosync_paused: false,
            revision: 0,
            slot_uploads: vec![0; slots],
            navigator,
            notices: Vec::new(),
        };
        Self {
            shared: Arc::new(Shared {
                tokens: config.token_codec(),
                images: config.image_codec(),
                autosync: Mutex::new(Debouncer::new(config.debounce)),
                config,
                remote,
                inner: Mutex::new(inner),
            }),
        }
    }

    /// Like [`create`](Self::create), with the backend built from `config`.
    pub fn from_config(
        config: GreetcardConfig,
        navigator: Box<dyn Navigator>,
    ) -> Result<Self, GreetcardError> {
        let remote = config.backend.build()?;
        Ok(Self::create(config, remote, navigator))
    }

    pub fn config(&self) -> &GreetcardConfig {
        &self.shared.config
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Restore the greeting named by the current link.
    ///
    /// Runs at most once per session; later calls return the current state.
    /// Never fails: a bad token or unreachable reference falls back to the
    /// stock greeting in `Create` mode with a warning notice.
    pub async fn hydrate(&self) -> SessionState {
        let source = {
            let mut inner = self.shared.inner.lock();
            if inner.hydration_started || inner.closed {
                return inner.state;
            }
            inner.hydration_started = true;
            hydration_source(&inner.navigator.current(), self.shared.remote.is_some())
        };
        let slots = self.shared.slots();

        match source {
            HydrationSource::Fresh => {
                let mut inner = self.shared.inner.lock();
                inner.enter(GreetingDocument::with_slots(slots), Mode::Create, LoadState::Ready);
                inner.state
            }
            HydrationSource::Token(token) => {
                let decoded = self.shared.tokens.decode(&token);
                let mut inner = self.shared.inner.lock();
                match decoded {
                    Ok(mut doc) => {
                        doc.fit_slots(slots);
                        let mode = if self.shared.config.token_links_read_only {
                            Mode::ReadOnly
                        } else {
                            Mode::Edit { unsaved: false }
                        };
                        inner.enter(doc, mode, LoadState::Ready);
                    }
                    Err(e) => {
                        warn!(error = %e, "link token unreadable, starting fresh");
                        inner.fall_back(slots, &e);
                    }
                }
                inner.state
            }
            HydrationSource::Reference(id) => {
                info!(%id, "loading shared greeting");
                let loaded = match &self.shared.remote {
                    Some(remote) => remote.load(&id).await,
                    None => Err(GreetcardError::NotFound(format!(
                        "no remote store configured to resolve '{}'",
                        id
                    ))),
                };
                let mut inner = self.shared.inner.lock();
                if inner.closed {
                    return inner.state;
                }
                match loaded {
                    Ok(mut doc) => {
                        doc.fit_slots(slots);
                        inner.enter(doc, Mode::ReadOnly, LoadState::Ready);
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "shared greeting unavailable, starting fresh");
                        inner.fall_back(slots, &e);
                    }
                }
                inner.state
            }
        }
    }

    /// Close the session: pending autosync is dropped, not flushed, and
    /// in-flight work is discarded when it completes.
    pub fn teardown(&self) {
        self.shared.inner.lock().closed = true;
        let cancelled = self.shared.autosync.lock().cancel();
        info!(pending_autosync = cancelled, "session closed");
    }

    // ------------------------------------------------------------------------
    // Read model
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.shared.inner.lock();
        Snapshot {
            document: inner.doc.clone(),
            state: inner.state,
            load_state: inner.load_state,
            url: inner.navigator.current(),
        }
    }

    pub fn document(&self) -> GreetingDocument {
        self.shared.inner.lock().doc.clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    pub fn mode(&self) -> Option<Mode> {
        self.state().mode()
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.inner.lock().load_state
    }

    pub fn current_url(&self) -> Url {
        self.shared.inner.lock().navigator.current()
    }

    /// Current value of a text field.
    pub fn text(&self, field: FieldLocator) -> Option<String> {
        self.shared.inner.lock().doc.text(field).map(str::to_string)
    }

    /// Take all queued notices, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.shared.inner.lock().notices)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Overwrite one text field.
    pub fn mutate(&self, field: FieldLocator, value: impl Into<String>) -> Result<(), GreetcardError> {
        {
            let mut inner = self.shared.inner.lock();
            inner.editable("mutate")?;
            inner.doc.set_text(field, value.into())?;
            inner.mark_dirty();
            debug!(%field, revision = inner.revision, "field updated");
        }
        self.schedule_autosync();
        Ok(())
    }

    /// Adjust one gallery slot (source and/or zoom and pan).
    pub fn update_image(&self, slot: usize, patch: ImagePatch) -> Result<(), GreetcardError> {
        {
            let mut inner = self.shared.inner.lock();
            inner.editable("update_image")?;
            inner.doc.patch_image(slot, patch)?;
            inner.mark_dirty();
            debug!(slot, revision = inner.revision, "image updated");
        }
        self.schedule_autosync();
        Ok(())
    }

    /// Resize an uploaded photo and put it in `slot` with zoom and pan reset.
    ///
    /// A second upload to the same slot supersedes this one: whichever was
    /// started last wins, regardless of which finishes resizing first.
    pub async fn replace_image(&self, slot: usize, raw: Vec<u8>) -> Result<ImageUpdate, GreetcardError> {
        let ticket = {
            let mut inner = self.shared.inner.lock();
            inner.editable("replace_image")?;
            let slots = inner.slot_uploads.len();
            let latest = inner.slot_uploads.get_mut(slot).ok_or_else(|| {
                GreetcardError::InvalidField(format!("gallery slot {} out of range ({} slots)", slot, slots))
            })?;
            *latest += 1;
            *latest
        };

        let resized = self.shared.images.resize(raw).await;

        {
            let mut inner = self.shared.inner.lock();
            if inner.closed || inner.slot_uploads.get(slot) != Some(&ticket) {
                debug!(slot, ticket, "image upload superseded");
                return Ok(ImageUpdate::Superseded);
            }
            let data = match resized {
                Ok(data) => data,
                Err(e) => {
                    warn!(slot, error = %e, "image upload failed");
                    inner.fail(&e);
                    return Err(e);
                }
            };
            inner.editable("replace_image")?;
            inner.doc.patch_image(slot, ImagePatch::source(data))?;
            inner.mark_dirty();
            debug!(slot, revision = inner.revision, "image replaced");
        }
        self.schedule_autosync();
        Ok(ImageUpdate::Applied)
    }

    /// Ask `generator` for a wish and keep it in the greeting.
    ///
    /// Generation failures are absorbed by the fallback wish; only the
    /// read-only lock (checked before the call) can make this fail.
    pub async fn generate_ai_wish(
        &self,
        generator: &dyn WishGenerator,
        style: WishStyle,
    ) -> Result<String, GreetcardError> {
        let name = {
            let inner = self.shared.inner.lock();
            inner.editable("generate_ai_wish")?;
            inner.doc.recipient_name.clone()
        };

        let text = generate_or_fallback(generator, &name, style).await;

        {
            let mut inner = self.shared.inner.lock();
            if inner.closed {
                return Ok(text);
            }
            inner.editable("generate_ai_wish")?;
            inner.doc.text_data.ai = Some(AiWish {
                text: text.clone(),
                style,
            });
            inner.mark_dirty();
        }
        self.schedule_autosync();
        Ok(text)
    }

    // ------------------------------------------------------------------------
    // Share
    // ------------------------------------------------------------------------

    /// Produce a link for the recipient.
    ///
    /// - read-only: the current link as-is
    /// - remote persistence: save, then push `?id=<id>`
    /// - fragment persistence: write `#data=<token>` now instead of waiting
    ///   for the debounce
    ///
    /// A share while a save is in flight is dropped. A failed save leaves
    /// the document untouched and the session editable.
    pub async fn share(&self) -> Result<ShareOutcome, GreetcardError> {
        let plan = {
            let mut inner = self.shared.inner.lock();
            let mode = match inner.state {
                SessionState::Hydrating => return Err(GreetcardError::Loading),
                SessionState::Saving(_) => {
                    debug!("share ignored, save already in flight");
                    return Ok(ShareOutcome::AlreadySaving);
                }
                SessionState::Ready(mode) => mode,
            };

            if mode == Mode::ReadOnly {
                let url = inner.navigator.current();
                inner.notify(NoticeLevel::Info, LINK_COPIED);
                return Ok(ShareOutcome::Link(url));
            }

            match self.remote_for_share() {
                None => {
                    let result = self.shared.write_fragment(&mut inner);
                    match &result {
                        Ok(_) => {
                            if let SessionState::Ready(Mode::Edit { .. }) = inner.state {
                                inner.state = SessionState::Ready(Mode::Edit { unsaved: false });
                            }
                            inner.notify(NoticeLevel::Info, LINK_COPIED);
                        }
                        Err(e) => inner.fail(e),
                    }
                    SharePlan::Fragment(result)
                }
                Some(remote) => {
                    let len = inner.doc.json_len();
                    let max = self.shared.config.max_remote_bytes;
                    if len > max {
                        let e = GreetcardError::PayloadTooLarge { len, max };
                        warn!(len, max, "greeting too large to upload");
                        inner.fail(&e);
                        return Err(e);
                    }
                    inner.state = SessionState::Saving(mode);
                    info!(backend = remote.name(), bytes = len, "saving greeting");
                    SharePlan::Remote {
                        remote,
                        doc: inner.doc.clone(),
                        revision: inner.revision,
                    }
                }
            }
        };

        match plan {
            SharePlan::Fragment(result) => {
                self.shared.autosync.lock().cancel();
                result.map(ShareOutcome::Link)
            }
            SharePlan::Remote {
                remote,
                doc,
                revision,
            } => self.finish_save(remote, doc, revision).await,
        }
    }

    fn remote_for_share(&self) -> Option<Arc<dyn RemoteStore>> {
        if self.shared.config.persistence.saves_remote() {
            self.shared.remote.clone()
        } else {
            None
        }
    }

    async fn finish_save(
        &self,
        remote: Arc<dyn RemoteStore>,
        doc: GreetingDocument,
        revision: u64,
    ) -> Result<ShareOutcome, GreetcardError> {
        let saved = remote.save(&doc).await;

        let mut inner = self.shared.inner.lock();
        let resume = match inner.state {
            SessionState::Saving(mode) => mode,
            other => other.mode().unwrap_or(Mode::Create),
        };

        match saved {
            Ok(id) => {
                let url = location::with_reference(&inner.navigator.current(), &id);
                if inner.closed {
                    return Ok(ShareOutcome::Link(url));
                }
                inner.navigator.push(url.clone());
                // Edits made while saving are not in the saved copy.
                let untouched = inner.revision == revision;
                inner.state = SessionState::Ready(if untouched {
                    Mode::Edit { unsaved: false }
                } else {
                    resume
                });
                inner.notify(NoticeLevel::Info, LINK_COPIED);
                info!(%id, backend = remote.name(), "greeting saved");
                drop(inner);

                if untouched {
                    self.shared.autosync.lock().cancel();
                }
                Ok(ShareOutcome::Link(url))
            }
            Err(e) => {
                inner.state = SessionState::Ready(resume);
                warn!(backend = remote.name(), error = %e, "save failed");
                inner.fail(&e);
                Err(e)
            }
        }
    }

    fn schedule_autosync(&self) {
        if !self.shared.config.persistence.autosyncs() {
            return;
        }
        let shared = Arc::downgrade(&self.shared);
        self.shared.autosync.lock().schedule(move || {
            if let Some(shared) = shared.upgrade() {
                shared.autosync_now();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Persistence;
    use crate::document::{GalleryField, IntroField};
    use crate::location::MemoryHistory;
    use crate::token::TokenCodec;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[derive(Default)]
    struct MapStore {
        blobs: Mutex<HashMap<String, GreetingDocument>>,
    }

    #[async_trait]
    impl RemoteStore for MapStore {
        fn name(&self) -> &'static str {
            "map"
        }

        async fn save(&self, doc: &GreetingDocument) -> Result<String, GreetcardError> {
            let mut blobs = self.blobs.lock();
            let id = format!("k{}", blobs.len() + 1);
            blobs.insert(id.clone(), doc.clone());
            Ok(id)
        }

        async fn load(&self, id: &str) -> Result<GreetingDocument, GreetcardError> {
            self.blobs
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| GreetcardError::NotFound(id.to_string()))
        }
    }

    fn store_at(url: &str, persistence: Persistence, remote: Option<Arc<dyn RemoteStore>>) -> (DocumentStore, MemoryHistory) {
        let history = MemoryHistory::parse(url).unwrap();
        let config = GreetcardConfig {
            persistence,
            ..Default::default()
        };
        let store = DocumentStore::create(config, remote, Box::new(history.clone()));
        (store, history)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_hydration_source_precedence() {
        let url = Url::parse("https://x.dev/?id=abc#data=QUJD").unwrap();
        assert_eq!(hydration_source(&url, true), HydrationSource::Reference("abc".to_string()));
        assert_eq!(hydration_source(&url, false), HydrationSource::Token("QUJD".to_string()));
        let bare = Url::parse("https://x.dev/").unwrap();
        assert_eq!(hydration_source(&bare, true), HydrationSource::Fresh);
        let id_only = Url::parse("https://x.dev/?id=abc").unwrap();
        assert_eq!(hydration_source(&id_only, false), HydrationSource::Reference("abc".to_string()));
    }

    #[tokio::test]
    async fn test_reference_without_backend_warns() {
        let (store, _) = store_at("https://x.dev/?id=abc123", Persistence::Fragment, None);
        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::Create));
        assert_eq!(store.load_state(), LoadState::Error);
        let notices = store.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_oversized_token_reads_as_broken_link() {
        let history = MemoryHistory::parse(&format!("https://x.dev/#data={}", "QUJD".repeat(10))).unwrap();
        let config = GreetcardConfig {
            persistence: Persistence::Fragment,
            max_token_len: Some(16),
            ..Default::default()
        };
        let store = DocumentStore::create(config, None, Box::new(history));

        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::Create));
        assert_eq!(
            store.drain_notices(),
            vec![Notice {
                level: NoticeLevel::Warning,
                message: BROKEN_LINK.to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_gallery_of_uploads_still_autosyncs() {
        let remote: Arc<dyn RemoteStore> = Arc::new(MapStore::default());
        let (store, history) = store_at("https://x.dev/", Persistence::Hybrid, Some(remote));
        store.hydrate().await;

        let photo = format!("{}{}", crate::image_codec::JPEG_DATA_URL_PREFIX, "A".repeat(700 * 1024));
        assert!(photo.len() <= crate::image_codec::ImageProfile::Upload.max_bytes());
        for slot in 0..3 {
            store.update_image(slot, ImagePatch::source(photo.clone())).unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        assert_eq!(history.replace_count(), 1);
        assert!(store.drain_notices().is_empty());
        let token = location::token_in(&store.current_url()).map(str::to_string).unwrap();
        assert_eq!(store.config().token_codec().decode(&token).unwrap(), store.document());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_link_pauses_autosave_once() {
        let remote: Arc<dyn RemoteStore> = Arc::new(MapStore::default());
        let history = MemoryHistory::parse("https://x.dev/").unwrap();
        let config = GreetcardConfig {
            max_token_len: Some(4096),
            ..Default::default()
        };
        let store = DocumentStore::create(config, Some(remote), Box::new(history.clone()));
        store.hydrate().await;

        store.mutate(FieldLocator::Name, "x".repeat(5000)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        store.mutate(FieldLocator::Name, "y".repeat(5000)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        assert_eq!(history.replace_count(), 0);
        assert_eq!(
            store.drain_notices(),
            vec![Notice {
                level: NoticeLevel::Warning,
                message: AUTOSAVE_PAUSED.to_string(),
            }]
        );

        let ShareOutcome::Link(url) = store.share().await.unwrap() else {
            panic!("expected link");
        };
        assert!(location::reference_in(&url).is_some());
        assert_eq!(store.mode(), Some(Mode::Edit { unsaved: false }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_link_without_remote_is_an_error() {
        let history = MemoryHistory::parse("https://x.dev/").unwrap();
        let config = GreetcardConfig {
            persistence: Persistence::Fragment,
            max_token_len: Some(4096),
            ..Default::default()
        };
        let store = DocumentStore::create(config, None, Box::new(history.clone()));
        store.hydrate().await;

        store.mutate(FieldLocator::Name, "x".repeat(5000)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        let notices = store.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(history.replace_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_session_is_create() {
        let (store, _) = store_at("https://x.dev/", Persistence::Fragment, None);
        assert_eq!(store.state(), SessionState::Hydrating);
        assert_eq!(store.load_state(), LoadState::Loading);
        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::Create));
        assert_eq!(store.document(), GreetingDocument::default());
        assert_eq!(store.load_state(), LoadState::Ready);
    }

    #[tokio::test]
    async fn test_token_hydrates_into_edit() {
        let mut doc = GreetingDocument::default();
        doc.recipient_name = "Kim".to_string();
        let token = TokenCodec::default().encode(&doc).unwrap();
        let (store, _) = store_at(&format!("https://x.dev/#data={}", token), Persistence::Fragment, None);

        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::Edit { unsaved: false }));
        assert_eq!(store.document(), doc);
    }

    #[tokio::test]
    async fn test_token_links_read_only_variant() {
        let token = TokenCodec::default().encode(&GreetingDocument::default()).unwrap();
        let history = MemoryHistory::parse(&format!("https://x.dev/#data={}", token)).unwrap();
        let config = GreetcardConfig {
            persistence: Persistence::Fragment,
            token_links_read_only: true,
            ..Default::default()
        };
        let store = DocumentStore::create(config, None, Box::new(history));
        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::ReadOnly));
    }

    #[tokio::test]
    async fn test_hydrate_runs_once() {
        let (store, _) = store_at("https://x.dev/", Persistence::Fragment, None);
        store.hydrate().await;
        store.mutate(FieldLocator::Name, "Ann").unwrap();
        store.hydrate().await;
        assert_eq!(store.document().recipient_name, "Ann");
    }

    #[tokio::test]
    async fn test_mutation_while_hydrating_rejected() {
        let (store, _) = store_at("https://x.dev/", Persistence::Fragment, None);
        let err = store.mutate(FieldLocator::Name, "Ann").unwrap_err();
        assert!(matches!(err, GreetcardError::Loading));
    }

    #[tokio::test]
    async fn test_mutation_marks_dirty() {
        let (store, _) = store_at("https://x.dev/", Persistence::Remote, None);
        store.hydrate().await;
        store
            .mutate(FieldLocator::Intro(IntroField::Title), "Feliz cumpleaños")
            .unwrap();
        assert_eq!(store.mode(), Some(Mode::Edit { unsaved: true }));
        assert_eq!(store.document().text_data.intro.title, "Feliz cumpleaños");
    }

    #[tokio::test]
    async fn test_bad_wish_index_leaves_state_alone() {
        let (store, _) = store_at("https://x.dev/", Persistence::Remote, None);
        store.hydrate().await;
        let err = store.mutate(FieldLocator::WishItem(9), "x").unwrap_err();
        assert!(matches!(err, GreetcardError::InvalidField(_)));
        assert_eq!(store.mode(), Some(Mode::Create));
    }

    #[tokio::test]
    async fn test_reference_load_enters_read_only() {
        let remote = Arc::new(MapStore::default());
        let mut doc = GreetingDocument::default();
        doc.recipient_name = "Lee".to_string();
        let id = remote.save(&doc).await.unwrap();

        let (store, _) = store_at(&format!("https://x.dev/?id={}", id), Persistence::Remote, Some(remote));
        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::ReadOnly));
        assert_eq!(store.document().recipient_name, "Lee");

        let err = store.update_image(0, ImagePatch::geometry(2.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, GreetcardError::ReadOnly));
    }

    #[tokio::test]
    async fn test_unknown_reference_falls_back() {
        let remote: Arc<dyn RemoteStore> = Arc::new(MapStore::default());
        let (store, _) = store_at("https://x.dev/?id=missing", Persistence::Remote, Some(remote));
        assert_eq!(store.hydrate().await, SessionState::Ready(Mode::Create));
        assert_eq!(store.load_state(), LoadState::Error);
        let notices = store.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(store.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_share_in_fragment_mode_flushes() {
        let (store, history) = store_at("https://x.dev/card", Persistence::Fragment, None);
        store.hydrate().await;
        store
            .mutate(FieldLocator::Gallery(GalleryField::Title), "Best of 2026")
            .unwrap();

        let ShareOutcome::Link(url) = store.share().await.unwrap() else {
            panic!("expected link");
        };
        let token = location::token_in(&url).unwrap();
        assert_eq!(TokenCodec::default().decode(token).unwrap(), store.document());
        assert_eq!(history.replace_count(), 1);
        assert_eq!(store.mode(), Some(Mode::Edit { unsaved: false }));
        assert_eq!(store.drain_notices()[0].message, LINK_COPIED);
    }

    #[tokio::test]
    async fn test_share_too_large_for_remote() {
        let history = MemoryHistory::parse("https://x.dev/").unwrap();
        let config = GreetcardConfig {
            persistence: Persistence::Remote,
            max_remote_bytes: 64,
            ..Default::default()
        };
        let remote: Arc<dyn RemoteStore> = Arc::new(MapStore::default());
        let store = DocumentStore::create(config, Some(remote), Box::new(history.clone()));
        store.hydrate().await;

        let err = store.share().await.unwrap_err();
        assert!(matches!(err, GreetcardError::PayloadTooLarge { max: 64, .. }));
        assert_eq!(store.mode(), Some(Mode::Create));
        assert_eq!(history.push_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_image_last_upload_wins() {
        let (store, _) = store_at("https://x.dev/", Persistence::Remote, None);
        store.hydrate().await;

        let (first, second) = tokio::join!(
            store.replace_image(1, png(40, 30)),
            store.replace_image(1, png(20, 10))
        );
        assert_eq!(first.unwrap(), ImageUpdate::Superseded);
        assert_eq!(second.unwrap(), ImageUpdate::Applied);

        let image = &store.document().images[1];
        assert!(image.data.starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.scale, 1.0);
    }

    #[tokio::test]
    async fn test_replace_image_rejects_garbage() {
        let (store, _) = store_at("https://x.dev/", Persistence::Remote, None);
        store.hydrate().await;
        let before = store.document();
        let err = store.replace_image(0, b"GIF89a-not-really".to_vec()).await.unwrap_err();
        assert!(matches!(err, GreetcardError::UnsupportedImage(_)));
        assert_eq!(store.document(), before);
        assert_eq!(store.drain_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_ai_wish_stores_result() {
        let (store, _) = store_at("https://x.dev/", Persistence::Remote, None);
        store.hydrate().await;
        store.mutate(FieldLocator::Name, "Robin").unwrap();

        let text = store
            .generate_ai_wish(&crate::wish::CannedWishGenerator, WishStyle::Funny)
            .await
            .unwrap();
        let ai = store.document().text_data.ai.unwrap();
        assert_eq!(ai.text, text);
        assert_eq!(ai.style, WishStyle::Funny);
        assert!(text.contains("Robin"));
    }
}
