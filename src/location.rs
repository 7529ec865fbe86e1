//! # Location
//!
//! The address-bar side of a greeting: where a token or reference id lives
//! in a link, and the history operations used to update it.
//!
//! ## Link forms
//!
//! ```text
//! https://example.com/card#data=<token>    fragment-embedded greeting
//! https://example.com/card?id=<id>         reference to a remote blob
//! ```
//!
//! Fragment updates replace the current history entry (autosave on every
//! edit would otherwise flood back-navigation). A new reference id is a
//! meaningful navigable state, so it pushes an entry.

use parking_lot::Mutex;
use reqwest::Url;
use std::sync::Arc;

use crate::error::GreetcardError;

/// Fragment key carrying the state token.
pub const TOKEN_KEY: &str = "data";

/// Query parameter carrying the reference id.
pub const REFERENCE_KEY: &str = "id";

/// Browser-history style address manipulation.
pub trait Navigator: Send {
    /// Address currently shown.
    fn current(&self) -> Url;

    /// Swap the current entry without navigating or adding history.
    fn replace(&mut self, url: Url);

    /// Navigate to a new entry.
    fn push(&mut self, url: Url);
}

/// State token embedded in the fragment, if any.
pub fn token_in(url: &Url) -> Option<&str> {
    url.fragment()
        .and_then(|f| f.strip_prefix(TOKEN_KEY))
        .and_then(|rest| rest.strip_prefix('='))
        .filter(|token| !token.is_empty())
}

/// Reference id in the query string, if any.
pub fn reference_in(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == REFERENCE_KEY)
        .map(|(_, v)| v.into_owned())
        .filter(|id| !id.is_empty())
}

/// `url` with its fragment set to `data=<token>`.
pub fn with_token(url: &Url, token: &str) -> Url {
    let mut next = url.clone();
    next.set_fragment(Some(&format!("{}={}", TOKEN_KEY, token)));
    next
}

/// `url` pointing at a reference id, with any embedded token dropped.
pub fn with_reference(url: &Url, id: &str) -> Url {
    let mut next = url.clone();
    next.set_fragment(None);
    next.set_query(None);
    next.query_pairs_mut().append_pair(REFERENCE_KEY, id);
    next
}

/// `url` with the reference id removed from the query, other params kept.
pub fn without_reference(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != REFERENCE_KEY)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut next = url.clone();
    next.set_query(None);
    if !kept.is_empty() {
        next.query_pairs_mut().extend_pairs(kept);
    }
    next
}

#[derive(Debug)]
struct HistoryLog {
    back: Vec<Url>,
    current: Url,
    replaces: usize,
    pushes: usize,
}

/// In-process history, shareable between the store and an observer.
///
/// Clones share one log, so a shell (or test) can keep a handle and read back
/// what the store wrote.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    log: Arc<Mutex<HistoryLog>>,
}

impl MemoryHistory {
    pub fn new(start: Url) -> Self {
        Self {
            log: Arc::new(Mutex::new(HistoryLog {
                back: Vec::new(),
                current: start,
                replaces: 0,
                pushes: 0,
            })),
        }
    }

    /// Parse `start` as the initial address.
    pub fn parse(start: &str) -> Result<Self, GreetcardError> {
        Url::parse(start)
            .map(Self::new)
            .map_err(|e| GreetcardError::InvalidUrl(format!("{}: {}", start, e)))
    }

    /// Every entry, oldest first; the last one is current.
    pub fn entries(&self) -> Vec<Url> {
        let log = self.log.lock();
        let mut entries = log.back.clone();
        entries.push(log.current.clone());
        entries
    }

    pub fn replace_count(&self) -> usize {
        self.log.lock().replaces
    }

    pub fn push_count(&self) -> usize {
        self.log.lock().pushes
    }
}

impl Navigator for MemoryHistory {
    fn current(&self) -> Url {
        self.log.lock().current.clone()
    }

    fn replace(&mut self, url: Url) {
        let mut log = self.log.lock();
        log.replaces += 1;
        log.current = url;
    }

    fn push(&mut self, url: Url) {
        let mut log = self.log.lock();
        log.pushes += 1;
        let previous = std::mem::replace(&mut log.current, url);
        log.back.push(previous);
    }
}
