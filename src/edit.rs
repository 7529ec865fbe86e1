//! # Edit Session
//!
//! At most one text field is open for editing at a time. The draft lives
//! here until it is committed to the [`DocumentStore`] or thrown away.
//!
//! ```text
//! Closed ──request(field)──> Open{field, draft}
//! Open   ──request(other)──> Open{other, draft}   previous draft discarded
//! Open   ──commit / cancel─> Closed
//! ```

use tracing::debug;

use crate::document::FieldLocator;
use crate::error::GreetcardError;
use crate::session::DocumentStore;

/// The open field and its uncommitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub field: FieldLocator,
    pub draft: String,
}

/// Result of [`EditSession::commit`].
#[derive(Debug)]
pub enum CommitOutcome {
    /// Draft written to the document.
    Applied,
    /// The store refused the write; the document is unchanged.
    Rejected(GreetcardError),
    /// A blank recipient name is never stored.
    SkippedEmptyName,
    NothingOpen,
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied)
    }
}

#[derive(Debug, Default)]
pub struct EditSession {
    open: Option<PendingEdit>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `field`, seeding the draft with its current value.
    ///
    /// Refused while the store is read-only or still loading. Opening a new
    /// field drops any draft for the previous one without committing it.
    pub fn request(&mut self, store: &DocumentStore, field: FieldLocator) -> Result<(), GreetcardError> {
        match store.mode() {
            None => return Err(GreetcardError::Loading),
            Some(mode) if !mode.is_editable() => return Err(GreetcardError::ReadOnly),
            Some(_) => {}
        }
        let current = store
            .text(field)
            .ok_or_else(|| GreetcardError::InvalidField(format!("no such field: {}", field)))?;

        if let Some(previous) = self.open.replace(PendingEdit { field, draft: current })
            && previous.field != field
        {
            debug!(discarded = %previous.field, opened = %field, "edit switched fields");
        }
        Ok(())
    }

    /// Replace the draft of the open field. No-op when nothing is open.
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        if let Some(edit) = self.open.as_mut() {
            edit.draft = draft.into();
        }
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Write the draft through the store and close. Always closes, whatever
    /// the outcome.
    pub fn commit(&mut self, store: &DocumentStore) -> CommitOutcome {
        let Some(PendingEdit { field, draft }) = self.open.take() else {
            return CommitOutcome::NothingOpen;
        };
        if field == FieldLocator::Name && draft.trim().is_empty() {
            debug!("blank recipient name not committed");
            return CommitOutcome::SkippedEmptyName;
        }
        match store.mutate(field, draft) {
            Ok(()) => CommitOutcome::Applied,
            Err(e) => CommitOutcome::Rejected(e),
        }
    }

    /// Close without writing.
    pub fn cancel(&mut self) -> Option<PendingEdit> {
        self.open.take()
    }
}
