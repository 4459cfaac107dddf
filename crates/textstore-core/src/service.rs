//! Text storage service
//!
//! Owns the revision rules on top of a `TextStore`:
//! - a write only becomes a revision when the content actually changes
//! - every revision is archived with the editor who produced it
//! - reads report absence as `None`, never as an error
//!
//! ## Usage
//!
//! ```ignore
//! let service = TextStorageService::open(&TextStorageConfig::load()?)?;
//!
//! let id = service.create_text("First draft", UserId::new(7))?;
//! service.set_text(id, "Second draft", UserId::new(9))?;
//!
//! let info = service.get_text_info(id)?;  // revision 2
//! ```
//!
//! ## Concurrent writers
//!
//! `set_text` commits with a compare-and-swap on the revision it read. When
//! another writer gets there first, it re-reads and decides again, so the
//! later write lands on top (last writer wins) and revision numbers stay
//! contiguous. After `MAX_COMMIT_ATTEMPTS` lost rounds it gives up with
//! `TextStorageError::Contention`.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::TextStorageConfig;
use crate::error::{TextStorageError, TextStorageResult};
use crate::models::{RevisionInfo, RevisionRecord, TextId, TextInfo, UserId};
use crate::storage::{SqliteTextStore, TextStore};

/// Commit rounds `set_text` may lose to other writers before giving up
pub const MAX_COMMIT_ATTEMPTS: u32 = 1000;

/// Versioned text storage
pub struct TextStorageService<S = SqliteTextStore> {
    store: S,
}

impl TextStorageService<SqliteTextStore> {
    /// Open a SQLite-backed service from configuration
    pub fn open(config: &TextStorageConfig) -> TextStorageResult<Self> {
        Ok(Self::new(SqliteTextStore::open(config)?))
    }

    /// Build a service over a connection the host already holds
    ///
    /// `options` is the host's option map; unknown keys are rejected.
    pub fn with_connection(conn: Connection, options: serde_json::Value) -> TextStorageResult<Self> {
        let config = TextStorageConfig::from_options(options)?;
        Ok(Self::new(SqliteTextStore::with_connection(conn, &config)?))
    }
}

impl<S: TextStore> TextStorageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    // ==================== Writes ====================

    /// Create a text and record `text` as its first revision
    ///
    /// The row starts empty at revision 0 and the content goes through
    /// `set_text`, so an empty `text` leaves it at revision 0 with no history.
    pub fn create_text(&self, text: &str, user_id: UserId) -> TextStorageResult<TextId> {
        let id = self.store.insert_current("", 0, Utc::now())?;
        debug!("Created text {}", id);
        self.set_text(id, text, user_id)
    }

    /// Replace the content of `id`
    ///
    /// Identical content is a no-op. Fails with `NotFound` if `id` has no row,
    /// and with `RevisionOverflow` if its revision counter is exhausted.
    pub fn set_text(&self, id: TextId, text: &str, user_id: UserId) -> TextStorageResult<TextId> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = self
                .store
                .get_by_id(id)?
                .ok_or(TextStorageError::NotFound(id))?;

            if current.text == text {
                debug!(
                    "Text {} unchanged at revision {}, nothing to archive",
                    id, current.revision
                );
                return Ok(current.id);
            }

            if current.revision == u32::MAX {
                return Err(TextStorageError::RevisionOverflow(id));
            }

            match self
                .store
                .commit_change(id, current.revision, text, user_id, Utc::now())?
            {
                Some(updated) => {
                    info!(
                        "Text {} moved to revision {} by user {}",
                        updated.id, updated.revision, user_id
                    );
                    return Ok(updated.id);
                }
                None => {
                    debug!(
                        "Text {} changed past revision {} concurrently, re-reading (attempt {})",
                        id, current.revision, attempt
                    );
                }
            }
        }

        warn!(
            "Giving up on text {} after losing {} commit rounds",
            id, MAX_COMMIT_ATTEMPTS
        );
        Err(TextStorageError::Contention {
            text_id: id,
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    // ==================== Reads ====================

    /// Get the current text of `id`
    pub fn get_text(&self, id: TextId) -> TextStorageResult<Option<String>> {
        Ok(self.store.get_by_id(id)?.map(|record| record.text))
    }

    /// Get the current text of `id` together with its revision
    pub fn get_text_info(&self, id: TextId) -> TextStorageResult<Option<TextInfo>> {
        Ok(self.store.get_by_id(id)?.map(|record| record.info()))
    }

    /// Get the archived snapshot of `id` at `revision`
    ///
    /// Revision 0 is never archived. A snapshot stored without an editor
    /// (only possible in data written outside this service) reads as absent.
    pub fn get_revision_info(
        &self,
        id: TextId,
        revision: u32,
    ) -> TextStorageResult<Option<RevisionInfo>> {
        Ok(self
            .store
            .query_revision(id, revision)?
            .map(|record| record.info()))
    }

    /// Get the full history of `id`, oldest revision first
    ///
    /// Snapshots stored without an editor are left out.
    pub fn get_revisions(&self, id: TextId) -> TextStorageResult<Vec<RevisionRecord>> {
        self.store.query_revisions(id)
    }

    /// Get the text of the first id in `ids` that has non-empty content
    ///
    /// `ids` is in preference order, e.g. a localized text before the
    /// default-language one. Missing and empty texts are skipped.
    pub fn get_first_text(&self, ids: &[TextId]) -> TextStorageResult<Option<String>> {
        if ids.is_empty() {
            return Ok(None);
        }

        let mut found: HashMap<TextId, String> = self
            .store
            .get_many(ids)?
            .into_iter()
            .filter(|record| record.has_content())
            .map(|record| (record.id, record.text))
            .collect();

        Ok(ids.iter().find_map(|id| found.remove(id)))
    }

    /// Get the distinct editors who ever changed the content of `id`
    pub fn get_text_user_ids(&self, id: TextId) -> TextStorageResult<HashSet<UserId>> {
        self.store.query_distinct_editors(id)
    }
}
