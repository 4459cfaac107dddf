//! Storage port
//!
//! The contract the service needs from a backing store. Implementations own
//! two logical tables: the mutable current-text table and the append-only
//! revision log.
//!
//! Properties required from implementations:
//! - `upsert_current` is a compare-and-swap on `revision`
//! - revision log rows are never updated or deleted
//! - `(text_id, revision)` is unique in the revision log

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::TextStorageResult;
use crate::models::{RevisionRecord, TextId, TextRecord, UserId};

/// Backing store for texts and their revision history
pub trait TextStore: Send + Sync {
    /// Fetch the current row for `id`
    fn get_by_id(&self, id: TextId) -> TextStorageResult<Option<TextRecord>>;

    /// Fetch the current rows for `ids`, in no particular order
    ///
    /// Ids without a row are skipped.
    fn get_many(&self, ids: &[TextId]) -> TextStorageResult<Vec<TextRecord>>;

    /// Insert a new current row and return the id the store assigned
    fn insert_current(
        &self,
        text: &str,
        revision: u32,
        at: DateTime<Utc>,
    ) -> TextStorageResult<TextId>;

    /// Replace the text of `id` if its revision is still `expected_revision`
    ///
    /// On success the row holds `expected_revision + 1`, `text` and
    /// `last_updated = at`, and the updated row is returned. Returns `None`
    /// when the row is missing or another writer moved the revision first.
    fn upsert_current(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>>;

    /// Append a snapshot to the revision log
    fn append_revision(&self, record: &RevisionRecord) -> TextStorageResult<()>;

    /// Apply a content change and archive it
    ///
    /// Stores that can should override this to run both steps atomically.
    fn commit_change(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        let Some(updated) = self.upsert_current(id, expected_revision, text, at)? else {
            return Ok(None);
        };
        self.append_revision(&RevisionRecord::snapshot(&updated, user_id))?;
        Ok(Some(updated))
    }

    /// Fetch the archived snapshot of `id` at `revision`
    ///
    /// Snapshots stored without an editor are treated as absent, here and in
    /// `query_revisions`.
    fn query_revision(
        &self,
        id: TextId,
        revision: u32,
    ) -> TextStorageResult<Option<RevisionRecord>>;

    /// Fetch every archived snapshot of `id`, oldest first
    fn query_revisions(&self, id: TextId) -> TextStorageResult<Vec<RevisionRecord>>;

    /// Distinct editors recorded in the revision log for `id`
    fn query_distinct_editors(&self, id: TextId) -> TextStorageResult<HashSet<UserId>>;
}
