//! In-process text store
//!
//! Keeps both tables in memory under one lock. Useful for hosts that embed
//! the service without a database, and for exercising the revision logic.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::{TextStorageError, TextStorageResult};
use crate::models::{RevisionRecord, TextId, TextRecord, UserId};
use crate::storage::port::TextStore;

#[derive(Debug, Default)]
struct Tables {
    texts: BTreeMap<TextId, TextRecord>,
    revisions: BTreeMap<(TextId, u32), RevisionRecord>,
    last_id: i64,
}

impl Tables {
    fn update(
        &mut self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        let Some(record) = self.texts.get_mut(&id) else {
            return Ok(None);
        };
        if record.revision != expected_revision {
            return Ok(None);
        }

        record.revision = next_revision(id, record.revision)?;
        record.text = text.to_string();
        record.last_updated = at;
        Ok(Some(record.clone()))
    }

    fn append(&mut self, record: &RevisionRecord) -> TextStorageResult<()> {
        let key = (record.text_id, record.revision);
        if self.revisions.contains_key(&key) {
            return Err(TextStorageError::DuplicateRevision {
                text_id: record.text_id,
                revision: record.revision,
            });
        }

        self.revisions.insert(key, record.clone());
        Ok(())
    }
}

fn next_revision(id: TextId, revision: u32) -> TextStorageResult<u32> {
    revision
        .checked_add(1)
        .ok_or(TextStorageError::RevisionOverflow(id))
}

/// Text store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryTextStore {
    tables: Mutex<Tables>,
}

impl MemoryTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextStore for MemoryTextStore {
    fn get_by_id(&self, id: TextId) -> TextStorageResult<Option<TextRecord>> {
        Ok(self.lock().texts.get(&id).cloned())
    }

    fn get_many(&self, ids: &[TextId]) -> TextStorageResult<Vec<TextRecord>> {
        let tables = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.texts.get(id).cloned())
            .collect())
    }

    fn insert_current(
        &self,
        text: &str,
        revision: u32,
        at: DateTime<Utc>,
    ) -> TextStorageResult<TextId> {
        let mut tables = self.lock();
        tables.last_id += 1;
        let id = TextId::new(tables.last_id);

        tables.texts.insert(
            id,
            TextRecord {
                id,
                text: text.to_string(),
                revision,
                last_updated: at,
            },
        );
        Ok(id)
    }

    fn upsert_current(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        self.lock().update(id, expected_revision, text, at)
    }

    fn append_revision(&self, record: &RevisionRecord) -> TextStorageResult<()> {
        self.lock().append(record)
    }

    fn commit_change(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        let mut tables = self.lock();

        match tables.texts.get(&id) {
            Some(record) if record.revision == expected_revision => {}
            _ => return Ok(None),
        }

        // A taken log slot must fail before the row is touched
        let next = next_revision(id, expected_revision)?;
        if tables.revisions.contains_key(&(id, next)) {
            return Err(TextStorageError::DuplicateRevision {
                text_id: id,
                revision: next,
            });
        }

        let Some(updated) = tables.update(id, expected_revision, text, at)? else {
            return Ok(None);
        };
        tables.append(&RevisionRecord::snapshot(&updated, user_id))?;
        Ok(Some(updated))
    }

    fn query_revision(
        &self,
        id: TextId,
        revision: u32,
    ) -> TextStorageResult<Option<RevisionRecord>> {
        Ok(self.lock().revisions.get(&(id, revision)).cloned())
    }

    fn query_revisions(&self, id: TextId) -> TextStorageResult<Vec<RevisionRecord>> {
        Ok(self
            .lock()
            .revisions
            .range((id, 0)..=(id, u32::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn query_distinct_editors(&self, id: TextId) -> TextStorageResult<HashSet<UserId>> {
        Ok(self
            .lock()
            .revisions
            .range((id, 0)..=(id, u32::MAX))
            .map(|(_, record)| record.user_id)
            .collect())
    }
}
