//! SQLite-backed text store
//!
//! The connection sits behind a mutex so one store can be shared across
//! threads. `commit_change` updates the current row and appends the log
//! row in a single transaction.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::TextStorageConfig;
use crate::error::{TextStorageError, TextStorageResult};
use crate::models::{RevisionRecord, TextId, TextRecord, UserId};
use crate::storage::port::TextStore;
use crate::storage::schema::{init_schema, needs_init, TableNames};

/// Ids bound per `IN (...)` lookup, well under SQLite's variable limit
const LOOKUP_CHUNK: usize = 500;

/// Text store over a SQLite connection
pub struct SqliteTextStore {
    conn: Mutex<Connection>,
    tables: TableNames,
}

impl SqliteTextStore {
    /// Open or create the database file named by the configuration
    pub fn open(config: &TextStorageConfig) -> TextStorageResult<Self> {
        config.validate()?;
        let path = &config.database_path;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    TextStorageError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let conn = Connection::open(path)?;
        debug!("Opened text database at {:?}", path);
        Self::with_connection(conn, config)
    }

    /// Open an in-memory database with the default table names (for testing)
    pub fn open_in_memory() -> TextStorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, &TextStorageConfig::default())
    }

    /// Wrap a connection the host already holds
    ///
    /// Missing tables are created; existing ones are used as they are.
    pub fn with_connection(conn: Connection, config: &TextStorageConfig) -> TextStorageResult<Self> {
        config.validate()?;
        let tables = TableNames::from_config(config);

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn, &tables) {
            init_schema(&conn, &tables)?;
            info!(
                "Initialized text storage tables {} and {}",
                tables.text, tables.revision
            );
        }

        Ok(Self {
            conn: Mutex::new(conn),
            tables,
        })
    }

    /// Table names this store reads and writes
    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select_text(&self, conn: &Connection, id: TextId) -> rusqlite::Result<Option<TextRecord>> {
        conn.prepare_cached(&format!(
            "SELECT id, text, revision, last_updated FROM {} WHERE id = ?1 LIMIT 1",
            self.tables.text
        ))?
        .query_row(params![id], row_to_text)
        .optional()
    }

    fn update_text(
        &self,
        conn: &Connection,
        id: TextId,
        expected_revision: u32,
        text: &str,
        at: DateTime<Utc>,
    ) -> rusqlite::Result<Option<TextRecord>> {
        let changed = conn
            .prepare_cached(&format!(
                "UPDATE {} SET revision = revision + 1, text = ?1, last_updated = ?2
                 WHERE id = ?3 AND revision = ?4",
                self.tables.text
            ))?
            .execute(params![text, at.timestamp_millis(), id, expected_revision])?;

        if changed == 0 {
            return Ok(None);
        }

        self.select_text(conn, id)
    }

    fn insert_revision(&self, conn: &Connection, record: &RevisionRecord) -> rusqlite::Result<()> {
        conn.prepare_cached(&format!(
            "INSERT INTO {} (text_id, revision, text, timestamp, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            self.tables.revision
        ))?
        .execute(params![
            record.text_id,
            record.revision,
            record.text,
            record.timestamp.timestamp_millis(),
            record.user_id,
        ])?;
        Ok(())
    }
}

impl TextStore for SqliteTextStore {
    fn get_by_id(&self, id: TextId) -> TextStorageResult<Option<TextRecord>> {
        let conn = self.lock();
        Ok(self.select_text(&conn, id)?)
    }

    fn get_many(&self, ids: &[TextId]) -> TextStorageResult<Vec<TextRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock();
        let mut records = Vec::new();

        for chunk in ids.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT id, text, revision, last_updated FROM {} WHERE id IN ({})",
                self.tables.text, placeholders
            ))?;

            for record in stmt.query_map(params_from_iter(chunk.iter()), row_to_text)? {
                records.push(record?);
            }
        }

        Ok(records)
    }

    fn insert_current(
        &self,
        text: &str,
        revision: u32,
        at: DateTime<Utc>,
    ) -> TextStorageResult<TextId> {
        let conn = self.lock();
        conn.prepare_cached(&format!(
            "INSERT INTO {} (revision, text, last_updated) VALUES (?1, ?2, ?3)",
            self.tables.text
        ))?
        .execute(params![revision, text, at.timestamp_millis()])?;

        Ok(TextId::new(conn.last_insert_rowid()))
    }

    fn upsert_current(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        let conn = self.lock();
        Ok(self.update_text(&conn, id, expected_revision, text, at)?)
    }

    fn append_revision(&self, record: &RevisionRecord) -> TextStorageResult<()> {
        let conn = self.lock();
        Ok(self.insert_revision(&conn, record)?)
    }

    fn commit_change(
        &self,
        id: TextId,
        expected_revision: u32,
        text: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> TextStorageResult<Option<TextRecord>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let Some(updated) = self.update_text(&tx, id, expected_revision, text, at)? else {
            return Ok(None);
        };
        self.insert_revision(&tx, &RevisionRecord::snapshot(&updated, user_id))?;

        tx.commit()?;
        Ok(Some(updated))
    }

    fn query_revision(
        &self,
        id: TextId,
        revision: u32,
    ) -> TextStorageResult<Option<RevisionRecord>> {
        let conn = self.lock();
        let record = conn
            .prepare_cached(&format!(
                "SELECT text_id, revision, text, timestamp, user_id FROM {}
                 WHERE text_id = ?1 AND revision = ?2 AND user_id IS NOT NULL",
                self.tables.revision
            ))?
            .query_row(params![id, revision], row_to_revision)
            .optional()?;
        Ok(record)
    }

    fn query_revisions(&self, id: TextId) -> TextStorageResult<Vec<RevisionRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT text_id, revision, text, timestamp, user_id FROM {}
             WHERE text_id = ?1 AND user_id IS NOT NULL
             ORDER BY revision ASC",
            self.tables.revision
        ))?;

        let records = stmt
            .query_map(params![id], row_to_revision)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn query_distinct_editors(&self, id: TextId) -> TextStorageResult<HashSet<UserId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT DISTINCT user_id FROM {} WHERE text_id = ?1 AND user_id IS NOT NULL",
            self.tables.revision
        ))?;

        let editors = stmt
            .query_map(params![id], |row| row.get::<_, UserId>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(editors)
    }
}

fn row_to_text(row: &Row<'_>) -> rusqlite::Result<TextRecord> {
    Ok(TextRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        revision: row.get(2)?,
        last_updated: millis_to_datetime(3, row.get(3)?)?,
    })
}

fn row_to_revision(row: &Row<'_>) -> rusqlite::Result<RevisionRecord> {
    Ok(RevisionRecord {
        text_id: row.get(0)?,
        revision: row.get(1)?,
        text: row.get(2)?,
        timestamp: millis_to_datetime(3, row.get(3)?)?,
        user_id: row.get(4)?,
    })
}

fn millis_to_datetime(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}
