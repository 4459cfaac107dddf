//! Data models for the text storage
//!
//! Defines the rows of the two tables (`TextRecord`, `RevisionRecord`)
//! and the read views returned by the service.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Identifier of a stored text, assigned by the store on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextId(i64);

impl TextId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TextId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl ToSql for TextId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for TextId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Identifier of the editor who produced a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for UserId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// A row of the current-text table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextRecord {
    /// Unique identifier
    pub id: TextId,
    /// Current content (may be empty)
    pub text: String,
    /// Number of content changes applied so far
    pub revision: u32,
    /// When the content last changed
    pub last_updated: DateTime<Utc>,
}

impl TextRecord {
    /// Whether this text carries any content
    pub fn has_content(&self) -> bool {
        !self.text.is_empty()
    }

    /// The read view of this record
    pub fn info(&self) -> TextInfo {
        TextInfo {
            text: self.text.clone(),
            revision: self.revision,
        }
    }
}

/// A row of the revision log
///
/// Rows are appended once and never modified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevisionRecord {
    pub text_id: TextId,
    pub revision: u32,
    /// Full snapshot of the text at this revision
    pub text: String,
    /// Copy of `TextRecord::last_updated` when the snapshot was taken
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
}

impl RevisionRecord {
    /// Snapshot a freshly updated text row on behalf of `user_id`
    pub fn snapshot(record: &TextRecord, user_id: UserId) -> Self {
        Self {
            text_id: record.id,
            revision: record.revision,
            text: record.text.clone(),
            timestamp: record.last_updated,
            user_id,
        }
    }

    /// The read view of this record
    pub fn info(&self) -> RevisionInfo {
        RevisionInfo {
            text: self.text.clone(),
            revision: self.revision,
            user_id: self.user_id,
        }
    }
}

/// Current text together with its revision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextInfo {
    pub text: String,
    pub revision: u32,
}

/// An archived revision together with its editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevisionInfo {
    pub text: String,
    pub revision: u32,
    pub user_id: UserId,
}
