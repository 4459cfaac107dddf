//! SQLite schema for the current-text table and the revision log
//!
//! Table names come from configuration and are validated as plain
//! identifiers before they reach any statement built here.

use rusqlite::{Connection, Result};

use crate::config::TextStorageConfig;

/// Names of the two tables a store works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub text: String,
    pub revision: String,
}

impl TableNames {
    pub fn from_config(config: &TextStorageConfig) -> Self {
        Self {
            text: config.text_table_name.clone(),
            revision: config.revision_table_name.clone(),
        }
    }
}

/// Initialize the database schema
pub fn init_schema(conn: &Connection, tables: &TableNames) -> Result<()> {
    let text = &tables.text;
    let revision = &tables.revision;

    conn.execute_batch(&format!(
        r#"
        -- Latest text per id
        CREATE TABLE IF NOT EXISTS {text} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            revision INTEGER NOT NULL DEFAULT 0,
            text TEXT NOT NULL DEFAULT '',
            last_updated INTEGER NOT NULL
        );

        -- Append-only history, one row per content change
        CREATE TABLE IF NOT EXISTS {revision} (
            text_id INTEGER NOT NULL,
            revision INTEGER NOT NULL,
            text TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            user_id INTEGER,
            PRIMARY KEY (text_id, revision),
            FOREIGN KEY (text_id) REFERENCES {text}(id)
        );

        -- Editor lookups
        CREATE INDEX IF NOT EXISTS idx_{revision}_user_id ON {revision}(text_id, user_id);
        "#
    ))
}

/// Check if either table is missing
pub fn needs_init(conn: &Connection, tables: &TableNames) -> bool {
    !(table_exists(conn, &tables.text) && table_exists(conn, &tables.revision))
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1")
        .and_then(|mut stmt| stmt.exists([name]))
        .unwrap_or(false)
}
