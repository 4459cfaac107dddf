//! Text storage configuration
//!
//! Configuration is assembled from:
//! 1. Default values
//! 2. An option map supplied by the host, or a TOML config file
//!    (~/.config/textstore/config.toml)
//! 3. Environment variables (TEXTSTORE_* prefix), applied by `load` and
//!    `load_from_path` only
//!
//! Every source is validated eagerly: unknown keys and table names that are
//! not plain SQL identifiers are rejected before any table is touched.

use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::error::{TextStorageError, TextStorageResult};

/// Environment variable prefix
const ENV_PREFIX: &str = "TEXTSTORE";

/// Default name of the current-text table
pub const DEFAULT_TEXT_TABLE: &str = "textstorage_text";

/// Default name of the revision log table
pub const DEFAULT_REVISION_TABLE: &str = "textstorage_revision";

/// Text storage configuration
///
/// The database handle itself is not part of this record; hand an open
/// connection to `SqliteTextStore::with_connection` to reuse one. The
/// `dbAdapter` / `connection` key is still recognized so a host can forward
/// its option map unchanged, but it must be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextStorageConfig {
    /// Table holding the latest text and revision per id
    #[serde(default = "default_text_table", alias = "textTableName")]
    pub text_table_name: String,

    /// Append-only table holding every committed revision
    #[serde(default = "default_revision_table", alias = "revisionTableName")]
    pub revision_table_name: String,

    /// SQLite database file used by `SqliteTextStore::open`
    #[serde(default = "default_database_path", alias = "databasePath")]
    pub database_path: PathBuf,

    /// Placeholder for the connection handle; only null is accepted
    #[serde(
        default,
        alias = "dbAdapter",
        alias = "connection",
        skip_serializing
    )]
    pub db_adapter: Option<IgnoredAny>,
}

impl Default for TextStorageConfig {
    fn default() -> Self {
        Self {
            text_table_name: default_text_table(),
            revision_table_name: default_revision_table(),
            database_path: default_database_path(),
            db_adapter: None,
        }
    }
}

impl TextStorageConfig {
    /// Build configuration from an option map supplied by the host
    ///
    /// Accepts `text_table_name` / `textTableName`,
    /// `revision_table_name` / `revisionTableName`,
    /// `database_path` / `databasePath` and a null
    /// `db_adapter` / `dbAdapter` / `connection`. Any other key is a
    /// configuration error.
    pub fn from_options(options: serde_json::Value) -> TextStorageResult<Self> {
        let config: Self =
            serde_json::from_value(options).map_err(TextStorageError::configuration)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TEXTSTORE_TEXT_TABLE, TEXTSTORE_REVISION_TABLE,
    ///    TEXTSTORE_DATABASE)
    /// 2. Config file (~/.config/textstore/config.toml or TEXTSTORE_CONFIG)
    /// 3. Default values
    pub fn load() -> TextStorageResult<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> TextStorageResult<Self> {
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|source| TextStorageError::ReadConfig {
                    path: path.to_path_buf(),
                    source,
                })?;
            toml::from_str(&content).map_err(|e| {
                TextStorageError::configuration(format!("{}: {}", path.display(), e))
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    ///
    /// Environment variables are not consulted.
    pub fn load_from_str(toml_content: &str) -> TextStorageResult<Self> {
        let config: Self =
            toml::from_str(toml_content).map_err(TextStorageError::configuration)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the config file path
    ///
    /// Can be overridden with TEXTSTORE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("textstore")
            .join("config.toml")
    }

    /// Check table names before they are spliced into SQL
    pub fn validate(&self) -> TextStorageResult<()> {
        validate_table_name("text_table_name", &self.text_table_name)?;
        validate_table_name("revision_table_name", &self.revision_table_name)?;

        if self.db_adapter.is_some() {
            return Err(TextStorageError::configuration(
                "db_adapter must be null; pass the connection to with_connection",
            ));
        }

        if self.text_table_name == self.revision_table_name {
            return Err(TextStorageError::configuration(format!(
                "text and revision tables must differ (both are '{}')",
                self.text_table_name
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        // TEXTSTORE_TEXT_TABLE
        if let Ok(val) = std::env::var(format!("{}_TEXT_TABLE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.text_table_name = val;
            }
        }

        // TEXTSTORE_REVISION_TABLE
        if let Ok(val) = std::env::var(format!("{}_REVISION_TABLE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.revision_table_name = val;
            }
        }

        // TEXTSTORE_DATABASE
        if let Ok(val) = std::env::var(format!("{}_DATABASE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.database_path = PathBuf::from(val);
            }
        }
    }
}

fn validate_table_name(key: &str, name: &str) -> TextStorageResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(TextStorageError::configuration(format!(
            "{} '{}' is not a valid table name",
            key, name
        )))
    }
}

fn default_text_table() -> String {
    DEFAULT_TEXT_TABLE.to_string()
}

fn default_revision_table() -> String {
    DEFAULT_REVISION_TABLE.to_string()
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("textstore")
        .join("textstore.db")
}
