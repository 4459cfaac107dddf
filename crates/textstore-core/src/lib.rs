//! Text storage core library
//!
//! Stores mutable text blobs under an id, counts every content change as a
//! revision, and archives each revision with the editor who made it.
//!
//! # Architecture
//!
//! - **Current text**: one mutable row per id (text, revision, last update)
//! - **Revision log**: append-only full snapshots, one per change
//!
//! The service holds the revision rules; storage sits behind the
//! `TextStore` trait.
//!
//! # Quick Start
//!
//! ```text
//! let service = TextStorageService::open(&TextStorageConfig::load()?)?;
//!
//! let id = service.create_text("Body", UserId::new(7))?;
//! service.set_text(id, "Edited body", UserId::new(9))?;
//!
//! let editors = service.get_text_user_ids(id)?;
//! ```
//!
//! # Modules
//!
//! - `service`: Revision logic (main entry point)
//! - `models`: Ids, table rows and read views
//! - `storage`: Storage port, SQLite and in-memory stores
//! - `config`: Table names and database location
//! - `error`: Error types

pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;

pub use config::TextStorageConfig;
pub use error::{TextStorageError, TextStorageResult};
pub use models::{RevisionInfo, RevisionRecord, TextId, TextInfo, TextRecord, UserId};
pub use service::{TextStorageService, MAX_COMMIT_ATTEMPTS};
pub use storage::{MemoryTextStore, SqliteTextStore, TextStore};
