//! Storage layer
//!
//! The service talks to a `TextStore`; this module defines that port and
//! ships two implementations.
//!
//! ## Tables
//!
//! - current text - one mutable row per text id
//! - revision log - append-only snapshots, one per content change
//!
//! `SqliteTextStore` is the persistent store. `MemoryTextStore` keeps
//! everything in process.

pub mod memory;
pub mod port;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryTextStore;
pub use port::TextStore;
pub use schema::{init_schema, needs_init, TableNames};
pub use sqlite::SqliteTextStore;
