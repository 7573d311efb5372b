//! # brainflow-store
//!
//! Persistence for BrainFlow documents.
//!
//! Each outline is stored as one document holding its flat item list; users
//! are stored alongside. The crate exposes a synchronous [`Database`] handle
//! that wraps a `rusqlite::Connection`, and the async [`DocumentStore`] trait
//! the server is written against, with a SQLite-backed and an in-memory
//! implementation.

pub mod database;
pub mod document;
pub mod memory;
pub mod migrations;
pub mod outlines;
pub mod sqlite;
pub mod users;

mod error;

pub use database::Database;
pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
