//! Storage layer for chatforge.
//!
//! Persists chat history in `SQLite`. The relay never talks to the database
//! directly: sessions hold a [`SharedStorage`] handle and write through
//! `spawn_blocking`, so a slow disk never stalls chunk delivery.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageStats};

use std::sync::{Arc, Mutex};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".chatforge/history.db";

/// Storage handle shared between concurrent chat sessions.
pub type SharedStorage = Arc<Mutex<dyn Storage>>;

/// Wraps a storage backend for sharing.
pub fn shared<S: Storage + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}
