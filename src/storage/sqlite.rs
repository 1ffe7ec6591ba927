//! `SQLite` storage implementation.
//!
//! Provides persistent chat history using `SQLite` in WAL mode.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{ChatMessage, Role};
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use crate::storage::traits::{Storage, StorageStats};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// SQLite-based chat history.
///
/// # Examples
///
/// ```no_run
/// use chatforge::storage::{SqliteStorage, Storage};
///
/// let mut storage = SqliteStorage::open(".chatforge/history.db").unwrap();
/// storage.init().unwrap();
/// ```
pub struct SqliteStorage {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens or creates a `SQLite` database at the given path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;

        // journal_mode returns the resulting mode, so it needs query_row
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory `SQLite` database.
    ///
    /// Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }
}

impl Storage for SqliteStorage {
    fn init(&mut self) -> Result<()> {
        if self.is_initialized()? {
            if let Some(current) = self.get_schema_version()?
                && current > CURRENT_SCHEMA_VERSION
            {
                return Err(StorageError::Migration(format!(
                    "database schema v{current} is newer than supported v{CURRENT_SCHEMA_VERSION}"
                ))
                .into());
            }
            return Ok(());
        }

        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(StorageError::from)?;
        self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        Ok(self.count(CHECK_SCHEMA_SQL)? > 0)
    }

    fn reset(&mut self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM messages;")
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn record(&mut self, message: &ChatMessage) -> Result<i64> {
        self.conn
            .execute(
                r"
            INSERT INTO messages (owner_id, role, content, created_at)
            VALUES (?, ?, ?, ?)
        ",
                params![
                    message.owner_id,
                    message.role.as_str(),
                    message.content,
                    message.created_at,
                ],
            )
            .map_err(StorageError::from)?;

        Ok(self.conn.last_insert_rowid())
    }

    fn history(&self, owner: Option<&str>, limit: usize) -> Result<Vec<ChatMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT id, owner_id, role, content, created_at
            FROM messages
            WHERE ?1 IS NULL OR owner_id = ?1
            ORDER BY id DESC
            LIMIT ?2
        ",
            )
            .map_err(StorageError::from)?;

        let rows = stmt
            .query_map(params![owner, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(StorageError::from)?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, owner_id, role, content, created_at) = row.map_err(StorageError::from)?;
            messages.push(ChatMessage {
                id: Some(id),
                owner_id,
                role: role.parse::<Role>()?,
                content,
                created_at,
            });
        }

        // Newest-first from the query; callers want reading order
        messages.reverse();
        Ok(messages)
    }

    fn message_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM messages")
    }

    fn stats(&self) -> Result<StorageStats> {
        let message_count = self.message_count()?;
        let user_messages = self.count("SELECT COUNT(*) FROM messages WHERE role = 'user'")?;
        let assistant_messages =
            self.count("SELECT COUNT(*) FROM messages WHERE role = 'assistant'")?;
        let owner_count = self.count("SELECT COUNT(DISTINCT owner_id) FROM messages")?;
        let total_content_size =
            self.count("SELECT COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0) FROM messages")?;

        let schema_version = self.get_schema_version()?.unwrap_or(0);

        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StorageStats {
            message_count,
            user_messages,
            assistant_messages,
            owner_count,
            total_content_size,
            schema_version,
            db_size,
        })
    }
}
