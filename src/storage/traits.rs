//! Storage trait definition.
//!
//! Defines the interface for persistent storage backends, enabling
//! pluggable storage implementations.

use crate::core::ChatMessage;
use crate::error::Result;
use serde::Serialize;

/// Trait for persistent chat history backends.
///
/// Implementations only need to be `Send`: a backend is owned by one
/// [`std::sync::Mutex`] and every call happens on a blocking thread while
/// the lock is held.
pub trait Storage: Send {
    /// Initializes storage (creates schema).
    ///
    /// Should be idempotent - safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails or the stored schema is
    /// newer than this build understands.
    fn init(&mut self) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    /// Deletes every recorded message but preserves the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn reset(&mut self) -> Result<()>;

    /// Records one message.
    ///
    /// Returns the assigned message ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn record(&mut self, message: &ChatMessage) -> Result<i64>;

    /// Returns the most recent messages in chronological order.
    ///
    /// # Arguments
    ///
    /// * `owner` - Restrict to one owner, or `None` for everyone.
    /// * `limit` - Maximum number of messages returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    fn history(&self, owner: Option<&str>, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Returns the number of recorded messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    fn message_count(&self) -> Result<usize>;

    /// Gets storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be computed.
    fn stats(&self) -> Result<StorageStats>;
}

/// Storage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    /// Number of recorded messages.
    pub message_count: usize,
    /// Number of user messages.
    pub user_messages: usize,
    /// Number of assistant messages.
    pub assistant_messages: usize,
    /// Number of distinct owners.
    pub owner_count: usize,
    /// Total size of all message content in bytes.
    pub total_content_size: usize,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
