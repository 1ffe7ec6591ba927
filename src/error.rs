//! Error types for chatforge operations.
//!
//! This module provides the error hierarchy used across the crate. Domain
//! enums (archive, generation, storage, chunking, I/O, command) are joined
//! into a single [`Error`] with `thiserror`'s `#[from]` conversions.

use thiserror::Error;

/// Result type alias for chatforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for chatforge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Archive assembly errors (marker parsing, zip encoding).
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Generation backend errors.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chunking-related errors (relay segmentation).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Archive-specific errors.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No `=== file: <path> ===` marker matched in the input.
    #[error("no file markers found in input")]
    EmptyInput,

    /// Total content exceeds the configured cap.
    #[error("archive content of {size} bytes exceeds limit of {max} bytes")]
    OversizedContent {
        /// Total content size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        max: usize,
    },

    /// The zip encoder failed.
    #[error("failed to write archive: {0}")]
    Write(String),
}

/// Errors raised by the generation backend.
///
/// Every variant is surfaced to chat clients as the relay placeholder, never
/// as a hard failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The backend could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend did not answer within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed, in seconds.
        seconds: u64,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The backend payload could not be interpreted.
    #[error("malformed backend payload: {0}")]
    Malformed(String),
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized (init command not run).
    #[error("chatforge not initialized. Run: chatforge init")]
    NotInitialized,

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The storage lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Unrecognized role value read back from the database.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Chunking-specific errors for relay segmentation.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Chunk size exceeds maximum allowed.
    #[error("chunk size {size} exceeds maximum {max}")]
    ChunkTooLarge {
        /// Actual chunk size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Unknown segmentation strategy.
    #[error("unknown chunking strategy: {name}")]
    UnknownStrategy {
        /// Name of the unknown strategy.
        name: String,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Write(err.to_string())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
