//! # chatforge
//!
//! Chat relay and project packager for LLM-backed code generation.
//!
//! chatforge forwards chat turns to a text-generation backend and relays the
//! reply to the caller, either whole or as a paced stream of chunks. Replies
//! that contain `=== file: <path> ===` markers can be packed into a zip
//! archive, one entry per marked file.
//!
//! ## Features
//!
//! - **Relay**: Segments complete replies into paced chunks, forwards
//!   incremental backends as they produce text, stops on client disconnect
//! - **Archive**: Marker scanning and in-memory zip assembly
//! - **HTTP API**: axum server with Server-Sent Events streaming
//! - **`SQLite` History**: Optional per-owner message log
//! - **Unicode Aware**: Byte or grapheme cluster segmentation

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod archive;
pub mod chunking;
pub mod cli;
pub mod core;
pub mod error;
pub mod generation;
pub mod io;
pub mod relay;
pub mod server;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{ChatMessage, ChatTurn, FileBlock, Role, StreamChunk, TurnMessage};

// Re-export archive types
pub use archive::{ArchivePolicy, ProjectArchive, build_archive, list_files};

// Re-export relay types
pub use relay::{ChatService, ChunkSink, RelayOutcome, RelayPolicy, relay};

// Re-export generation types
pub use generation::{Generator, HuggingFaceConfig, HuggingFaceGenerator};

// Re-export storage types
pub use storage::{DEFAULT_DB_PATH, SqliteStorage, Storage};

// Re-export chunking types
pub use chunking::{Segmenter, available_strategies, create_segmenter};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
