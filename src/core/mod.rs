//! Core domain models for chatforge.
//!
//! This module contains the fundamental data structures used throughout the
//! crate: file blocks and manifests for archives, segments and stream chunks
//! for the relay, and chat messages for persistence. These are pure domain
//! models with no I/O dependencies.

pub mod block;
pub mod chunk;
pub mod message;

pub use block::{ArchiveManifest, FileBlock};
pub use chunk::{Segment, StreamChunk, concat_tokens};
pub use message::{ChatMessage, ChatTurn, Role, TurnMessage};
