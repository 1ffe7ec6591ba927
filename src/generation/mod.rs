//! Generation backends.
//!
//! A [`Generator`] turns a prompt into text. Backends either answer in one
//! piece ([`Generation::Complete`]) or as a stream of fragments
//! ([`Generation::Incremental`]); the relay handles both the same way.

pub mod huggingface;

pub use huggingface::{HuggingFaceConfig, HuggingFaceGenerator};

use crate::error::GenerationError;
use async_trait::async_trait;
use futures_util::Stream;
use std::fmt;
use std::pin::Pin;

/// Stream of text fragments produced by an incremental backend.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// Text returned by a generator.
pub enum Generation {
    /// The whole reply, already resident in memory.
    Complete(String),
    /// Fragments in generation order. Any item may be an error, which ends
    /// the generation.
    Incremental(TextStream),
}

impl Generation {
    /// Wraps a fragment stream.
    pub fn incremental<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<String, GenerationError>> + Send + 'static,
    {
        Self::Incremental(Box::pin(stream))
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(text) => f.debug_tuple("Complete").field(&text.len()).finish(),
            Self::Incremental(_) => f.write_str("Incremental(..)"),
        }
    }
}

/// How a backend delivers its reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum GenerationMode {
    /// Wait for the full reply, then let the relay pace it out.
    #[default]
    OneShot,
    /// Forward backend tokens as they arrive.
    Streaming,
}

impl GenerationMode {
    /// Returns the flag spelling of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneShot => "one-shot",
            Self::Streaming => "streaming",
        }
    }
}

/// Trait for text generation backends.
///
/// Implementations must be `Send + Sync` so one backend can serve every
/// concurrent chat session through an `Arc`. Generators never retry; a
/// failure is reported once and the relay turns it into a placeholder reply.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates a reply to `prompt`.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] if the backend is unreachable, times
    /// out, answers with a non-success status or sends an unreadable payload.
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;

    /// Returns a short backend name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_generation_debug_hides_content() {
        let generation = Generation::Complete("secret reply".to_string());
        assert_eq!(format!("{generation:?}"), "Complete(12)");

        let generation = Generation::incremental(stream::empty());
        assert_eq!(format!("{generation:?}"), "Incremental(..)");
    }

    #[test]
    fn test_generation_mode_names() {
        assert_eq!(GenerationMode::default(), GenerationMode::OneShot);
        assert_eq!(GenerationMode::Streaming.as_str(), "streaming");
    }
}
