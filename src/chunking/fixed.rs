//! Fixed-size segmentation strategy.
//!
//! Splits text into runs of a fixed number of Unicode scalar values. Byte
//! offsets always land on UTF-8 character boundaries, so multi-byte
//! characters are never split.

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::chunking::traits::{Segmenter, group_units};
use crate::core::Segment;
use crate::error::Result;

/// Fixed-size segmenter counting characters.
///
/// # Examples
///
/// ```
/// use chatforge::chunking::{FixedSegmenter, Segmenter};
///
/// let segmenter = FixedSegmenter::with_size(5);
/// let text = "hello there";
/// let parts: Vec<&str> = segmenter
///     .segment(text)
///     .unwrap()
///     .iter()
///     .map(|s| s.slice(text))
///     .collect();
/// assert_eq!(parts, vec!["hello", " ther", "e"]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSegmenter {
    /// Characters per segment.
    chunk_size: usize,
}

impl Default for FixedSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedSegmenter {
    /// Creates a fixed segmenter with the default size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Creates a fixed segmenter with a custom size.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - Characters per segment.
    #[must_use]
    pub const fn with_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Segmenter for FixedSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<Segment>> {
        self.validate()?;

        // Handle text smaller than one segment without walking it twice
        if text.len() <= self.chunk_size {
            return Ok(if text.is_empty() {
                vec![]
            } else {
                vec![Segment::new(0..text.len(), 0)]
            });
        }

        Ok(group_units(
            text,
            text.char_indices().map(|(offset, _)| offset),
            self.chunk_size,
        ))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn description(&self) -> &'static str {
        "Fixed number of characters per chunk"
    }
}
