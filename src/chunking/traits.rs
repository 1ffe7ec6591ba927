//! Segmenter trait definition.
//!
//! Defines the interface for splitting a complete reply into relay chunks,
//! enabling pluggable pacing granularities.

use crate::chunking::MAX_CHUNK_SIZE;
use crate::core::Segment;
use crate::error::{ChunkingError, Result};

/// Trait for cutting a complete text into bounded-size segments.
///
/// Implementations must be `Send + Sync` so one segmenter can be shared by
/// every relay session. Output must be deterministic, contiguous and cover
/// the whole input: concatenating the segments reproduces the text exactly.
///
/// # Examples
///
/// ```
/// use chatforge::chunking::{FixedSegmenter, Segmenter};
///
/// let segmenter = FixedSegmenter::with_size(5);
/// let segments = segmenter.segment("hello there").unwrap();
/// assert_eq!(segments.len(), 3);
/// ```
pub trait Segmenter: Send + Sync + std::fmt::Debug {
    /// Segments the input text.
    ///
    /// # Errors
    ///
    /// Returns an error if the segmenter's configuration is invalid.
    fn segment(&self, text: &str) -> Result<Vec<Segment>>;

    /// Returns the name of the segmentation strategy.
    fn name(&self) -> &'static str;

    /// Returns the configured units per segment.
    fn chunk_size(&self) -> usize;

    /// Returns a description of the segmentation strategy.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Validates configuration before segmenting.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk size is zero or above [`MAX_CHUNK_SIZE`].
    fn validate(&self) -> Result<()> {
        let size = self.chunk_size();
        if size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "chunk_size must be > 0".to_string(),
            }
            .into());
        }
        if size > MAX_CHUNK_SIZE {
            return Err(ChunkingError::ChunkTooLarge {
                size,
                max: MAX_CHUNK_SIZE,
            }
            .into());
        }
        Ok(())
    }
}

/// Turns a sequence of unit start offsets into contiguous segments of
/// `size` units each.
///
/// `starts` must yield ascending byte offsets of every unit in `text`.
pub(crate) fn group_units<I>(text: &str, starts: I, size: usize) -> Vec<Segment>
where
    I: Iterator<Item = usize>,
{
    let mut segments = Vec::new();
    let mut segment_start = 0;

    for (count, offset) in starts.enumerate() {
        if count > 0 && count % size == 0 {
            segments.push(Segment::new(segment_start..offset, segments.len()));
            segment_start = offset;
        }
    }

    if segment_start < text.len() {
        segments.push(Segment::new(segment_start..text.len(), segments.len()));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::FixedSegmenter;

    #[derive(Debug)]
    struct WholeText;

    impl Segmenter for WholeText {
        fn segment(&self, text: &str) -> Result<Vec<Segment>> {
            Ok(vec![Segment::new(0..text.len(), 0)])
        }

        fn name(&self) -> &'static str {
            "whole"
        }

        fn chunk_size(&self) -> usize {
            usize::MAX
        }
    }

    #[test]
    fn test_default_description() {
        assert_eq!(WholeText.description(), "No description available");
    }

    #[test]
    fn test_validate_rejects_oversized() {
        assert!(WholeText.validate().is_err());
    }

    #[test]
    fn test_validate_zero_size() {
        assert!(FixedSegmenter::with_size(0).validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        assert!(FixedSegmenter::with_size(30).validate().is_ok());
    }

    #[test]
    fn test_group_units_exact_multiple() {
        let text = "abcdef";
        let segments = group_units(text, text.char_indices().map(|(i, _)| i), 3);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].byte_range, 0..3);
        assert_eq!(segments[1].byte_range, 3..6);
        assert_eq!(segments[1].index, 1);
    }

    #[test]
    fn test_group_units_empty() {
        assert!(group_units("", std::iter::empty(), 4).is_empty());
    }
}
