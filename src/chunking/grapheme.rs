//! Grapheme-aware segmentation strategy.
//!
//! Counts user-perceived characters (extended grapheme clusters) instead of
//! scalar values, so emoji sequences and combining marks reach the client in
//! one piece.

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::chunking::traits::{Segmenter, group_units};
use crate::core::Segment;
use crate::error::Result;
use unicode_segmentation::UnicodeSegmentation;

/// Segmenter counting grapheme clusters.
///
/// # Examples
///
/// ```
/// use chatforge::chunking::{GraphemeSegmenter, Segmenter};
///
/// let segmenter = GraphemeSegmenter::with_size(1);
/// let text = "e\u{301}x";
/// let segments = segmenter.segment(text).unwrap();
/// assert_eq!(segments[0].slice(text), "e\u{301}");
/// ```
#[derive(Debug, Clone)]
pub struct GraphemeSegmenter {
    /// Grapheme clusters per segment.
    chunk_size: usize,
}

impl Default for GraphemeSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphemeSegmenter {
    /// Creates a grapheme segmenter with the default size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Creates a grapheme segmenter with a custom size.
    #[must_use]
    pub const fn with_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Segmenter for GraphemeSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<Segment>> {
        self.validate()?;

        Ok(group_units(
            text,
            text.grapheme_indices(true).map(|(offset, _)| offset),
            self.chunk_size,
        ))
    }

    fn name(&self) -> &'static str {
        "grapheme"
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn description(&self) -> &'static str {
        "Fixed number of grapheme clusters per chunk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grapheme_segmenter_ascii_matches_fixed() {
        let text = "hello there";
        let segments = GraphemeSegmenter::with_size(5).segment(text).unwrap();
        let parts: Vec<&str> = segments.iter().map(|s| s.slice(text)).collect();
        assert_eq!(parts, vec!["hello", " ther", "e"]);
    }

    #[test]
    fn test_grapheme_segmenter_keeps_emoji_sequence() {
        // Family emoji: several scalar values joined by ZWJ
        let text = "ab\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}cd";
        let segments = GraphemeSegmenter::with_size(3).segment(text).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0].slice(text),
            "ab\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}"
        );
        assert_eq!(segments[1].slice(text), "cd");
    }

    #[test]
    fn test_grapheme_segmenter_crlf_is_one_unit() {
        let text = "a\r\nb";
        let segments = GraphemeSegmenter::with_size(2).segment(text).unwrap();
        assert_eq!(segments[0].slice(text), "a\r\n");
        assert_eq!(segments[1].slice(text), "b");
    }

    #[test]
    fn test_grapheme_segmenter_empty() {
        assert!(GraphemeSegmenter::new().segment("").unwrap().is_empty());
    }

    #[test]
    fn test_grapheme_segmenter_name() {
        let segmenter = GraphemeSegmenter::new();
        assert_eq!(segmenter.name(), "grapheme");
        assert!(!segmenter.description().is_empty());
    }
}
