//! Chunk representation for chatforge.
//!
//! Two kinds of chunk live here: [`Segment`], a position within a complete
//! text produced by a segmenter, and [`StreamChunk`], the unit the relay
//! actually puts on the wire.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A contiguous slice of a complete text, selected by a segmenter.
///
/// Segments carry byte offsets rather than owned content so that the relay
/// holds at most one chunk of copied text in flight.
///
/// # Examples
///
/// ```
/// use chatforge::core::Segment;
///
/// let text = "hello there";
/// let segment = Segment::new(0..5, 0);
/// assert_eq!(segment.slice(text), "hello");
/// assert_eq!(segment.size(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Byte range in the source text. Always on character boundaries.
    pub byte_range: Range<usize>,

    /// Sequential index within the text (0-based).
    pub index: usize,
}

impl Segment {
    /// Creates a new segment.
    #[must_use]
    pub const fn new(byte_range: Range<usize>, index: usize) -> Self {
        Self { byte_range, index }
    }

    /// Returns the segment size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.byte_range.end - self.byte_range.start
    }

    /// Checks if the segment is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the start byte offset in the source text.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.byte_range.start
    }

    /// Returns the end byte offset in the source text.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.byte_range.end
    }

    /// Borrows this segment's text out of `source`.
    ///
    /// Returns an empty string if the range does not fit `source`.
    #[must_use]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.byte_range.clone()).unwrap_or_default()
    }
}

/// One unit emitted by the relay.
///
/// All `Token` chunks of a session precede its single terminal `Done`.
/// On the wire they serialize as `{"token": "..."}` and `{"done": true}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// A text fragment to append to the client's buffer.
    Token(String),
    /// End of the session; no further chunks follow.
    Done,
}

#[derive(Serialize, Deserialize)]
struct WireChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    done: bool,
}

impl StreamChunk {
    /// Creates a token chunk.
    #[must_use]
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }

    /// Returns `true` for the terminal chunk.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the token payload, if any.
    #[must_use]
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text),
            Self::Done => None,
        }
    }

    /// Serializes the chunk to its JSON wire form.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for StreamChunk {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Token(text) => WireChunk {
                token: Some(text.clone()),
                done: false,
            },
            Self::Done => WireChunk {
                token: None,
                done: true,
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreamChunk {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireChunk::deserialize(deserializer)?;
        match (wire.token, wire.done) {
            (Some(text), false) => Ok(Self::Token(text)),
            (None, true) => Ok(Self::Done),
            _ => Err(serde::de::Error::custom(
                "stream chunk must carry exactly one of `token` or `done`",
            )),
        }
    }
}

/// Concatenates the token payloads of `chunks` in order.
#[must_use]
pub fn concat_tokens(chunks: &[StreamChunk]) -> String {
    chunks.iter().filter_map(StreamChunk::as_token).collect()
}
