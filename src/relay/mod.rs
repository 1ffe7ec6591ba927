//! Streaming relay.
//!
//! Forwards generated text to a client chunk by chunk. A complete reply is
//! cut by the policy's segmenter and paced out with a fixed delay; an
//! incremental reply is forwarded fragment by fragment as it arrives. Every
//! session ends with exactly one [`StreamChunk::Done`] unless the client
//! went away first. Upstream failures become a single placeholder token.

pub mod session;
pub mod sink;

pub use session::{ChatService, DeliveryMode, Reply};
pub use sink::{ChunkSink, SinkClosed};

use crate::chunking::{Segmenter, create_segmenter, default_segmenter};
use crate::core::{Segment, StreamChunk};
use crate::error::{GenerationError, Result};
use crate::generation::{Generation, TextStream};
use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Token sent in place of a reply when generation fails.
pub const DEFAULT_PLACEHOLDER: &str = "🤖 Model API error";

/// Default pause after each paced chunk.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(40);

/// How a relay session cuts, paces and substitutes output.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    /// Segmenter applied to complete replies.
    pub segmenter: Arc<dyn Segmenter>,
    /// Pause after each chunk of a complete reply. Zero disables pacing.
    pub delay: Duration,
    /// Token emitted when the upstream fails.
    pub placeholder: String,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            segmenter: Arc::new(default_segmenter()),
            delay: DEFAULT_CHUNK_DELAY,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl RelayPolicy {
    /// Creates the default policy (30 characters, 40 ms).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the chunk size, keeping the current strategy.
    ///
    /// # Errors
    ///
    /// Returns a chunking error if `size` is zero or too large.
    pub fn with_chunk_size(mut self, size: usize) -> Result<Self> {
        self.segmenter = Arc::from(create_segmenter(self.segmenter.name(), size)?);
        Ok(self)
    }

    /// Replaces the segmenter.
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Sets the pacing delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the failure placeholder.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Disables pacing.
    #[must_use]
    pub const fn immediate(self) -> Self {
        self.with_delay(Duration::ZERO)
    }
}

/// How a relay session ended.
///
/// `chunks` counts the token chunks delivered, placeholder included and the
/// terminal `Done` excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The full reply was delivered.
    Completed {
        /// The assembled reply.
        text: String,
        /// Token chunks delivered.
        chunks: usize,
    },
    /// The upstream failed; the placeholder was delivered.
    Failed {
        /// The upstream failure.
        error: GenerationError,
        /// Token chunks delivered.
        chunks: usize,
    },
    /// The client went away before the session finished.
    Disconnected {
        /// Token chunks delivered before the disconnect.
        chunks: usize,
    },
}

impl RelayOutcome {
    /// Returns the number of token chunks delivered.
    #[must_use]
    pub const fn chunks(&self) -> usize {
        match self {
            Self::Completed { chunks, .. }
            | Self::Failed { chunks, .. }
            | Self::Disconnected { chunks } => *chunks,
        }
    }

    /// Returns the assembled reply of a completed session.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Returns `true` if the full reply was delivered.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns `true` if the upstream failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Writes chunks to a sink while counting them.
struct Emitter<'a, S> {
    sink: S,
    policy: &'a RelayPolicy,
    chunks: usize,
}

impl<S: ChunkSink> Emitter<'_, S> {
    async fn token(&mut self, text: String) -> std::result::Result<(), SinkClosed> {
        self.sink.send(StreamChunk::Token(text)).await?;
        self.chunks += 1;
        Ok(())
    }

    async fn pace(&self) -> std::result::Result<(), SinkClosed> {
        if self.policy.delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            () = self.sink.closed() => Err(SinkClosed),
            () = tokio::time::sleep(self.policy.delay) => Ok(()),
        }
    }

    async fn done(self) -> std::result::Result<usize, SinkClosed> {
        self.sink.send(StreamChunk::Done).await?;
        // The sink is dropped here, ending the client stream
        Ok(self.chunks)
    }

    async fn fail(mut self, error: GenerationError) -> RelayOutcome {
        tracing::warn!(error = %error, "generation failed, sending placeholder");
        let placeholder = self.policy.placeholder.clone();
        if self.token(placeholder).await.is_err() {
            return self.disconnected();
        }
        let delivered = self.chunks;
        match self.done().await {
            Ok(chunks) => RelayOutcome::Failed { error, chunks },
            Err(SinkClosed) => RelayOutcome::Disconnected { chunks: delivered },
        }
    }

    fn disconnected(&self) -> RelayOutcome {
        tracing::debug!(chunks = self.chunks, "client disconnected during relay");
        RelayOutcome::Disconnected {
            chunks: self.chunks,
        }
    }
}

/// Relays one generation to `sink`.
///
/// The sink is consumed and dropped when the session ends. Sink closure at
/// any suspension point (waiting on the upstream, sending, pacing) stops the
/// session with [`RelayOutcome::Disconnected`].
///
/// # Examples
///
/// ```
/// use chatforge::core::{StreamChunk, concat_tokens};
/// use chatforge::generation::Generation;
/// use chatforge::relay::{RelayPolicy, relay};
/// use tokio::sync::mpsc;
///
/// let runtime = tokio::runtime::Builder::new_current_thread()
///     .enable_time()
///     .build()
///     .unwrap();
/// runtime.block_on(async {
///     let policy = RelayPolicy::new().with_chunk_size(5).unwrap().immediate();
///     let (tx, mut rx) = mpsc::channel(16);
///     let upstream = async { Ok(Generation::Complete("hello there".to_string())) };
///
///     let outcome = relay(upstream, tx, &policy).await;
///     assert!(outcome.is_completed());
///
///     let mut chunks = Vec::new();
///     while let Some(chunk) = rx.recv().await {
///         chunks.push(chunk);
///     }
///     assert_eq!(chunks.len(), 4);
///     assert_eq!(concat_tokens(&chunks), "hello there");
///     assert_eq!(chunks.last(), Some(&StreamChunk::Done));
/// });
/// ```
pub async fn relay<F, S>(upstream: F, sink: S, policy: &RelayPolicy) -> RelayOutcome
where
    F: Future<Output = std::result::Result<Generation, GenerationError>> + Send,
    S: ChunkSink,
{
    let emitter = Emitter {
        sink,
        policy,
        chunks: 0,
    };

    let generation = tokio::select! {
        biased;
        () = emitter.sink.closed() => return emitter.disconnected(),
        result = upstream => result,
    };

    match generation {
        Ok(Generation::Complete(text)) => relay_complete(emitter, text).await,
        Ok(Generation::Incremental(stream)) => relay_incremental(emitter, stream).await,
        Err(error) => emitter.fail(error).await,
    }
}

async fn relay_complete<S: ChunkSink>(mut emitter: Emitter<'_, S>, text: String) -> RelayOutcome {
    let segments = emitter.policy.segmenter.segment(&text).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "segmentation failed, sending reply whole");
        vec![Segment::new(0..text.len(), 0)]
    });

    tracing::debug!(
        segmenter = emitter.policy.segmenter.name(),
        segments = segments.len(),
        bytes = text.len(),
        "relaying complete reply"
    );

    let mut pieces = segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.slice(&text).to_string())
        .collect::<Vec<_>>()
        .into_iter()
        .peekable();

    while let Some(piece) = pieces.next() {
        if emitter.token(piece).await.is_err() {
            return emitter.disconnected();
        }
        // The delay separates chunks; `Done` follows the last one at once
        if pieces.peek().is_some() && emitter.pace().await.is_err() {
            return emitter.disconnected();
        }
    }

    let delivered = emitter.chunks;
    match emitter.done().await {
        Ok(chunks) => RelayOutcome::Completed { text, chunks },
        Err(SinkClosed) => RelayOutcome::Disconnected { chunks: delivered },
    }
}

async fn relay_incremental<S: ChunkSink>(
    mut emitter: Emitter<'_, S>,
    mut stream: TextStream,
) -> RelayOutcome {
    let mut text = String::new();

    loop {
        let next = tokio::select! {
            biased;
            () = emitter.sink.closed() => return emitter.disconnected(),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                text.push_str(&fragment);
                if emitter.token(fragment).await.is_err() {
                    return emitter.disconnected();
                }
            }
            Some(Err(error)) => return emitter.fail(error).await,
            None => break,
        }
    }

    let delivered = emitter.chunks;
    match emitter.done().await {
        Ok(chunks) => RelayOutcome::Completed { text, chunks },
        Err(SinkClosed) => RelayOutcome::Disconnected { chunks: delivered },
    }
}
