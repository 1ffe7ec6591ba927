//! Chunk sink abstraction.
//!
//! The relay writes chunks to a [`ChunkSink`] and watches it for closure.
//! The server wires an mpsc channel whose receiver feeds the SSE body, so a
//! dropped HTTP connection shows up here as a closed sink.

use crate::core::StreamChunk;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// The receiving side of a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("chunk sink closed")]
pub struct SinkClosed;

/// Destination for relay output.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Delivers one chunk, waiting for capacity if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] if the receiver has been dropped.
    async fn send(&self, chunk: StreamChunk) -> Result<(), SinkClosed>;

    /// Resolves once the receiver has been dropped.
    async fn closed(&self);
}

#[async_trait]
impl ChunkSink for mpsc::Sender<StreamChunk> {
    async fn send(&self, chunk: StreamChunk) -> Result<(), SinkClosed> {
        Self::send(self, chunk).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        Self::closed(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (tx, mut rx) = mpsc::channel(4);
        ChunkSink::send(&tx, StreamChunk::token("a")).await.unwrap();
        ChunkSink::send(&tx, StreamChunk::Done).await.unwrap();
        assert_eq!(rx.recv().await, Some(StreamChunk::token("a")));
        assert_eq!(rx.recv().await, Some(StreamChunk::Done));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closure() {
        let (tx, rx) = mpsc::channel::<StreamChunk>(4);
        drop(rx);
        assert_eq!(
            ChunkSink::send(&tx, StreamChunk::Done).await,
            Err(SinkClosed)
        );
        // Resolves immediately once the receiver is gone
        ChunkSink::closed(&tx).await;
    }
}
