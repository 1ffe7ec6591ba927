//! Chat sessions.
//!
//! A [`ChatService`] ties the generator, the relay and the history store
//! together. The user message is recorded before generation starts; the
//! assistant reply is recorded only when the relay completed. Storage
//! failures are logged and never reach the client.

use crate::core::{ChatMessage, ChatTurn, Role, StreamChunk, concat_tokens};
use crate::error::{Error, StorageError};
use crate::generation::Generator;
use crate::relay::{ChunkSink, RelayOutcome, RelayPolicy, relay};
use crate::storage::SharedStorage;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel capacity used when collecting a whole reply.
const REPLY_BUFFER: usize = 64;

/// How a reply reaches the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Chunk by chunk over a sink.
    Streaming,
    /// One complete reply.
    #[default]
    Whole,
}

impl DeliveryMode {
    /// Picks streaming when the client asked for it explicitly or accepts
    /// server-sent events.
    #[must_use]
    pub const fn negotiate(stream_flag: bool, accepts_event_stream: bool) -> Self {
        if stream_flag || accepts_event_stream {
            Self::Streaming
        } else {
            Self::Whole
        }
    }
}

/// A whole reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply text, or the placeholder when generation failed.
    pub text: String,
    /// Whether the upstream failed.
    pub failed: bool,
}

/// Runs chat turns against a generator.
#[derive(Clone)]
pub struct ChatService {
    generator: Arc<dyn Generator>,
    storage: Option<SharedStorage>,
    policy: RelayPolicy,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("generator", &self.generator.name())
            .field("storage", &self.storage.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ChatService {
    /// Creates a service without history.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, policy: RelayPolicy) -> Self {
        Self {
            generator,
            storage: None,
            policy,
        }
    }

    /// Attaches a history store.
    #[must_use]
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Returns the relay policy used for streaming delivery.
    #[must_use]
    pub const fn policy(&self) -> &RelayPolicy {
        &self.policy
    }

    /// Streams a reply to `sink`.
    pub async fn respond<S: ChunkSink>(&self, turn: &ChatTurn, sink: S) -> RelayOutcome {
        self.run(turn, sink, &self.policy).await
    }

    /// Produces a whole reply.
    ///
    /// Runs the same relay as [`Self::respond`] without pacing and joins the
    /// tokens, so failure handling and persistence are identical.
    pub async fn reply(&self, turn: &ChatTurn) -> Reply {
        let (tx, mut rx) = mpsc::channel(REPLY_BUFFER);
        let policy = self.policy.clone().immediate();

        let collect = async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = rx.recv().await {
                if chunk == StreamChunk::Done {
                    break;
                }
                chunks.push(chunk);
            }
            chunks
        };

        let (outcome, chunks) = tokio::join!(self.run(turn, tx, &policy), collect);
        Reply {
            text: concat_tokens(&chunks),
            failed: outcome.is_failed(),
        }
    }

    async fn run<S: ChunkSink>(&self, turn: &ChatTurn, sink: S, policy: &RelayPolicy) -> RelayOutcome {
        let prompt = turn.last();
        tracing::debug!(
            owner = %turn.owner_id(),
            turns = turn.turn_count(),
            generator = self.generator.name(),
            "chat turn started"
        );

        self.persist(ChatMessage::new(
            turn.owner_id().to_string(),
            prompt.role,
            prompt.content.clone(),
        ))
        .await;

        let generator = Arc::clone(&self.generator);
        let text = prompt.content.clone();
        let upstream = async move { generator.generate(&text).await };

        let outcome = relay(upstream, sink, policy).await;

        match &outcome {
            RelayOutcome::Completed { text, chunks } => {
                tracing::debug!(owner = %turn.owner_id(), chunks, "chat turn completed");
                self.persist(ChatMessage::new(
                    turn.owner_id().to_string(),
                    Role::Assistant,
                    text.clone(),
                ))
                .await;
            }
            RelayOutcome::Failed { error, .. } => {
                tracing::info!(owner = %turn.owner_id(), error = %error, "chat turn failed");
            }
            RelayOutcome::Disconnected { chunks } => {
                tracing::info!(owner = %turn.owner_id(), chunks, "client left mid-reply");
            }
        }

        outcome
    }

    async fn persist(&self, message: ChatMessage) {
        let Some(storage) = self.storage.clone() else {
            return;
        };
        let role = message.role;

        let result = tokio::task::spawn_blocking(move || {
            let mut storage = storage
                .lock()
                .map_err(|_| Error::from(StorageError::Poisoned))?;
            storage.record(&message)
        })
        .await;

        match result {
            Ok(Ok(id)) => tracing::debug!(id, role = %role, "message recorded"),
            Ok(Err(e)) => tracing::warn!(error = %e, role = %role, "failed to record message"),
            Err(e) => tracing::warn!(error = %e, role = %role, "history task aborted"),
        }
    }
}
