//! Conversation Store
//!
//! Ordered, append-only message log for one session, mirrored to
//! [`SessionStorage`] so the conversation survives a reload.
//!
//! # Guarantees
//!
//! - In-memory operations are synchronous and never fail because of storage.
//! - [`ConversationStore::hydrate`] never fails: missing or corrupt data
//!   yields an empty conversation.
//! - [`ConversationStore::persist`] is best-effort: quota and serialization
//!   failures are logged and swallowed. The in-memory log stays
//!   authoritative for the running session.
//! - Pending placeholders are never written; a reload mid-query shows the
//!   question without a dangling reply.
//!
//! Every mutation bumps a generation counter. [`ConversationStore::flush`]
//! writes the current log only if it is newer than what was last written, so
//! concurrent flushes can never leave an older snapshot on disk.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::messages::{Message, MessageId, MessageStatus};
use crate::storage::SessionStorage;

/// Errors finalizing a placeholder
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    /// No message with this id (e.g. the history was cleared meanwhile)
    #[error("No message with id {0}")]
    NotFound(MessageId),

    /// The message exists but was already finalized
    #[error("Message {0} is not pending")]
    NotPending(MessageId),
}

#[derive(Debug, Default)]
struct Log {
    messages: Vec<Message>,
    generation: u64,
}

/// Session conversation history
pub struct ConversationStore {
    log: Mutex<Log>,
    storage: Arc<dyn SessionStorage>,
    key: String,
    /// Generation of the last snapshot handed to storage
    written: tokio::sync::Mutex<u64>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("key", &self.key)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Create an empty store backed by `storage` under `key`
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            log: Mutex::new(Log::default()),
            storage,
            key: key.into(),
            written: tokio::sync::Mutex::new(0),
        }
    }

    /// Create a store and hydrate it from storage
    pub async fn open(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let store = Self::new(storage, key);
        let messages = store.hydrate().await;
        debug!(key = %store.key, count = messages.len(), "Conversation hydrated");
        store.log.lock().messages = messages;
        store
    }

    /// Storage key of the snapshot
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a message at the end of the conversation
    pub fn append(&self, message: Message) {
        let mut log = self.log.lock();
        log.messages.push(message);
        log.generation += 1;
    }

    /// Finalize the pending placeholder `id` with `final_message`
    ///
    /// The final message keeps the placeholder's id and position.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] if no message has this id,
    /// [`ConversationError::NotPending`] if it was already finalized.
    pub fn replace_pending(
        &self,
        id: &MessageId,
        mut final_message: Message,
    ) -> Result<(), ConversationError> {
        let mut log = self.log.lock();
        let slot = log
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| ConversationError::NotFound(id.clone()))?;

        if !slot.is_pending() {
            return Err(ConversationError::NotPending(id.clone()));
        }

        final_message.id = id.clone();
        final_message.status = MessageStatus::Finalized;
        *slot = final_message;
        log.generation += 1;
        Ok(())
    }

    /// The conversation in order
    #[must_use]
    pub fn all(&self) -> Vec<Message> {
        self.log.lock().messages.clone()
    }

    /// Look up one message
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<Message> {
        self.log.lock().messages.iter().find(|m| &m.id == id).cloned()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().messages.len()
    }

    /// Whether the conversation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().messages.is_empty()
    }

    /// Read the stored snapshot; empty on absence or any failure
    pub async fn hydrate(&self) -> Vec<Message> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Conversation snapshot unreadable");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => messages.into_iter().filter(|m| !m.is_pending()).collect(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Conversation snapshot corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Write `sequence` as the stored snapshot, best-effort
    pub async fn persist(&self, sequence: &[Message]) {
        self.write(sequence).await;
    }

    /// Persist the current log if it changed since the last successful write
    ///
    /// A failed write is retried by the next flush.
    pub async fn flush(&self) {
        let mut written = self.written.lock().await;
        let (generation, snapshot) = {
            let log = self.log.lock();
            (log.generation, log.messages.clone())
        };
        if generation <= *written {
            return;
        }
        if self.write(&snapshot).await {
            *written = generation;
        }
    }

    /// Whether the snapshot reached storage
    async fn write(&self, sequence: &[Message]) -> bool {
        let finalized: Vec<&Message> = sequence.iter().filter(|m| !m.is_pending()).collect();

        let json = match serde_json::to_string(&finalized) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    key = %self.key,
                    kind = ErrorKind::StorageFailure.code(),
                    error = %e,
                    "Conversation snapshot not serializable"
                );
                return false;
            }
        };

        match self.storage.set(&self.key, &json).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    key = %self.key,
                    kind = ErrorKind::StorageFailure.code(),
                    error = %e,
                    "Conversation snapshot not saved"
                );
                false
            }
        }
    }

    /// Drop the whole history, in memory and in storage
    pub async fn clear(&self) {
        let mut written = self.written.lock().await;
        let generation = {
            let mut log = self.log.lock();
            log.messages.clear();
            log.generation += 1;
            log.generation
        };
        if let Err(e) = self.storage.remove(&self.key).await {
            warn!(key = %self.key, error = %e, "Conversation snapshot not removed");
        }
        *written = generation;
        debug!(key = %self.key, "Conversation cleared");
    }
}
