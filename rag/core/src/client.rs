//! Client facade
//!
//! [`RagClient`] wires the components of one chat session together: the
//! conversation store, the status board and its poller, the query
//! orchestrator, the unlock flow, preferences and the content catalog.
//! Surfaces only talk to this type.

use std::sync::Arc;

use tokio::sync::watch;

use crate::analytics::{self, AnalyticsSink};
use crate::api::RagApi;
use crate::catalog::ContentCatalog;
use crate::config::RagClientConfig;
use crate::conversation::ConversationStore;
use crate::messages::Message;
use crate::orchestrator::{QueryOrchestrator, SubmitRejected, Submission};
use crate::poller::StatusPoller;
use crate::preferences::{PreferenceStore, Preferences};
use crate::status::{StatusBoard, StatusSnapshot, TierState};
use crate::storage::SessionStorage;
use crate::unlock::{UnlockError, UnlockFlow};

/// One chat session against a RAG backend
pub struct RagClient<A: ?Sized> {
    board: StatusBoard,
    conversation: Arc<ConversationStore>,
    orchestrator: QueryOrchestrator<A>,
    unlock: UnlockFlow<A>,
    poller: StatusPoller<A>,
    preferences: PreferenceStore,
    catalog: Arc<ContentCatalog>,
}

impl<A: RagApi + ?Sized + 'static> RagClient<A> {
    /// Build a session and hydrate its history from `storage`
    ///
    /// `analytics` only receives events when the configured environment is
    /// production. Polling does not begin until [`start`](Self::start).
    pub async fn open(
        api: Arc<A>,
        storage: Arc<dyn SessionStorage>,
        config: &RagClientConfig,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let analytics = analytics::for_environment(config.environment, analytics);
        let board = StatusBoard::new();
        let conversation = Arc::new(
            ConversationStore::open(Arc::clone(&storage), config.storage.history_key.clone())
                .await,
        );

        let orchestrator = QueryOrchestrator::new(
            Arc::clone(&api),
            Arc::clone(&conversation),
            board.clone(),
            Arc::clone(&analytics),
        );
        let unlock = UnlockFlow::new(Arc::clone(&api), board.clone(), analytics);
        let poller = StatusPoller::new(api, board.clone(), &config.poller);
        let preferences = PreferenceStore::new(storage, config.storage.preferences_key.clone());

        tracing::info!(
            session = %config.storage.session_id,
            messages = conversation.len(),
            environment = ?config.environment,
            "Chat session opened"
        );

        Self {
            board,
            conversation,
            orchestrator,
            unlock,
            poller,
            preferences,
            catalog: Arc::new(ContentCatalog::new()),
        }
    }

    /// Begin status polling
    pub fn start(&mut self) {
        self.poller.start();
    }

    /// Stop status polling; in-flight queries still complete
    pub fn shutdown(&mut self) {
        self.poller.stop();
    }

    /// Submit a question; see [`QueryOrchestrator::submit`]
    ///
    /// # Errors
    ///
    /// The reason the submission was refused.
    pub fn submit(&self, question: &str) -> Result<Submission, SubmitRejected> {
        self.orchestrator.submit(question)
    }

    /// Try an access code; see [`UnlockFlow::unlock`]
    ///
    /// # Errors
    ///
    /// The reason the unlock failed.
    pub async fn unlock(&self, code: &str) -> Result<TierState, UnlockError> {
        self.unlock.unlock(code).await
    }

    /// Refresh tier and availability now
    pub async fn refresh_status(&self) -> bool {
        self.poller.refresh_now().await
    }

    /// The conversation in order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.conversation.all()
    }

    /// Drop the whole history
    pub async fn clear_history(&self) {
        self.conversation.clear().await;
    }

    /// Current tier and availability
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        self.board.snapshot()
    }

    /// Follow tier and availability changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.board.subscribe()
    }

    /// Stored display preferences
    pub async fn preferences(&self) -> Preferences {
        self.preferences.load().await
    }

    /// Toggle citation display and persist it
    pub async fn set_show_citations(&self, show: bool) -> Preferences {
        let mut preferences = self.preferences.load().await;
        preferences.show_citations = show;
        self.preferences.save(&preferences).await;
        preferences
    }

    /// The content catalog; initialize it before resolving citations
    #[must_use]
    pub fn catalog(&self) -> &Arc<ContentCatalog> {
        &self.catalog
    }

    /// The query orchestrator
    #[must_use]
    pub fn orchestrator(&self) -> &QueryOrchestrator<A> {
        &self.orchestrator
    }

    /// The unlock flow
    #[must_use]
    pub fn unlock_flow(&self) -> &UnlockFlow<A> {
        &self.unlock
    }
}
