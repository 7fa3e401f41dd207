//! Query Orchestrator
//!
//! Drives one user question through its lifecycle:
//!
//! ```text
//! Idle ──submit──► Submitting ──ok──► Succeeded
//!                      │
//!                      └──err──► Failed
//! ```
//!
//! # Submission
//!
//! [`QueryOrchestrator::submit`] is synchronous. When accepted it appends the
//! user message and a pending reply placeholder before returning, then spawns
//! the request. Rejections (blank input, a query already in flight, the
//! service disabled, the hourly allowance used up) leave the conversation
//! untouched and issue no network call.
//!
//! # Completion
//!
//! The spawned task always runs to completion, even if every handle to the
//! orchestrator is gone. On completion it finalizes the placeholder keyed by
//! its own request id, persists the conversation, leaves `Submitting`, emits
//! one analytics event and refreshes tier/status. Neither a failing analytics
//! sink nor a refresh failure changes the outcome.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::analytics::{emit_guarded, AnalyticsEvent, AnalyticsSink};
use crate::api::{QueryOptions, QueryRequest, RagApi};
use crate::conversation::ConversationStore;
use crate::error::ErrorKind;
use crate::messages::{Message, MessageId, RequestId};
use crate::poller::refresh_status;
use crate::status::{Gate, StatusBoard};

/// Lifecycle phase of the most recent query
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryPhase {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Request in flight
    Submitting {
        /// The in-flight request
        request_id: RequestId,
    },
    /// Last query answered
    Succeeded {
        /// The answered request
        request_id: RequestId,
    },
    /// Last query failed
    Failed {
        /// The failed request
        request_id: RequestId,
        /// Why it failed
        kind: ErrorKind,
    },
}

impl QueryPhase {
    /// Whether a query is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }
}

/// Why a submission was refused
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SubmitRejected {
    /// Question is empty after trimming
    #[error("Question is empty")]
    EmptyInput,

    /// Another query is still in flight
    #[error("A query is already in progress")]
    InFlight,

    /// Hourly allowance used up
    #[error("Query limit reached for this hour")]
    LimitReached,

    /// Kill switch is off
    #[error("The assistant is currently disabled")]
    ServiceDisabled,
}

/// Terminal result of one query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Answer appended
    Succeeded {
        /// Id of the assistant message
        message_id: MessageId,
        /// Number of citations on the answer
        citation_count: usize,
        /// Whether the backend served it from cache
        cached: bool,
    },
    /// Error message appended
    Failed {
        /// Id of the assistant message
        message_id: MessageId,
        /// Failure kind
        kind: ErrorKind,
    },
}

impl QueryOutcome {
    /// Id of the assistant message written for this query
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Succeeded { message_id, .. } | Self::Failed { message_id, .. } => message_id,
        }
    }

    /// Whether the query failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// An accepted query
#[derive(Debug)]
pub struct Submission {
    /// Id of the request
    pub request_id: RequestId,
    /// Id of the user message appended for it
    pub user_message_id: MessageId,
    handle: JoinHandle<QueryOutcome>,
}

impl Submission {
    /// Wait for the query to reach a terminal state
    ///
    /// Dropping the submission instead does not cancel the query.
    ///
    /// # Errors
    ///
    /// Returns the [`JoinError`] if the query task panicked or the runtime
    /// shut down first.
    pub async fn outcome(self) -> Result<QueryOutcome, JoinError> {
        self.handle.await
    }
}

struct Inner<A: ?Sized> {
    api: Arc<A>,
    conversation: Arc<ConversationStore>,
    board: StatusBoard,
    analytics: Arc<dyn AnalyticsSink>,
    options: QueryOptions,
    phase: Mutex<QueryPhase>,
}

/// Single-flight driver of user queries
pub struct QueryOrchestrator<A: ?Sized> {
    inner: Arc<Inner<A>>,
}

impl<A: ?Sized> Clone for QueryOrchestrator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: RagApi + ?Sized + 'static> QueryOrchestrator<A> {
    /// Create an idle orchestrator
    pub fn new(
        api: Arc<A>,
        conversation: Arc<ConversationStore>,
        board: StatusBoard,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self::with_options(api, conversation, board, analytics, QueryOptions::default())
    }

    /// Create an idle orchestrator forwarding `options` with every query
    pub fn with_options(
        api: Arc<A>,
        conversation: Arc<ConversationStore>,
        board: StatusBoard,
        analytics: Arc<dyn AnalyticsSink>,
        options: QueryOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                conversation,
                board,
                analytics,
                options,
                phase: Mutex::new(QueryPhase::Idle),
            }),
        }
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> QueryPhase {
        self.inner.phase.lock().clone()
    }

    /// Whether a query is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.phase.lock().is_submitting()
    }

    /// Submit a question
    ///
    /// On success the user message and the reply placeholder are already in
    /// the conversation when this returns. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitRejected`] reason, in which case nothing was
    /// appended and no request was issued.
    pub fn submit(&self, question: &str) -> Result<Submission, SubmitRejected> {
        let query = question.trim();
        if query.is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }

        match self.inner.board.gate() {
            Gate::Open => {}
            Gate::ServiceDisabled => return Err(SubmitRejected::ServiceDisabled),
            Gate::LimitReached => return Err(SubmitRejected::LimitReached),
        }

        let request_id = RequestId::new();
        {
            let mut phase = self.inner.phase.lock();
            if phase.is_submitting() {
                return Err(SubmitRejected::InFlight);
            }
            *phase = QueryPhase::Submitting { request_id };
        }

        let user_message = Message::user(query);
        let user_message_id = user_message.id.clone();
        self.inner.conversation.append(user_message);
        self.inner
            .conversation
            .append(Message::pending_reply(&request_id));

        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let handle = tokio::spawn(async move { inner.complete(request_id, query).await });

        Ok(Submission {
            request_id,
            user_message_id,
            handle,
        })
    }
}

impl<A: RagApi + ?Sized> Inner<A> {
    async fn complete(&self, request_id: RequestId, query: String) -> QueryOutcome {
        let started = Instant::now();
        self.conversation.flush().await;

        let request = QueryRequest {
            query,
            options: self.options.clone(),
        };
        debug!(
            api = self.api.name(),
            request_id = %request_id,
            query_length = request.query.chars().count(),
            "Submitting query"
        );
        let result = self.api.submit_query(&request).await;
        let elapsed = started.elapsed();

        let reply_id = MessageId::reply_to(&request_id);
        let (final_message, outcome) = match result {
            Ok(answer) => {
                let outcome = QueryOutcome::Succeeded {
                    message_id: reply_id.clone(),
                    citation_count: answer.citations.len(),
                    cached: answer.cached,
                };
                let message =
                    Message::answer(reply_id.clone(), answer.answer, answer.citations, answer.cached);
                (message, outcome)
            }
            Err(kind) => {
                warn!(request_id = %request_id, kind = kind.code(), "Query failed");
                let outcome = QueryOutcome::Failed {
                    message_id: reply_id.clone(),
                    kind: kind.clone(),
                };
                (Message::failure(reply_id.clone(), kind), outcome)
            }
        };

        let citation_count = final_message.citation_count();
        if let Err(e) = self.conversation.replace_pending(&reply_id, final_message) {
            debug!(request_id = %request_id, error = %e, "Reply discarded");
        }
        self.conversation.flush().await;

        {
            let mut phase = self.phase.lock();
            if *phase == (QueryPhase::Submitting { request_id }) {
                *phase = match &outcome {
                    QueryOutcome::Succeeded { .. } => QueryPhase::Succeeded { request_id },
                    QueryOutcome::Failed { kind, .. } => QueryPhase::Failed {
                        request_id,
                        kind: kind.clone(),
                    },
                };
            }
        }

        emit_guarded(
            self.analytics.as_ref(),
            AnalyticsEvent::RagQuery {
                query_length: request.query.chars().count(),
                response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                citation_count,
                tier: self.board.tier().map(|t| t.tier),
                is_error: outcome.is_error(),
            },
        );

        refresh_status(self.api.as_ref(), &self.board).await;
        outcome
    }
}
