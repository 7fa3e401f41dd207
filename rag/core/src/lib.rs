//! RAG Core - Headless Query Client for the RAG Assistant
//!
//! This crate holds the client-side orchestration of question/answer
//! exchanges with a retrieval-augmented generation backend, independent of
//! any UI. It can drive a terminal surface, a web front-end or run headless
//! in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Surfaces                            │
//! │            rag-chat (terminal)  /  headless tests            │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                          RagClient                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐ │
//! │  │    Query     │  │    Unlock    │  │   Status Poller     │ │
//! │  │ Orchestrator │  │     Flow     │  │  (every 30 s)       │ │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────┬──────────┘ │
//! │         │                 │                     │            │
//! │  ┌──────┴───────┐  ┌──────┴─────────────────────┴──────────┐ │
//! │  │ Conversation │  │             Status Board              │ │
//! │  │    Store     │  │      (tier + kill switch, watch)      │ │
//! │  └──────┬───────┘  └───────────────────────────────────────┘ │
//! │         │                                                    │
//! │  ┌──────┴───────┐  ┌───────────────────────────────────────┐ │
//! │  │   Session    │  │        RagApi (HTTP transport)        │ │
//! │  │   Storage    │  │                                       │ │
//! │  └──────────────┘  └───────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`RagClient`]: One chat session; the only type surfaces need
//! - [`QueryOrchestrator`]: Single-flight query lifecycle
//! - [`ConversationStore`]: Ordered message log with best-effort persistence
//! - [`StatusBoard`]: Shared tier and availability state
//! - [`RagApi`]: Backend seam, implemented over HTTP by [`HttpRagClient`]
//! - [`ErrorKind`]: Closed set of user-visible failures
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rag_core::{
//!     load_config, FileStorage, HttpRagClient, RagClient, TracingAnalytics,
//! };
//!
//! let config = load_config()?;
//! let api = Arc::new(HttpRagClient::new(&config.api)?);
//! let storage = Arc::new(FileStorage::new(&config.storage.dir, &config.storage.session_id));
//! let mut client = RagClient::open(api, storage, &config, Arc::new(TracingAnalytics)).await;
//! client.start();
//!
//! let submission = client.submit("Tell me about Mickey Mouse")?;
//! let outcome = submission.outcome().await?;
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: Backend trait, HTTP implementation and wire format
//! - [`analytics`]: Fire-and-forget usage events
//! - [`catalog`]: Initialize-once content lookup for citations
//! - [`client`]: Session facade
//! - [`config`]: Layered configuration (defaults, TOML, env, CLI)
//! - [`conversation`]: Conversation store
//! - [`error`]: Error taxonomy and status mapping
//! - [`messages`]: Messages and citations
//! - [`orchestrator`]: Query lifecycle
//! - [`poller`]: Periodic tier/status refresh
//! - [`preferences`]: Display preferences
//! - [`status`]: Tier, availability and the status board
//! - [`storage`]: Session-scoped key/value storage
//! - [`unlock`]: Premium access-code flow

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analytics;
pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod poller;
pub mod preferences;
pub mod status;
pub mod storage;
pub mod unlock;

// Re-exports for convenience
pub use analytics::{AnalyticsEvent, AnalyticsSink, NoopAnalytics, TracingAnalytics};
pub use api::{HttpRagClient, QueryOptions, QueryRequest, QueryResult, RagApi};
pub use catalog::{CatalogEntry, CatalogError, ContentCatalog};
pub use client::RagClient;
pub use conversation::{ConversationError, ConversationStore};
pub use error::ErrorKind;
pub use messages::{
    Citation, ContentId, ContentType, Message, MessageId, MessageStatus, RequestId, Role,
};
pub use orchestrator::{QueryOrchestrator, QueryOutcome, QueryPhase, SubmitRejected, Submission};
pub use poller::{refresh_status, StatusPoller};
pub use preferences::{PreferenceStore, Preferences};
pub use status::{
    Gate, ServiceAvailability, StatusBoard, StatusSnapshot, StatusUpdate, Tier, TierState,
};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use unlock::{UnlockError, UnlockFlow};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, Environment, RagClientConfig,
};
