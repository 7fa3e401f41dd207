//! RAG API Traits
//!
//! The seam between the orchestration core and the backend. Production code
//! talks HTTP through [`super::HttpRagClient`]; tests script responses with
//! their own implementations.
//!
//! Every operation fails with an [`ErrorKind`], never with raw transport
//! errors. Translating statuses into kinds is the implementation's job.

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::messages::{Citation, ContentType};
use crate::status::{ServiceAvailability, TierState};

/// Optional retrieval knobs forwarded with a query
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of sources to retrieve
    pub top_k: Option<u32>,
    /// Restrict retrieval to these content types
    pub content_types: Option<Vec<ContentType>>,
}

/// A question to send to the backend
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// The question, already trimmed and non-empty
    pub query: String,
    /// Retrieval options
    pub options: QueryOptions,
}

impl QueryRequest {
    /// Create a request with default options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: QueryOptions::default(),
        }
    }

    /// Set the number of sources to retrieve
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.options.top_k = Some(top_k);
        self
    }

    /// Restrict retrieval to the given content types
    #[must_use]
    pub fn with_content_types(mut self, content_types: Vec<ContentType>) -> Self {
        self.options.content_types = Some(content_types);
        self
    }
}

/// A successful answer
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    /// Synthesized answer text
    pub answer: String,
    /// Sources backing the answer
    pub citations: Vec<Citation>,
    /// The question as the server understood it
    pub query: String,
    /// Whether the answer came from the server's cache
    pub cached: bool,
}

/// RAG backend operations
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Ask a question
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResult, ErrorKind>;

    /// Read the kill switch; fails only with [`ErrorKind::Unknown`]
    async fn fetch_service_status(&self) -> Result<ServiceAvailability, ErrorKind>;

    /// Read the caller's tier; fails only with [`ErrorKind::Unknown`]
    async fn fetch_tier_status(&self) -> Result<TierState, ErrorKind>;

    /// Exchange an access code for a better tier; fails with
    /// [`ErrorKind::InvalidCode`] or [`ErrorKind::Unknown`]
    async fn unlock_tier(&self, code: &str) -> Result<TierState, ErrorKind>;
}
