//! RAG Backend Integration
//!
//! Typed access to the backend RAG API through a common trait, so the
//! orchestration core never sees HTTP.
//!
//! # Usage
//!
//! ```ignore
//! use rag_core::api::{HttpRagClient, QueryRequest, RagApi};
//! use rag_core::config::ApiConfig;
//!
//! let api = HttpRagClient::new(&ApiConfig::new("http://localhost:3000"))?;
//! let result = api.submit_query(&QueryRequest::new("Who is Stitch?")).await?;
//! ```

mod http;
mod traits;
mod wire;

pub use http::{ClientBuildError, HttpRagClient, API_KEY_HEADER};
pub use traits::{QueryOptions, QueryRequest, QueryResult, RagApi};
