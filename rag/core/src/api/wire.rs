//! Wire Format
//!
//! JSON bodies exchanged with the backend. Field names are the server's
//! snake_case names; conversion into domain types happens here so nothing
//! else depends on the wire layout.

use serde::{Deserialize, Serialize};

use super::traits::{QueryRequest, QueryResult};
use crate::messages::{Citation, ContentId, ContentType};
use crate::status::{ServiceAvailability, Tier, TierState};

/// `POST /api/rag/query` body
#[derive(Debug, Serialize)]
pub(crate) struct QueryBody<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_types: Option<&'a [ContentType]>,
}

impl<'a> From<&'a QueryRequest> for QueryBody<'a> {
    fn from(request: &'a QueryRequest) -> Self {
        Self {
            query: &request.query,
            top_k: request.options.top_k,
            content_types: request.options.content_types.as_deref(),
        }
    }
}

/// One retrieved source in a query response
#[derive(Debug, Deserialize)]
pub(crate) struct SourceDto {
    pub content_type: ContentType,
    pub content_id: ContentId,
    pub content_name: String,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub excerpt: String,
}

impl From<SourceDto> for Citation {
    fn from(source: SourceDto) -> Self {
        Citation::new(
            source.content_type,
            source.content_id,
            source.content_name,
            source.similarity_score,
            source.excerpt,
        )
    }
}

/// `POST /api/rag/query` 200 response
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceDto>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub cached: bool,
}

impl From<QueryResponse> for QueryResult {
    fn from(response: QueryResponse) -> Self {
        Self {
            answer: response.answer,
            citations: response.sources.into_iter().map(Citation::from).collect(),
            query: response.query,
            cached: response.cached,
        }
    }
}

/// `GET /api/rag/status` response
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub rag_enabled: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<StatusResponse> for ServiceAvailability {
    fn from(response: StatusResponse) -> Self {
        Self {
            enabled: response.rag_enabled,
            message: response.message,
        }
    }
}

/// `GET /api/rag/tier-status` and unlock 200 response
#[derive(Debug, Deserialize)]
pub(crate) struct TierStatusResponse {
    pub tier: Tier,
    pub limit: u32,
    pub used: u32,
    #[serde(default)]
    pub remaining: Option<u32>,
}

impl From<TierStatusResponse> for TierState {
    fn from(response: TierStatusResponse) -> Self {
        let state = TierState::new(response.tier, response.limit, response.used);
        if let Some(reported) = response.remaining {
            if reported != state.remaining {
                tracing::debug!(
                    reported,
                    derived = state.remaining,
                    "Server-reported remaining disagrees with limit - used"
                );
            }
        }
        state
    }
}

/// `POST /api/rag/unlock-premium` body
#[derive(Debug, Serialize)]
pub(crate) struct UnlockBody<'a> {
    pub code: &'a str,
}

/// Error payload of a rejected unlock
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_body_omits_unset_options() {
        let request = QueryRequest::new("Tell me about Mickey Mouse");
        let json = serde_json::to_value(QueryBody::from(&request)).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "Tell me about Mickey Mouse" }));

        let request = request.with_top_k(5).with_content_types(vec![ContentType::Park]);
        let json = serde_json::to_value(QueryBody::from(&request)).unwrap();
        assert_eq!(json["top_k"], 5);
        assert_eq!(json["content_types"], serde_json::json!(["park"]));
    }

    #[test]
    fn test_query_response_conversion() {
        let body = r#"{
            "answer": "Mickey is...",
            "sources": [{
                "content_type": "character",
                "content_id": 1,
                "content_name": "Mickey Mouse",
                "similarity_score": 0.92,
                "excerpt": "..."
            }],
            "query": "Tell me about Mickey Mouse",
            "cached": false
        }"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        let result = QueryResult::from(response);

        assert_eq!(result.answer, "Mickey is...");
        assert!(!result.cached);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].content_type, ContentType::Character);
        assert_eq!(result.citations[0].content_id, ContentId::Number(1));
        assert_eq!(result.citations[0].content_name, "Mickey Mouse");
    }

    #[test]
    fn test_query_response_missing_sources() {
        let response: QueryResponse = serde_json::from_str(r#"{"answer": "Hi"}"#).unwrap();
        let result = QueryResult::from(response);
        assert!(result.citations.is_empty());
        assert!(!result.cached);
    }

    #[test]
    fn test_tier_status_derives_remaining() {
        let response: TierStatusResponse = serde_json::from_str(
            r#"{"tier": "free", "limit": 10, "used": 12, "remaining": 3, "message": "ok"}"#,
        )
        .unwrap();
        let state = TierState::from(response);
        assert_eq!(state.tier, Tier::Free);
        assert_eq!(state.remaining, 0);
    }

    #[test]
    fn test_status_response() {
        let response: StatusResponse =
            serde_json::from_str(r#"{"rag_enabled": false, "message": "Maintenance"}"#).unwrap();
        let availability = ServiceAvailability::from(response);
        assert!(!availability.enabled);
        assert_eq!(availability.message.as_deref(), Some("Maintenance"));
    }
}
