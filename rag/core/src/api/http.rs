//! HTTP RAG Client
//!
//! [`RagApi`] over the site's `/api/rag/*` endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/rag/query` - ask a question
//! - `GET /api/rag/status` - kill switch
//! - `GET /api/rag/tier-status` - rate-limit tier
//! - `POST /api/rag/unlock-premium` - exchange an access code
//!
//! Every request carries the admin API key (when configured) as a default
//! header; session credentials ride along in the client's cookie store.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::traits::{QueryRequest, QueryResult, RagApi};
use super::wire::{
    ErrorBody, QueryBody, QueryResponse, StatusResponse, TierStatusResponse, UnlockBody,
};
use crate::config::ApiConfig;
use crate::error::ErrorKind;
use crate::status::{ServiceAvailability, TierState};

/// Header carrying the admin API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors building an [`HttpRagClient`]
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The API key cannot be sent as a header value
    #[error("API key is not a valid header value: {0}")]
    InvalidApiKey(#[from] InvalidHeaderValue),

    /// reqwest refused the client configuration
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// RAG backend client over HTTP
#[derive(Clone, Debug)]
pub struct HttpRagClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpRagClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Fails if the API key is not a valid header value or the TLS backend
    /// cannot be initialized.
    pub fn new(config: &ApiConfig) -> Result<Self, ClientBuildError> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = config.api_key {
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/rag/{path}", self.base_url)
    }

    /// GET a JSON document; any failure is [`ErrorKind::Unknown`]
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ErrorKind> {
        let response = self
            .http_client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| {
                debug!(path, error = %e, "Status request failed");
                ErrorKind::Unknown
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(path, status = status.as_u16(), "Status request rejected");
            return Err(ErrorKind::Unknown);
        }

        response.json::<T>().await.map_err(|e| {
            debug!(path, error = %e, "Status response not decodable");
            ErrorKind::Unknown
        })
    }
}

#[async_trait]
impl RagApi for HttpRagClient {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResult, ErrorKind> {
        debug!(query_len = request.query.len(), "Submitting RAG query");

        let response = self
            .http_client
            .post(self.url("query"))
            .json(&QueryBody::from(request))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "RAG query got no response");
                ErrorKind::NetworkError
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = ErrorKind::from_status(status.as_u16(), &body);
            warn!(status = status.as_u16(), kind = kind.code(), "RAG query rejected");
            return Err(kind);
        }

        let data: QueryResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "RAG query response not decodable");
            ErrorKind::Unknown
        })?;

        Ok(QueryResult::from(data))
    }

    async fn fetch_service_status(&self) -> Result<ServiceAvailability, ErrorKind> {
        self.get_json::<StatusResponse>("status")
            .await
            .map(ServiceAvailability::from)
    }

    async fn fetch_tier_status(&self) -> Result<TierState, ErrorKind> {
        self.get_json::<TierStatusResponse>("tier-status")
            .await
            .map(TierState::from)
    }

    async fn unlock_tier(&self, code: &str) -> Result<TierState, ErrorKind> {
        let response = self
            .http_client
            .post(self.url("unlock-premium"))
            .json(&UnlockBody { code })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Unlock request got no response");
                ErrorKind::Unknown
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_default();
            debug!(status = status.as_u16(), reason = %reason, "Unlock rejected");
            return Err(ErrorKind::InvalidCode);
        }

        let data: TierStatusResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Unlock response not decodable");
            ErrorKind::Unknown
        })?;

        Ok(TierState::from(data))
    }
}
