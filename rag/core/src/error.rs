//! Error Taxonomy
//!
//! Every failure the client can show to a user maps to exactly one
//! [`ErrorKind`]. The `Display` text of each kind is the stable message that
//! lands in the conversation; raw transport errors are only ever logged.
//!
//! # Status Mapping
//!
//! | Response                  | Kind                          |
//! |---------------------------|-------------------------------|
//! | HTTP 429                  | `RateLimited { limit }`       |
//! | HTTP 503                  | `ServiceUnavailable`          |
//! | HTTP 400                  | `InvalidInput`                |
//! | any other non-2xx         | `RequestFailed { status }`    |
//! | no response at all        | `NetworkError`                |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of user-visible failure kinds
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request never produced a response (DNS, connect, timeout)
    #[error("Unable to reach the assistant. Please check your connection and try again.")]
    NetworkError,

    /// HTTP 429 - the hourly query allowance for the current tier is used up
    #[error("{}", rate_limited_message(.limit))]
    RateLimited {
        /// Queries per hour declared by the server, when present in the body
        limit: Option<u32>,
    },

    /// HTTP 503 - the service is switched off or overloaded
    #[error("The assistant is temporarily unavailable. Please try again later.")]
    ServiceUnavailable,

    /// HTTP 400 - the server rejected the question itself
    #[error("That question could not be processed. Please rephrase it and try again.")]
    InvalidInput,

    /// Any other non-2xx status
    #[error("The request failed (status {status}). Please try again.")]
    RequestFailed {
        /// HTTP status code returned by the server
        status: u16,
    },

    /// Premium unlock rejected the access code
    #[error("Invalid access code. Please check the code and try again.")]
    InvalidCode,

    /// Conversation history could not be written (always swallowed)
    #[error("Conversation history could not be saved.")]
    StorageFailure,

    /// Anything else: undecodable payloads, failed status fetches
    #[error("Something went wrong. Please try again.")]
    Unknown,
}

fn rate_limited_message(limit: &Option<u32>) -> String {
    match limit {
        Some(limit) => format!(
            "Rate limit reached. Your tier allows {limit} queries per hour. Please try again later."
        ),
        None => "Rate limit reached. Please try again later.".to_string(),
    }
}

impl ErrorKind {
    /// Map a non-2xx query response to its kind
    ///
    /// `body` is the raw response body; it is only inspected for the `limit`
    /// field of a 429 payload.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => Self::RateLimited {
                limit: declared_limit(body),
            },
            503 => Self::ServiceUnavailable,
            400 => Self::InvalidInput,
            status => Self::RequestFailed { status },
        }
    }

    /// The stable message shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Short machine-readable identifier, used in logs
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InvalidInput => "invalid_input",
            Self::RequestFailed { .. } => "request_failed",
            Self::InvalidCode => "invalid_code",
            Self::StorageFailure => "storage_failure",
            Self::Unknown => "unknown",
        }
    }
}

fn declared_limit(body: &str) -> Option<u32> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("limit")?
        .as_u64()
        .and_then(|limit| u32::try_from(limit).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ErrorKind::from_status(429, "{}"),
            ErrorKind::RateLimited { limit: None }
        );
        assert_eq!(ErrorKind::from_status(503, ""), ErrorKind::ServiceUnavailable);
        assert_eq!(ErrorKind::from_status(400, ""), ErrorKind::InvalidInput);
        assert_eq!(
            ErrorKind::from_status(500, "boom"),
            ErrorKind::RequestFailed { status: 500 }
        );
        assert_eq!(
            ErrorKind::from_status(401, ""),
            ErrorKind::RequestFailed { status: 401 }
        );
    }

    #[test]
    fn test_rate_limit_carries_declared_limit() {
        let kind = ErrorKind::from_status(429, r#"{"error": "Rate limit exceeded", "limit": 10}"#);
        assert_eq!(kind, ErrorKind::RateLimited { limit: Some(10) });
        assert!(kind.user_message().contains("10"));
    }

    #[test]
    fn test_rate_limit_ignores_garbage_body() {
        let kind = ErrorKind::from_status(429, "<html>Too Many Requests</html>");
        assert_eq!(kind, ErrorKind::RateLimited { limit: None });
        assert_eq!(kind.user_message(), "Rate limit reached. Please try again later.");
    }

    #[test]
    fn test_request_failed_message_includes_status() {
        let kind = ErrorKind::RequestFailed { status: 502 };
        assert!(kind.user_message().contains("502"));
        assert_eq!(kind.code(), "request_failed");
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&ErrorKind::RateLimited { limit: Some(3) }).unwrap();
        assert_eq!(json, r#"{"kind":"rate_limited","limit":3}"#);

        let back: ErrorKind = serde_json::from_str(r#"{"kind":"network_error"}"#).unwrap();
        assert_eq!(back, ErrorKind::NetworkError);
    }
}
