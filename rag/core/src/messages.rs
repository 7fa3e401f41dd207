//! Conversation Messages
//!
//! The data model shared by the conversation store, the orchestrator and any
//! surface rendering the conversation.
//!
//! # Lifecycle
//!
//! User messages are created final. Assistant replies go through two phases:
//! a [`MessageStatus::Pending`] placeholder is appended when the question is
//! submitted, and exactly one finalization replaces it with either an answer
//! or an error. The placeholder's id is derived from the [`RequestId`] of the
//! query that created it, so a reply can only ever finalize its own
//! placeholder.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Unique message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(format!("msg_{}", Uuid::new_v4()))
    }

    /// The id of the assistant reply belonging to `request`
    #[must_use]
    pub fn reply_to(request: &RequestId) -> Self {
        Self(format!("reply_{}", request.0))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one submitted query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new request ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking
    User,
    /// The RAG service (or the client speaking on its behalf for errors)
    Assistant,
}

/// Kind of content a citation points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A character page
    Character,
    /// A movie page
    Movie,
    /// A park page
    Park,
    /// Anything the client has no page for
    #[serde(other)]
    Other,
}

impl ContentType {
    /// Route prefix of the detail page for this content type
    #[must_use]
    pub fn route_prefix(self) -> Option<&'static str> {
        match self {
            Self::Character => Some("/characters"),
            Self::Movie => Some("/movies"),
            Self::Park => Some("/parks"),
            Self::Other => None,
        }
    }
}

/// Identifier of a piece of content; the backend sends numbers for most
/// content but slugs are tolerated
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentId {
    /// Numeric database id
    Number(u64),
    /// Slug or other textual id
    Text(String),
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ContentId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// A retrieved source excerpt backing an answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// What kind of content the excerpt came from
    pub content_type: ContentType,
    /// Id of the content
    pub content_id: ContentId,
    /// Display name of the content
    pub content_name: String,
    /// Retrieval similarity, always within `[0, 1]`
    pub similarity_score: f64,
    /// The excerpt text
    pub excerpt: String,
}

impl Citation {
    /// Create a citation, clamping the score into `[0, 1]`
    #[must_use]
    pub fn new(
        content_type: ContentType,
        content_id: impl Into<ContentId>,
        content_name: impl Into<String>,
        similarity_score: f64,
        excerpt: impl Into<String>,
    ) -> Self {
        let similarity_score = if similarity_score.is_nan() {
            0.0
        } else {
            similarity_score.clamp(0.0, 1.0)
        };
        Self {
            content_type,
            content_id: content_id.into(),
            content_name: content_name.into(),
            similarity_score,
            excerpt: excerpt.into(),
        }
    }

    /// Detail page route for the cited content, if the app has one
    #[must_use]
    pub fn route(&self) -> Option<String> {
        self.content_type
            .route_prefix()
            .map(|prefix| format!("{prefix}/{}", self.content_id))
    }

    /// Similarity as a whole percentage, for display
    #[must_use]
    pub fn similarity_percent(&self) -> u8 {
        // Score is clamped to [0, 1] so the product fits in a u8.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (self.similarity_score * 100.0).round() as u8;
        percent
    }
}

/// Finalization state of a message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Assistant placeholder awaiting its reply
    Pending,
    /// Immutable
    #[default]
    Finalized,
}

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: Role,
    /// Message text (answer, question, or the error kind's message)
    pub text: String,
    /// Sources supporting an answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    /// Set when this assistant message reports a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Whether the backend served the answer from its cache
    #[serde(default)]
    pub cached: bool,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Pending placeholder or finalized
    #[serde(default)]
    pub status: MessageStatus,
}

impl Message {
    /// A question from the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            text: text.into(),
            citations: None,
            error_kind: None,
            cached: false,
            created_at: Utc::now(),
            status: MessageStatus::Finalized,
        }
    }

    /// Placeholder for the reply to `request`
    #[must_use]
    pub fn pending_reply(request: &RequestId) -> Self {
        Self {
            id: MessageId::reply_to(request),
            role: Role::Assistant,
            text: String::new(),
            citations: None,
            error_kind: None,
            cached: false,
            created_at: Utc::now(),
            status: MessageStatus::Pending,
        }
    }

    /// A successful answer
    pub fn answer(
        id: MessageId,
        text: impl Into<String>,
        citations: Vec<Citation>,
        cached: bool,
    ) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: text.into(),
            citations: Some(citations),
            error_kind: None,
            cached,
            created_at: Utc::now(),
            status: MessageStatus::Finalized,
        }
    }

    /// A failed reply; the text is the kind's stable message
    #[must_use]
    pub fn failure(id: MessageId, kind: ErrorKind) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: kind.user_message(),
            citations: None,
            error_kind: Some(kind),
            cached: false,
            created_at: Utc::now(),
            status: MessageStatus::Finalized,
        }
    }

    /// Whether this is an unfinalized placeholder
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    /// Whether this message reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_kind.is_some()
    }

    /// Number of citations (0 when there are none)
    #[must_use]
    pub fn citation_count(&self) -> usize {
        self.citations.as_ref().map_or(0, Vec::len)
    }
}
