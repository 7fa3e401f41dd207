//! Premium Unlock Flow
//!
//! Exchanges an access code for a better tier. A blank code is rejected
//! locally without a request. On success the tier on the [`StatusBoard`] is
//! replaced wholesale and any previous unlock error is cleared.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{emit_guarded, AnalyticsEvent, AnalyticsSink};
use crate::api::RagApi;
use crate::error::ErrorKind;
use crate::status::{StatusBoard, TierState};

/// Why an unlock failed
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UnlockError {
    /// Code is blank; no request was made
    #[error("Please enter an access code")]
    EmptyCode,

    /// The backend refused the code or could not be reached
    #[error("{}", .0.user_message())]
    Rejected(ErrorKind),
}

impl UnlockError {
    /// Message to show next to the code input
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Access-code unlock against a [`RagApi`]
pub struct UnlockFlow<A: ?Sized> {
    api: Arc<A>,
    board: StatusBoard,
    analytics: Arc<dyn AnalyticsSink>,
    last_error: Mutex<Option<UnlockError>>,
}

impl<A: RagApi + ?Sized> UnlockFlow<A> {
    /// Create a flow with no prior error
    pub fn new(api: Arc<A>, board: StatusBoard, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            api,
            board,
            analytics,
            last_error: Mutex::new(None),
        }
    }

    /// Error from the most recent failed attempt, until the next success
    #[must_use]
    pub fn last_error(&self) -> Option<UnlockError> {
        self.last_error.lock().clone()
    }

    /// Submit `code`
    ///
    /// # Errors
    ///
    /// [`UnlockError::EmptyCode`] for a blank code (no request, no analytics),
    /// [`UnlockError::Rejected`] when the backend refuses or fails.
    pub async fn unlock(&self, code: &str) -> Result<TierState, UnlockError> {
        let code = code.trim();
        if code.is_empty() {
            let err = UnlockError::EmptyCode;
            *self.last_error.lock() = Some(err.clone());
            return Err(err);
        }

        match self.api.unlock_tier(code).await {
            Ok(tier) => {
                info!(tier = %tier.tier, limit = tier.limit, "Tier unlocked");
                self.board.replace_tier(tier.clone());
                *self.last_error.lock() = None;
                emit_guarded(
                    self.analytics.as_ref(),
                    AnalyticsEvent::PremiumUnlock { success: true },
                );
                Ok(tier)
            }
            Err(kind) => {
                warn!(kind = kind.code(), "Unlock failed");
                let err = UnlockError::Rejected(kind);
                *self.last_error.lock() = Some(err.clone());
                emit_guarded(
                    self.analytics.as_ref(),
                    AnalyticsEvent::PremiumUnlock { success: false },
                );
                Err(err)
            }
        }
    }
}
