//! Tier and Service Status
//!
//! Ephemeral, process-lifetime state describing whether a query may be
//! submitted right now: the caller's rate-limit tier and the service kill
//! switch. Neither is ever persisted; both are rebuilt by the poller on
//! every start.
//!
//! [`StatusBoard`] is the single shared home of that state. Writers (the
//! poller, the post-query refresh, the unlock flow) commit whole updates in
//! one step so tier data from one fetch is never mixed with availability
//! data from another. Readers subscribe through a `watch` channel.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Rate-limit class of the current caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Anonymous / default allowance
    Free,
    /// Unlocked with an access code
    Premium,
    /// Admin API key holder
    Admin,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Premium => write!(f, "premium"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Hourly allowance for the current tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierState {
    /// Tier the server placed the caller in
    pub tier: Tier,
    /// Queries allowed per hour
    pub limit: u32,
    /// Queries used this hour
    pub used: u32,
    /// Always `max(limit - used, 0)`
    pub remaining: u32,
}

impl TierState {
    /// Build a tier state; `remaining` is derived from `limit` and `used`
    #[must_use]
    pub fn new(tier: Tier, limit: u32, used: u32) -> Self {
        Self {
            tier,
            limit,
            used,
            remaining: limit.saturating_sub(used),
        }
    }

    /// Whether the allowance is used up
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Kill-switch state of the RAG service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAvailability {
    /// Whether queries are accepted
    pub enabled: bool,
    /// Optional notice from the server (e.g. maintenance message)
    pub message: Option<String>,
}

impl ServiceAvailability {
    /// Availability without a notice
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            message: None,
        }
    }
}

/// Whether a new query may be submitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Submission allowed
    Open,
    /// Kill switch is off
    ServiceDisabled,
    /// `remaining == 0`
    LimitReached,
}

/// Last committed tier and availability
///
/// Both facts are `None` until the first successful fetch; unknown state
/// does not block submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current tier, if known
    pub tier: Option<TierState>,
    /// Current availability, if known
    pub availability: Option<ServiceAvailability>,
}

impl StatusSnapshot {
    /// Evaluate the submission gate
    #[must_use]
    pub fn gate(&self) -> Gate {
        if self.availability.as_ref().is_some_and(|a| !a.enabled) {
            return Gate::ServiceDisabled;
        }
        if self.tier.as_ref().is_some_and(TierState::is_exhausted) {
            return Gate::LimitReached;
        }
        Gate::Open
    }

    /// Whether a new query may be submitted
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.gate() == Gate::Open
    }
}

/// One atomic update; `None` fields keep their last committed value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New tier state
    pub tier: Option<TierState>,
    /// New availability
    pub availability: Option<ServiceAvailability>,
}

impl StatusUpdate {
    /// Whether the update carries nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tier.is_none() && self.availability.is_none()
    }
}

/// Shared, subscribable home of the [`StatusSnapshot`]
#[derive(Clone, Debug)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    /// Create a board with nothing known yet
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current snapshot
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Current tier state, if known
    #[must_use]
    pub fn tier(&self) -> Option<TierState> {
        self.tx.borrow().tier.clone()
    }

    /// Current submission gate
    #[must_use]
    pub fn gate(&self) -> Gate {
        self.tx.borrow().gate()
    }

    /// Receive every change to the snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// Apply `update` in a single step
    ///
    /// Returns `true` if the snapshot changed. Subscribers are only woken
    /// for real changes, so identical refreshes are invisible.
    pub fn commit(&self, update: StatusUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        self.tx.send_if_modified(|snapshot| {
            let mut changed = false;
            if let Some(tier) = update.tier {
                if snapshot.tier.as_ref() != Some(&tier) {
                    snapshot.tier = Some(tier);
                    changed = true;
                }
            }
            if let Some(availability) = update.availability {
                if snapshot.availability.as_ref() != Some(&availability) {
                    snapshot.availability = Some(availability);
                    changed = true;
                }
            }
            changed
        })
    }

    /// Replace the tier wholesale (successful unlock)
    pub fn replace_tier(&self, tier: TierState) -> bool {
        self.commit(StatusUpdate {
            tier: Some(tier),
            availability: None,
        })
    }
}
