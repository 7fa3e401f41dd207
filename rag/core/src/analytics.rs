//! Analytics side channel
//!
//! Fire-and-forget usage events. Emission can never fail or block the flow
//! that produced the event, and nothing is emitted outside production.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Environment;
use crate::status::Tier;

/// A usage event
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A query reached a terminal state
    RagQuery {
        /// Length of the trimmed question, in characters
        query_length: usize,
        /// Wall-clock time from submission to outcome
        response_time_ms: u64,
        /// Citations on the answer (0 on failure)
        citation_count: usize,
        /// Tier known at the time of the outcome
        tier: Option<Tier>,
        /// Whether the query failed
        is_error: bool,
    },
    /// An unlock attempt finished
    PremiumUnlock {
        /// Whether the code was accepted
        success: bool,
    },
}

impl AnalyticsEvent {
    /// Event name as reported to the analytics backend
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RagQuery { .. } => "rag_query",
            Self::PremiumUnlock { .. } => "premium_unlock",
        }
    }
}

/// Destination for analytics events
pub trait AnalyticsSink: Send + Sync {
    /// Record one event; must not block or fail
    fn emit(&self, event: AnalyticsEvent);
}

/// Drops every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn emit(&self, _event: AnalyticsEvent) {}
}

/// Emits events as `tracing` records on the `analytics` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn emit(&self, event: AnalyticsEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        info!(target: "analytics", event = event.name(), %payload);
    }
}

/// Hand `event` to `sink`, containing a panicking sink
///
/// Returns whether the sink accepted the event. Callers ignore the result;
/// a misbehaving sink only costs the event.
pub fn emit_guarded(sink: &dyn AnalyticsSink, event: AnalyticsEvent) -> bool {
    let name = event.name();
    let accepted = catch_unwind(AssertUnwindSafe(|| sink.emit(event))).is_ok();
    if !accepted {
        warn!(event = name, "Analytics sink panicked, event dropped");
    }
    accepted
}

/// The sink to use in `environment`: `sink` in production, a no-op elsewhere
#[must_use]
pub fn for_environment(
    environment: Environment,
    sink: Arc<dyn AnalyticsSink>,
) -> Arc<dyn AnalyticsSink> {
    if environment.is_production() {
        sink
    } else {
        Arc::new(NoopAnalytics)
    }
}
