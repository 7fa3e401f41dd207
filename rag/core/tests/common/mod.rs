//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rag_core::analytics::{AnalyticsEvent, AnalyticsSink};
use rag_core::api::{QueryRequest, QueryResult, RagApi};
use rag_core::error::ErrorKind;
use rag_core::status::{ServiceAvailability, TierState};

// =============================================================================
// Scripted backend
// =============================================================================

/// Backend whose answers are queued up front
///
/// Queries pop the next scripted result (or fail with `Unknown` when the
/// script is empty). Status and tier return the currently configured value.
#[derive(Default)]
pub struct ScriptedApi {
    queries: Mutex<VecDeque<Result<QueryResult, ErrorKind>>>,
    tier: Mutex<Option<Result<TierState, ErrorKind>>>,
    availability: Mutex<Option<Result<ServiceAvailability, ErrorKind>>>,
    unlock: Mutex<Option<Result<TierState, ErrorKind>>>,
    seen: Mutex<Vec<QueryRequest>>,
    unlock_codes: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
    tier_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_query(&self, result: Result<QueryResult, ErrorKind>) {
        self.queries.lock().push_back(result);
    }

    pub fn set_tier(&self, tier: Result<TierState, ErrorKind>) {
        *self.tier.lock() = Some(tier);
    }

    pub fn set_availability(&self, availability: Result<ServiceAvailability, ErrorKind>) {
        *self.availability.lock() = Some(availability);
    }

    pub fn set_unlock(&self, result: Result<TierState, ErrorKind>) {
        *self.unlock.lock() = Some(result);
    }

    pub fn queries_seen(&self) -> Vec<QueryRequest> {
        self.seen.lock().clone()
    }

    pub fn unlock_codes(&self) -> Vec<String> {
        self.unlock_codes.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn tier_calls(&self) -> usize {
        self.tier_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RagApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResult, ErrorKind> {
        self.seen.lock().push(request.clone());
        self.queries
            .lock()
            .pop_front()
            .unwrap_or(Err(ErrorKind::Unknown))
    }

    async fn fetch_service_status(&self) -> Result<ServiceAvailability, ErrorKind> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.availability
            .lock()
            .clone()
            .unwrap_or(Err(ErrorKind::Unknown))
    }

    async fn fetch_tier_status(&self) -> Result<TierState, ErrorKind> {
        self.tier_calls.fetch_add(1, Ordering::SeqCst);
        self.tier.lock().clone().unwrap_or(Err(ErrorKind::Unknown))
    }

    async fn unlock_tier(&self, code: &str) -> Result<TierState, ErrorKind> {
        self.unlock_codes.lock().push(code.to_string());
        self.unlock.lock().clone().unwrap_or(Err(ErrorKind::Unknown))
    }
}

// =============================================================================
// Recording analytics
// =============================================================================

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn emit(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}

/// Sink whose collector is broken: every emit panics
pub struct PanickingAnalytics;

impl AnalyticsSink for PanickingAnalytics {
    fn emit(&self, event: AnalyticsEvent) {
        panic!("analytics collector rejected {}", event.name());
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn answer(text: &str, citations: Vec<rag_core::Citation>, cached: bool) -> QueryResult {
    QueryResult {
        answer: text.to_string(),
        citations,
        query: String::new(),
        cached,
    }
}
