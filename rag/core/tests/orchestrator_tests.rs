//! End-to-end tests of a chat session against a scripted backend
//!
//! Covers the query lifecycle, the failure taxonomy as it lands in the
//! conversation, post-query status refresh, the unlock flow and history
//! persistence across sessions.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{answer, PanickingAnalytics, RecordingAnalytics, ScriptedApi};
use rag_core::analytics::AnalyticsEvent;
use rag_core::config::{Environment, RagClientConfig};
use rag_core::error::ErrorKind;
use rag_core::messages::{Citation, ContentType, MessageStatus, Role};
use rag_core::orchestrator::{QueryOutcome, SubmitRejected};
use rag_core::status::{Gate, ServiceAvailability, Tier, TierState};
use rag_core::storage::{FileStorage, MemoryStorage, SessionStorage};
use rag_core::{RagClient, UnlockError};

fn config(environment: Environment) -> RagClientConfig {
    let mut config = RagClientConfig::default();
    config.environment = environment;
    config
}

async fn session(
    api: &Arc<ScriptedApi>,
    storage: Arc<dyn SessionStorage>,
    analytics: &Arc<RecordingAnalytics>,
) -> RagClient<ScriptedApi> {
    RagClient::open(
        Arc::clone(api),
        storage,
        &config(Environment::Production),
        analytics.clone(),
    )
    .await
}

fn mickey() -> Citation {
    Citation::new(
        ContentType::Character,
        1,
        "Mickey Mouse",
        0.92,
        "Mickey Mouse is a cartoon character created in 1928.",
    )
}

// =============================================================================
// Submission gating
// =============================================================================

#[tokio::test]
async fn test_accepted_submit_appends_one_user_message_synchronously() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("Hello!", vec![], false)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    let submission = client.submit("  hi there ").unwrap();

    // Before the request completes
    let messages = client.messages();
    let users: Vec<_> = messages.iter().filter(|m| m.role == Role::User).collect();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].text, "hi there");
    assert_eq!(users[0].id, submission.user_message_id);
    assert_eq!(messages.last().map(|m| m.status), Some(MessageStatus::Pending));

    submission.outcome().await.unwrap();
    assert_eq!(api.queries_seen()[0].query, "hi there");
}

#[tokio::test]
async fn test_blank_input_is_a_noop() {
    let api = ScriptedApi::new();
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    for blank in ["", "   ", "\n\t"] {
        assert_eq!(client.submit(blank).unwrap_err(), SubmitRejected::EmptyInput);
    }
    assert!(client.messages().is_empty());
    assert!(api.queries_seen().is_empty());
    assert!(analytics.events().is_empty());
}

#[tokio::test]
async fn test_in_flight_submit_is_a_noop() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("first", vec![], false)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    let first = client.submit("one").unwrap();
    assert_eq!(client.submit("two").unwrap_err(), SubmitRejected::InFlight);
    assert_eq!(client.messages().len(), 2);

    first.outcome().await.unwrap();
    assert_eq!(api.queries_seen().len(), 1);
}

#[tokio::test]
async fn test_exhausted_allowance_is_a_noop() {
    let api = ScriptedApi::new();
    api.set_tier(Ok(TierState::new(Tier::Free, 10, 10)));
    api.set_availability(Ok(ServiceAvailability::new(true)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    client.refresh_status().await;
    assert_eq!(client.status().gate(), Gate::LimitReached);

    assert_eq!(client.submit("one more?").unwrap_err(), SubmitRejected::LimitReached);
    assert!(client.messages().is_empty());
    assert!(api.queries_seen().is_empty());
}

// =============================================================================
// Outcomes
// =============================================================================

#[tokio::test]
async fn test_mickey_mouse_answer_with_one_citation() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer(
        "Mickey Mouse is Disney's signature character.",
        vec![mickey()],
        false,
    )));
    api.set_tier(Ok(TierState::new(Tier::Free, 10, 1)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    let outcome = client
        .submit("Tell me about Mickey Mouse")
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        QueryOutcome::Succeeded {
            citation_count: 1,
            cached: false,
            ..
        }
    ));

    let messages = client.messages();
    assert_eq!(messages.len(), 2);
    let reply = &messages[1];
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.status, MessageStatus::Finalized);
    assert_eq!(reply.citations, Some(vec![mickey()]));
    assert!(!reply.cached);
    assert_eq!(reply.error_kind, None);

    // Post-query refresh picked up the server-side count
    assert_eq!(client.status().tier, Some(TierState::new(Tier::Free, 10, 1)));

    let events = analytics.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        AnalyticsEvent::RagQuery {
            query_length: 26,
            citation_count: 1,
            is_error: false,
            ..
        }
    ));
}

#[tokio::test]
async fn test_rate_limited_reply_names_the_limit() {
    let api = ScriptedApi::new();
    api.push_query(Err(ErrorKind::RateLimited { limit: Some(10) }));
    api.set_tier(Ok(TierState::new(Tier::Free, 10, 10)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    let outcome = client.submit("again").unwrap().outcome().await.unwrap();
    assert!(outcome.is_error());

    let reply = client.messages().pop().unwrap();
    assert_eq!(reply.error_kind, Some(ErrorKind::RateLimited { limit: Some(10) }));
    assert!(reply.text.contains("10"));
    assert_eq!(reply.citations, None);

    // The refresh after the failure closes the gate
    assert_eq!(client.submit("more").unwrap_err(), SubmitRejected::LimitReached);

    assert!(matches!(
        analytics.events()[0],
        AnalyticsEvent::RagQuery {
            citation_count: 0,
            is_error: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_service_unavailable_and_kill_switch() {
    let api = ScriptedApi::new();
    api.push_query(Err(ErrorKind::ServiceUnavailable));
    api.set_availability(Ok(ServiceAvailability::new(false)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    client.submit("anyone there?").unwrap().outcome().await.unwrap();

    let reply = client.messages().pop().unwrap();
    assert_eq!(reply.error_kind, Some(ErrorKind::ServiceUnavailable));
    assert_eq!(reply.text, ErrorKind::ServiceUnavailable.user_message());

    let availability = client.status().availability.unwrap();
    assert!(!availability.enabled);
    assert_eq!(client.submit("hello?").unwrap_err(), SubmitRejected::ServiceDisabled);

    // History stays visible
    assert_eq!(client.messages().len(), 2);
}

#[tokio::test]
async fn test_each_failure_kind_renders_its_message() {
    let kinds = [
        ErrorKind::NetworkError,
        ErrorKind::InvalidInput,
        ErrorKind::RequestFailed { status: 500 },
        ErrorKind::Unknown,
    ];
    let api = ScriptedApi::new();
    for kind in &kinds {
        api.push_query(Err(kind.clone()));
    }
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    for kind in &kinds {
        let outcome = client.submit("q").unwrap().outcome().await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Failed { kind: ref k, .. } if k == kind));
        let reply = client.messages().pop().unwrap();
        assert_eq!(reply.text, kind.user_message());
    }
    assert_eq!(client.messages().len(), kinds.len() * 2);
}

#[tokio::test]
async fn test_refresh_failure_keeps_outcome_and_last_tier() {
    let api = ScriptedApi::new();
    api.set_tier(Ok(TierState::new(Tier::Free, 10, 2)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;
    client.refresh_status().await;

    api.set_tier(Err(ErrorKind::Unknown));
    api.push_query(Ok(answer("ok", vec![], true)));
    let outcome = client.submit("q").unwrap().outcome().await.unwrap();

    assert!(matches!(outcome, QueryOutcome::Succeeded { cached: true, .. }));
    assert_eq!(client.status().tier, Some(TierState::new(Tier::Free, 10, 2)));
}

#[tokio::test]
async fn test_query_completes_after_client_is_dropped() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("late answer", vec![], false)));
    let storage = Arc::new(MemoryStorage::new());
    let analytics = RecordingAnalytics::new();
    let client = session(&api, storage.clone(), &analytics).await;

    let submission = client.submit("q").unwrap();
    drop(client);

    let outcome = submission.outcome().await.unwrap();
    assert!(!outcome.is_error());

    let reopened = session(&api, storage, &analytics).await;
    assert_eq!(reopened.messages()[1].text, "late answer");
}

// =============================================================================
// Analytics
// =============================================================================

#[tokio::test]
async fn test_analytics_suppressed_outside_production() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("a", vec![], false)));
    api.set_unlock(Ok(TierState::new(Tier::Premium, 100, 0)));
    let analytics = RecordingAnalytics::new();
    let client = RagClient::open(
        Arc::clone(&api),
        Arc::new(MemoryStorage::new()),
        &config(Environment::Development),
        analytics.clone(),
    )
    .await;

    client.submit("q").unwrap().outcome().await.unwrap();
    client.unlock("CODE").await.unwrap();
    assert!(analytics.events().is_empty());
}

#[tokio::test]
async fn test_broken_analytics_sink_does_not_wedge_queries() {
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("first answer", vec![], false)));
    api.push_query(Ok(answer("second answer", vec![], false)));
    api.set_unlock(Ok(TierState::new(Tier::Premium, 100, 0)));
    let client = RagClient::open(
        Arc::clone(&api),
        Arc::new(MemoryStorage::new()),
        &config(Environment::Production),
        Arc::new(PanickingAnalytics),
    )
    .await;

    let first = client.submit("first question").unwrap().outcome().await.unwrap();
    assert!(!first.is_error());
    assert!(!client.orchestrator().is_submitting());

    let second = client
        .submit("second question")
        .expect("a broken sink must not leave the first query in flight")
        .outcome()
        .await
        .unwrap();
    assert!(!second.is_error());

    let texts: Vec<String> = client.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec!["first question", "first answer", "second question", "second answer"]
    );

    let tier = client.unlock("CODE").await.unwrap();
    assert_eq!(tier.tier, Tier::Premium);
}

// =============================================================================
// Premium unlock
// =============================================================================

#[tokio::test]
async fn test_unlock_valid_code() {
    let api = ScriptedApi::new();
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    api.set_unlock(Err(ErrorKind::InvalidCode));
    let err = client.unlock("NOPE").await.unwrap_err();
    assert_eq!(err, UnlockError::Rejected(ErrorKind::InvalidCode));
    assert_eq!(client.unlock_flow().last_error(), Some(err));

    api.set_unlock(Ok(TierState::new(Tier::Premium, 100, 0)));
    let tier = client.unlock("VALID-CODE").await.unwrap();

    assert_eq!(tier.tier, Tier::Premium);
    assert_eq!((tier.limit, tier.used, tier.remaining), (100, 0, 100));
    assert_eq!(client.status().tier, Some(tier));
    assert_eq!(client.unlock_flow().last_error(), None);
    assert_eq!(api.unlock_codes(), vec!["NOPE", "VALID-CODE"]);

    assert_eq!(
        analytics.events(),
        vec![
            AnalyticsEvent::PremiumUnlock { success: false },
            AnalyticsEvent::PremiumUnlock { success: true },
        ]
    );
}

#[tokio::test]
async fn test_unlock_blank_code_makes_no_request() {
    let api = ScriptedApi::new();
    let analytics = RecordingAnalytics::new();
    let client = session(&api, Arc::new(MemoryStorage::new()), &analytics).await;

    assert_eq!(client.unlock("  ").await.unwrap_err(), UnlockError::EmptyCode);
    assert!(api.unlock_codes().is_empty());
    assert!(analytics.events().is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("Stitch is Experiment 626.", vec![mickey()], false)));
    let analytics = RecordingAnalytics::new();

    let client = session(
        &api,
        Arc::new(FileStorage::new(dir.path(), "tab")),
        &analytics,
    )
    .await;
    client.submit("Who is Stitch?").unwrap().outcome().await.unwrap();
    let before = client.messages();
    drop(client);

    let reopened = session(
        &api,
        Arc::new(FileStorage::new(dir.path(), "tab")),
        &analytics,
    )
    .await;
    assert_eq!(reopened.messages(), before);

    // Another session id sees nothing
    let other = session(
        &api,
        Arc::new(FileStorage::new(dir.path(), "other-tab")),
        &analytics,
    )
    .await;
    assert!(other.messages().is_empty());
}

#[tokio::test]
async fn test_clear_history() {
    let storage = Arc::new(MemoryStorage::new());
    let api = ScriptedApi::new();
    api.push_query(Ok(answer("a", vec![], false)));
    let analytics = RecordingAnalytics::new();
    let client = session(&api, storage.clone(), &analytics).await;

    client.submit("q").unwrap().outcome().await.unwrap();
    client.clear_history().await;
    assert!(client.messages().is_empty());

    let reopened = session(&api, storage, &analytics).await;
    assert!(reopened.messages().is_empty());
}

#[tokio::test]
async fn test_corrupt_history_starts_empty() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_raw("rag_chat_history", "[{\"broken\": true");
    let api = ScriptedApi::new();
    let analytics = RecordingAnalytics::new();

    let client = session(&api, storage, &analytics).await;
    assert!(client.messages().is_empty());
}

#[tokio::test]
async fn test_citation_preference_roundtrip() {
    let storage = Arc::new(MemoryStorage::new());
    let api = ScriptedApi::new();
    let analytics = RecordingAnalytics::new();
    let client = session(&api, storage.clone(), &analytics).await;

    assert!(client.preferences().await.show_citations);
    client.set_show_citations(false).await;

    let reopened = session(&api, storage, &analytics).await;
    assert!(!reopened.preferences().await.show_citations);
}
