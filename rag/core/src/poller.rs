//! Tier/Status Poller
//!
//! Keeps the [`StatusBoard`] fresh without query activity.
//!
//! # Behavior
//!
//! 1. On [`StatusPoller::start`] a tick fires immediately, then every
//!    `interval` (default 30 seconds)
//! 2. Each tick fetches tier and service status concurrently and commits both
//!    as one [`StatusUpdate`]
//! 3. Ticks are last-write-wins: a slow tick is not cancelled by the next one
//! 4. [`StatusPoller::stop`] tears down the timer and every in-flight tick
//!
//! A failed fetch keeps the last committed value for that fact.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::api::RagApi;
use crate::config::PollerConfig;
use crate::status::{StatusBoard, StatusUpdate};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Fetch tier and availability concurrently and commit them together
///
/// Returns `true` if the board changed. Fetch failures are logged and
/// leave the corresponding fact untouched.
pub async fn refresh_status<A: RagApi + ?Sized>(api: &A, board: &StatusBoard) -> bool {
    let (tier, availability) =
        futures::future::join(api.fetch_tier_status(), api.fetch_service_status()).await;

    let update = StatusUpdate {
        tier: tier
            .map_err(|kind| debug!(api = api.name(), error = %kind, "Tier refresh failed"))
            .ok(),
        availability: availability
            .map_err(|kind| debug!(api = api.name(), error = %kind, "Status refresh failed"))
            .ok(),
    };
    board.commit(update)
}

/// Periodic refresher of a [`StatusBoard`]
pub struct StatusPoller<A: ?Sized> {
    api: Arc<A>,
    board: StatusBoard,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<A: RagApi + ?Sized + 'static> StatusPoller<A> {
    /// Create a stopped poller
    #[must_use]
    pub fn new(api: Arc<A>, board: StatusBoard, config: &PollerConfig) -> Self {
        Self {
            api,
            board,
            interval: config.interval.max(MIN_INTERVAL),
            handle: None,
        }
    }

    /// Period between ticks
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the polling task is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Begin polling; the first tick fires immediately
    ///
    /// Calling `start` on a running poller does nothing. Must be called from
    /// within a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        tracing::info!(
            api = self.api.name(),
            interval_secs = self.interval.as_secs(),
            "Starting status poller"
        );

        let api = Arc::clone(&self.api);
        let board = self.board.clone();
        let period = self.interval;
        self.handle = Some(tokio::spawn(run(api, board, period)));
    }

    /// Stop polling; in-flight ticks are aborted and never commit
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!(api = self.api.name(), "Status poller stopped");
        }
    }

    /// Run one tick outside the schedule
    pub async fn refresh_now(&self) -> bool {
        refresh_status(self.api.as_ref(), &self.board).await
    }
}

impl<A: ?Sized> Drop for StatusPoller<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Tick loop. Dropping it drops the `JoinSet`, aborting every running tick.
async fn run<A: RagApi + ?Sized + 'static>(api: Arc<A>, board: StatusBoard, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let api = Arc::clone(&api);
                let board = board.clone();
                ticks.spawn(async move {
                    refresh_status(api.as_ref(), &board).await;
                });
            }
            Some(_) = ticks.join_next(), if !ticks.is_empty() => {}
        }
    }
}
