//! Interval-driven polling for live camera feeds.
//!
//! [`PollScheduler`] owns one long-lived tokio task per feed. Each
//! task ticks on its own [`tokio::time::interval`] so that one feed's
//! slow response never delays or skips another feed's tick. On every
//! tick the loop consults the [`StatusSource`]; any status other than
//! `LIVE` stops the loop. A tick that finds a request still in flight
//! for the feed is skipped rather than queueing a second request.
//!
//! Enrichment requests run in their own spawned task and report back
//! to the shared [`LifecycleTracker`], so the tick loop itself never
//! suspends on the network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use nsspip_core::types::{EnrichmentContext, EntityId, FeedStatus};

use crate::client::EnrichmentClient;
use crate::events::{EnrichmentEvent, StopReason};
use crate::status::StatusSource;
use crate::tracker::{LifecycleTracker, TrackerError};

/// Default interval between poll ticks for a feed.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long `shutdown` waits for each feed task to exit.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Internal bookkeeping for one scheduled feed.
struct ScheduledFeed {
    task_handle: tokio::task::JoinHandle<()>,
    /// Per-feed cancellation token (child of the master token).
    cancel: CancellationToken,
}

/// Drives periodic enrichment for feed entities.
pub struct PollScheduler {
    /// Active polling tasks indexed by feed id.
    feeds: RwLock<HashMap<EntityId, ScheduledFeed>>,
    tracker: Arc<LifecycleTracker>,
    client: Arc<dyn EnrichmentClient>,
    status: Arc<dyn StatusSource>,
    poll_interval: Duration,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(
        tracker: Arc<LifecycleTracker>,
        client: Arc<dyn EnrichmentClient>,
        status: Arc<dyn StatusSource>,
    ) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            tracker,
            client,
            status,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the default 5-second poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Whether a feed is currently in the polling rotation.
    ///
    /// A feed whose tick loop has exited (e.g. its status left `LIVE`)
    /// is no longer scheduled even if its map entry lingers.
    pub async fn is_scheduled(&self, feed_id: &str) -> bool {
        self.feeds
            .read()
            .await
            .get(feed_id)
            .is_some_and(|feed| !feed.task_handle.is_finished())
    }

    /// Start polling a feed.
    ///
    /// Registers the feed with the tracker and spawns its tick loop.
    /// The first tick fires immediately. No-op if the feed is already
    /// actively scheduled; a feed whose previous loop has exited (the
    /// camera went offline and came back) re-enters the rotation.
    pub async fn start_feed(
        &self,
        feed_id: &str,
        context: EnrichmentContext,
    ) -> Result<(), TrackerError> {
        let mut feeds = self.feeds.write().await;
        if let Some(existing) = feeds.get(feed_id) {
            if !existing.task_handle.is_finished() {
                tracing::warn!(entity_id = feed_id, "Feed already scheduled");
                return Ok(());
            }
            // The previous tick loop stopped itself; drop the stale
            // entry so the feed can be rescheduled.
            feeds.remove(feed_id);
        }

        self.tracker.track(feed_id).await?;

        // Announce before the first tick so subscribers observe
        // PollingStarted ahead of the feed's first result.
        let _ = self
            .tracker
            .event_sender()
            .send(EnrichmentEvent::PollingStarted {
                entity_id: feed_id.to_string(),
            });

        let feed_cancel = self.cancel.child_token();
        let loop_cancel = feed_cancel.clone();
        let id = feed_id.to_string();
        let tracker = Arc::clone(&self.tracker);
        let client = Arc::clone(&self.client);
        let status = Arc::clone(&self.status);
        let poll_interval = self.poll_interval;

        let task_handle = tokio::spawn(async move {
            tracing::info!(entity_id = %id, "Starting polling task");
            run_feed_loop(
                &id,
                context,
                tracker,
                client,
                status,
                poll_interval,
                loop_cancel,
            )
            .await;
            tracing::info!(entity_id = %id, "Polling task exited");
        });

        feeds.insert(
            feed_id.to_string(),
            ScheduledFeed {
                task_handle,
                cancel: feed_cancel,
            },
        );

        Ok(())
    }

    /// Stop polling a feed and drop its tracker state.
    ///
    /// Cancels the pending timer and abandons any in-flight request:
    /// its eventual response lands inertly because the entity is no
    /// longer tracked.
    pub async fn stop_feed(&self, feed_id: &str) {
        let removed = self.feeds.write().await.remove(feed_id);
        let Some(feed) = removed else {
            return;
        };

        feed.cancel.cancel();
        self.tracker.remove(feed_id).await;

        let _ = self
            .tracker
            .event_sender()
            .send(EnrichmentEvent::PollingStopped {
                entity_id: feed_id.to_string(),
                reason: StopReason::Unmounted,
            });
    }

    /// Gracefully shut down all polling tasks.
    ///
    /// Cancels the master token, then waits up to
    /// [`SHUTDOWN_JOIN_TIMEOUT`] per task for a clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down poll scheduler");
        self.cancel.cancel();

        let mut feeds = self.feeds.write().await;
        for (id, feed) in feeds.drain() {
            feed.cancel.cancel();
            let _ = tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, feed.task_handle).await;
            let _ = self
                .tracker
                .event_sender()
                .send(EnrichmentEvent::PollingStopped {
                    entity_id: id,
                    reason: StopReason::Shutdown,
                });
        }

        tracing::info!("Poll scheduler shut down complete");
    }
}

/// Tick loop for one feed: check status, dispatch, repeat.
///
/// Runs until the cancellation token is triggered or the feed's
/// status transitions away from `LIVE`.
async fn run_feed_loop(
    feed_id: &str,
    context: EnrichmentContext,
    tracker: Arc<LifecycleTracker>,
    client: Arc<dyn EnrichmentClient>,
    status: Arc<dyn StatusSource>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(entity_id = feed_id, "Polling cancelled");
                return;
            }
            _ = ticker.tick() => {
                let current = status.status(feed_id);
                if current != Some(FeedStatus::Live) {
                    tracing::info!(
                        entity_id = feed_id,
                        status = ?current,
                        "Feed no longer live, stopping polling",
                    );
                    let _ = tracker.event_sender().send(EnrichmentEvent::PollingStopped {
                        entity_id: feed_id.to_string(),
                        reason: StopReason::StatusChanged,
                    });
                    return;
                }

                match tracker.begin(feed_id).await {
                    Ok(token) => {
                        let id = feed_id.to_string();
                        let ctx = context.clone();
                        let tracker = Arc::clone(&tracker);
                        let client = Arc::clone(&client);
                        tokio::spawn(async move {
                            match client.enrich(&id, &ctx).await {
                                Ok(data) => tracker.complete(&id, token, data).await,
                                Err(e) => tracker.fail(&id, token, &e).await,
                            }
                        });
                    }
                    Err(TrackerError::AlreadyInFlight(_)) => {
                        tracing::trace!(
                            entity_id = feed_id,
                            "Tick skipped, previous request still in flight",
                        );
                    }
                    Err(e) => {
                        // Entity was removed from tracking; nothing left to poll.
                        tracing::debug!(entity_id = feed_id, error = %e, "Polling stopped");
                        return;
                    }
                }
            }
        }
    }
}
