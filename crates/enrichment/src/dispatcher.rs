//! On-demand enrichment driven by explicit user action.
//!
//! [`TriggerDispatcher`] issues exactly one request per accepted
//! trigger: a trigger for an entity with a request still in flight is
//! ignored (the UI treats the button as disabled), so duplicate
//! clicks never queue additional requests. There is no timer and no
//! automatic retry; a failed request requires a new user action.

use std::sync::Arc;

use nsspip_core::types::EnrichmentContext;

use crate::client::EnrichmentClient;
use crate::tracker::{LifecycleTracker, TrackerError};

/// What became of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A request was dispatched; its outcome will be routed through
    /// the tracker.
    Dispatched,
    /// Ignored: the entity already has a request in flight.
    AlreadyInFlight,
    /// Ignored: the entity is not tracked.
    UnknownEntity,
}

/// Drives trigger-driven enrichment (e.g. per-incident risk
/// assessment) against the shared tracker.
pub struct TriggerDispatcher {
    tracker: Arc<LifecycleTracker>,
    client: Arc<dyn EnrichmentClient>,
}

impl TriggerDispatcher {
    pub fn new(tracker: Arc<LifecycleTracker>, client: Arc<dyn EnrichmentClient>) -> Self {
        Self { tracker, client }
    }

    /// Handle one user trigger for an entity.
    ///
    /// Returns immediately; the request itself runs in a spawned task
    /// and reports back through the tracker's `complete`/`fail`.
    pub async fn trigger(&self, entity_id: &str, context: EnrichmentContext) -> TriggerOutcome {
        match self.tracker.begin(entity_id).await {
            Ok(token) => {
                let id = entity_id.to_string();
                let tracker = Arc::clone(&self.tracker);
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    match client.enrich(&id, &context).await {
                        Ok(data) => tracker.complete(&id, token, data).await,
                        Err(e) => tracker.fail(&id, token, &e).await,
                    }
                });
                TriggerOutcome::Dispatched
            }
            Err(TrackerError::AlreadyInFlight(_)) => {
                tracing::trace!(entity_id, "Trigger ignored, request already in flight");
                TriggerOutcome::AlreadyInFlight
            }
            Err(e) => {
                tracing::debug!(entity_id, error = %e, "Trigger rejected");
                TriggerOutcome::UnknownEntity
            }
        }
    }
}
