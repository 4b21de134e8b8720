//! Per-entity enrichment lifecycle tracking.
//!
//! [`LifecycleTracker`] serializes enrichment activity per entity id
//! while allowing full concurrency across distinct ids. For each
//! tracked entity it holds at most one in-flight request and the
//! last successfully-completed result.
//!
//! Which result wins is decided by monotonic request tokens, not by
//! arrival order: network latency does not preserve dispatch order,
//! so a slow older request that resolves after a newer one must not
//! overwrite the newer result. Completions carrying an outdated token
//! are discarded; completions for entities no longer tracked are
//! inert.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};

use nsspip_core::types::{EnrichmentData, EntityId};
use nsspip_core::validation::validate_entity_id;

use crate::client::ClientError;
use crate::events::EnrichmentEvent;

/// Broadcast channel capacity for enrichment events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Opaque per-entity request sequence token issued by
/// [`LifecycleTracker::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Position of this request in the entity's dispatch sequence.
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Errors from lifecycle tracking operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The entity already has an in-flight request.
    #[error("Request already in flight for entity {0}")]
    AlreadyInFlight(EntityId),

    /// The entity is not (or no longer) tracked.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// The entity id failed validation.
    #[error(transparent)]
    Invalid(#[from] nsspip_core::error::CoreError),
}

/// Per-entity bookkeeping.
struct EntitySlot {
    /// Sequence number of the most recently issued token.
    seq: u64,
    /// Token of the request currently in flight, if any.
    in_flight: Option<RequestToken>,
    /// Last-known-good result. Preserved across failures.
    result: Option<EnrichmentData>,
}

/// Tracks the enrichment lifecycle of a keyed collection of entities.
///
/// Shared via `Arc` between the poll scheduler, trigger dispatcher,
/// and any spawned request tasks.
pub struct LifecycleTracker {
    slots: RwLock<HashMap<EntityId, EntitySlot>>,
    event_tx: broadcast::Sender<EnrichmentEvent>,
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleTracker {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slots: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to enrichment events.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichmentEvent> {
        self.event_tx.subscribe()
    }

    /// Sender handle used by the scheduler to emit polling events on
    /// the same channel.
    pub(crate) fn event_sender(&self) -> broadcast::Sender<EnrichmentEvent> {
        self.event_tx.clone()
    }

    /// Start tracking an entity. Idempotent: re-tracking an already
    /// tracked entity keeps its current state.
    pub async fn track(&self, entity_id: &str) -> Result<(), TrackerError> {
        validate_entity_id(entity_id)?;
        self.slots
            .write()
            .await
            .entry(entity_id.to_string())
            .or_insert(EntitySlot {
                seq: 0,
                in_flight: None,
                result: None,
            });
        Ok(())
    }

    /// Stop tracking an entity and drop its state.
    ///
    /// Any in-flight request for the entity is abandoned, not
    /// cancelled: its eventual completion or failure lands inertly.
    pub async fn remove(&self, entity_id: &str) {
        self.slots.write().await.remove(entity_id);
    }

    /// Whether an entity is currently tracked.
    pub async fn is_tracked(&self, entity_id: &str) -> bool {
        self.slots.read().await.contains_key(entity_id)
    }

    /// Whether an entity currently has an in-flight request.
    pub async fn is_loading(&self, entity_id: &str) -> bool {
        self.slots
            .read()
            .await
            .get(entity_id)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    /// The entity's last-known result, if any.
    pub async fn result(&self, entity_id: &str) -> Option<EnrichmentData> {
        self.slots
            .read()
            .await
            .get(entity_id)
            .and_then(|slot| slot.result.clone())
    }

    /// Mark the start of a request for an entity.
    ///
    /// Fails with [`TrackerError::AlreadyInFlight`] while a previous
    /// request for the same entity is unresolved; no second request
    /// may be dispatched until the first resolves. On success, issues
    /// a fresh monotonic token identifying this request.
    pub async fn begin(&self, entity_id: &str) -> Result<RequestToken, TrackerError> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(entity_id)
            .ok_or_else(|| TrackerError::UnknownEntity(entity_id.to_string()))?;

        if slot.in_flight.is_some() {
            return Err(TrackerError::AlreadyInFlight(entity_id.to_string()));
        }

        slot.seq += 1;
        let token = RequestToken(slot.seq);
        slot.in_flight = Some(token);
        Ok(token)
    }

    /// Record a successful completion.
    ///
    /// The result is stored only when `token` is the most recently
    /// issued token for the entity; a stale token's result is
    /// discarded (this is not an error and is not logged as one).
    /// Completions for untracked entities are inert.
    pub async fn complete(&self, entity_id: &str, token: RequestToken, data: EnrichmentData) {
        let mut slots = self.slots.write().await;
        let slot = match slots.get_mut(entity_id) {
            Some(slot) => slot,
            None => {
                tracing::debug!(
                    entity_id,
                    token = token.sequence(),
                    "Completion for untracked entity ignored",
                );
                return;
            }
        };

        if slot.in_flight == Some(token) {
            slot.in_flight = None;
        }

        if token.sequence() != slot.seq {
            tracing::debug!(
                entity_id,
                token = token.sequence(),
                latest = slot.seq,
                "Stale enrichment result discarded",
            );
            return;
        }

        let alert_triggered = match &data {
            EnrichmentData::Scan(scan) => Some(scan.alert_triggered),
            EnrichmentData::Risk(_) => None,
        };
        slot.result = Some(data);
        drop(slots);

        let _ = self.event_tx.send(EnrichmentEvent::ResultUpdated {
            entity_id: entity_id.to_string(),
            alert_triggered,
            received_at: Utc::now(),
        });
    }

    /// Record a failed request.
    ///
    /// Clears the in-flight slot and preserves the entity's last-known
    /// result. The error is reported here and swallowed: one feed's
    /// transient failure must not propagate to other feeds or stop
    /// the polling loop.
    pub async fn fail(&self, entity_id: &str, token: RequestToken, error: &ClientError) {
        let mut slots = self.slots.write().await;
        let slot = match slots.get_mut(entity_id) {
            Some(slot) => slot,
            None => {
                tracing::debug!(
                    entity_id,
                    token = token.sequence(),
                    "Failure for untracked entity ignored",
                );
                return;
            }
        };

        if slot.in_flight == Some(token) {
            slot.in_flight = None;
        }
        drop(slots);

        tracing::warn!(
            entity_id,
            token = token.sequence(),
            error = %error,
            "Enrichment request failed",
        );

        let _ = self.event_tx.send(EnrichmentEvent::EnrichmentFailed {
            entity_id: entity_id.to_string(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use nsspip_core::types::{RiskAssessment, RiskLevel, ScanResult};

    fn scan_data(alert: bool) -> EnrichmentData {
        EnrichmentData::Scan(ScanResult {
            alert_triggered: alert,
            detected_objects: vec![],
        })
    }

    fn risk_data(score: u8) -> EnrichmentData {
        EnrichmentData::Risk(RiskAssessment {
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            contributing_factors: vec![],
        })
    }

    fn service_error() -> ClientError {
        ClientError::Service {
            status: 503,
            body: "engine unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn begin_complete_stores_result() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();

        let token = tracker.begin("CAM-01").await.unwrap();
        assert!(tracker.is_loading("CAM-01").await);

        tracker.complete("CAM-01", token, scan_data(true)).await;
        assert!(!tracker.is_loading("CAM-01").await);
        assert_eq!(tracker.result("CAM-01").await, Some(scan_data(true)));
    }

    #[tokio::test]
    async fn second_begin_rejected_while_in_flight() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();

        let _token = tracker.begin("CAM-01").await.unwrap();
        assert_matches!(
            tracker.begin("CAM-01").await,
            Err(TrackerError::AlreadyInFlight(_))
        );
    }

    #[tokio::test]
    async fn begin_for_unknown_entity_rejected() {
        let tracker = LifecycleTracker::new();
        assert_matches!(
            tracker.begin("CAM-99").await,
            Err(TrackerError::UnknownEntity(_))
        );
    }

    #[tokio::test]
    async fn invalid_entity_id_rejected_at_track() {
        let tracker = LifecycleTracker::new();
        assert_matches!(tracker.track("").await, Err(TrackerError::Invalid(_)));
        assert_matches!(
            tracker.track("CAM 01").await,
            Err(TrackerError::Invalid(_))
        );
    }

    #[tokio::test]
    async fn stale_token_result_discarded() {
        let tracker = LifecycleTracker::new();
        tracker.track("INC-7").await.unwrap();

        // Request A is dispatched, then abandoned by the caller
        // (e.g. recorded as a timeout), freeing the slot.
        let token_a = tracker.begin("INC-7").await.unwrap();
        tracker.fail("INC-7", token_a, &service_error()).await;

        // Request B is dispatched and completes first.
        let token_b = tracker.begin("INC-7").await.unwrap();
        tracker.complete("INC-7", token_b, risk_data(30)).await;

        // A's real response arrives late: discarded, B's result wins.
        tracker.complete("INC-7", token_a, risk_data(95)).await;
        assert_eq!(tracker.result("INC-7").await, Some(risk_data(30)));
        assert!(!tracker.is_loading("INC-7").await);
    }

    #[tokio::test]
    async fn failure_preserves_last_known_result() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();

        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.complete("CAM-01", token, scan_data(false)).await;

        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.fail("CAM-01", token, &service_error()).await;

        assert!(!tracker.is_loading("CAM-01").await);
        assert_eq!(tracker.result("CAM-01").await, Some(scan_data(false)));
    }

    #[tokio::test]
    async fn failure_is_isolated_per_entity() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();
        tracker.track("CAM-02").await.unwrap();

        let t1 = tracker.begin("CAM-01").await.unwrap();
        tracker.complete("CAM-01", t1, scan_data(true)).await;

        let t2 = tracker.begin("CAM-02").await.unwrap();
        tracker.fail("CAM-02", t2, &service_error()).await;

        assert_eq!(tracker.result("CAM-01").await, Some(scan_data(true)));
        assert!(!tracker.is_loading("CAM-01").await);
        assert_eq!(tracker.result("CAM-02").await, None);
    }

    #[tokio::test]
    async fn late_resolution_after_removal_is_inert() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();

        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.remove("CAM-01").await;

        // Neither call may panic or resurrect state.
        tracker.complete("CAM-01", token, scan_data(true)).await;
        tracker.fail("CAM-01", token, &service_error()).await;

        assert!(!tracker.is_tracked("CAM-01").await);
        assert_eq!(tracker.result("CAM-01").await, None);
    }

    #[tokio::test]
    async fn tracking_is_idempotent() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();
        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.complete("CAM-01", token, scan_data(true)).await;

        // Re-tracking keeps the stored result.
        tracker.track("CAM-01").await.unwrap();
        assert_eq!(tracker.result("CAM-01").await, Some(scan_data(true)));
    }

    #[tokio::test]
    async fn tokens_are_monotonic_per_entity() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();
        tracker.track("CAM-02").await.unwrap();

        let a1 = tracker.begin("CAM-01").await.unwrap();
        tracker.complete("CAM-01", a1, scan_data(false)).await;
        let a2 = tracker.begin("CAM-01").await.unwrap();
        assert!(a2.sequence() > a1.sequence());

        // Sequences are per entity, not global.
        let b1 = tracker.begin("CAM-02").await.unwrap();
        assert_eq!(b1.sequence(), 1);
    }

    #[tokio::test]
    async fn result_update_emits_event() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();
        let mut rx = tracker.subscribe();

        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.complete("CAM-01", token, scan_data(true)).await;

        let event = rx.recv().await.unwrap();
        assert_matches!(
            event,
            EnrichmentEvent::ResultUpdated {
                entity_id,
                alert_triggered: Some(true),
                ..
            } if entity_id == "CAM-01"
        );
    }

    #[tokio::test]
    async fn failure_emits_event_without_result_update() {
        let tracker = LifecycleTracker::new();
        tracker.track("CAM-01").await.unwrap();
        let mut rx = tracker.subscribe();

        let token = tracker.begin("CAM-01").await.unwrap();
        tracker.fail("CAM-01", token, &service_error()).await;

        let event = rx.recv().await.unwrap();
        assert_matches!(
            event,
            EnrichmentEvent::EnrichmentFailed { entity_id, .. } if entity_id == "CAM-01"
        );
        assert!(rx.try_recv().is_err());
    }
}
