//! Events emitted by the enrichment core.
//!
//! These represent the state changes the presentation layer cares
//! about: a fresh result landed for an entity, an enrichment attempt
//! failed, or polling started/stopped for a feed. They are broadcast
//! on a [`tokio::sync::broadcast`] channel owned by the
//! [`LifecycleTracker`](crate::tracker::LifecycleTracker).

use chrono::{DateTime, Utc};
use serde::Serialize;

use nsspip_core::types::EntityId;

/// Why a feed's polling loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The feed's status transitioned away from `LIVE`.
    StatusChanged,
    /// The feed was explicitly removed from monitoring.
    Unmounted,
    /// The scheduler is shutting down.
    Shutdown,
}

/// A state change in the enrichment core.
#[derive(Debug, Clone, Serialize)]
pub enum EnrichmentEvent {
    /// A new enrichment result was stored for an entity.
    ResultUpdated {
        entity_id: EntityId,
        /// Scan alert flag; `None` for risk-scoring results.
        alert_triggered: Option<bool>,
        /// When the result was recorded (UTC).
        received_at: DateTime<Utc>,
    },

    /// An enrichment request failed. The entity's last-known result,
    /// if any, is preserved.
    EnrichmentFailed {
        entity_id: EntityId,
        /// Human-readable error description.
        error: String,
    },

    /// A feed entered the polling rotation.
    PollingStarted { entity_id: EntityId },

    /// A feed left the polling rotation.
    PollingStopped {
        entity_id: EntityId,
        reason: StopReason,
    },
}
