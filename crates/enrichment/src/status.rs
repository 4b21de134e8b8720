//! Entity-status collaborator for the poll scheduler.

use std::collections::HashMap;
use std::sync::RwLock;

use nsspip_core::types::{EntityId, FeedStatus};

/// Tells the poll scheduler whether a feed should keep polling.
///
/// Lookups are synchronous and must not block: the scheduler consults
/// the source on every tick, before dispatching a request.
pub trait StatusSource: Send + Sync {
    /// Current status of a feed, or `None` if the feed is unknown.
    fn status(&self, entity_id: &str) -> Option<FeedStatus>;
}

/// Shared in-memory status table.
///
/// The presentation layer (or a test) updates it with
/// [`StatusTable::set`]; the scheduler reads it on each tick.
#[derive(Default)]
pub struct StatusTable {
    statuses: RwLock<HashMap<EntityId, FeedStatus>>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or update a feed's status.
    pub fn set(&self, entity_id: &str, status: FeedStatus) {
        self.statuses
            .write()
            .expect("status table lock poisoned")
            .insert(entity_id.to_string(), status);
    }
}

impl StatusSource for StatusTable {
    fn status(&self, entity_id: &str) -> Option<FeedStatus> {
        self.statuses
            .read()
            .expect("status table lock poisoned")
            .get(entity_id)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_feed_has_no_status() {
        let table = StatusTable::new();
        assert_eq!(table.status("CAM-99"), None);
    }

    #[test]
    fn set_overwrites_previous_status() {
        let table = StatusTable::new();
        table.set("CAM-01", FeedStatus::Live);
        assert_eq!(table.status("CAM-01"), Some(FeedStatus::Live));
        table.set("CAM-01", FeedStatus::Offline);
        assert_eq!(table.status("CAM-01"), Some(FeedStatus::Offline));
    }
}
