//! Shared test doubles for scheduler and dispatcher tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use nsspip_core::types::{
    EnrichmentContext, EnrichmentData, ObjectDetection, RiskAssessment, RiskLevel, ScanResult,
};
use nsspip_enrichment::client::{ClientError, EnrichmentClient};

/// Programmable in-memory enrichment client.
///
/// Records every call, optionally delays each response, and can be
/// configured to fail for specific entity ids.
pub struct MockClient {
    delay: Duration,
    fail_entities: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail_entities: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer every request for `entity_id` with a service error.
    pub fn failing_for(mut self, entity_id: &str) -> Self {
        self.fail_entities.insert(entity_id.to_string());
        self
    }

    /// Number of requests issued for one entity.
    pub fn call_count(&self, entity_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == entity_id)
            .count()
    }

    /// Number of requests issued in total.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EnrichmentClient for MockClient {
    async fn enrich(
        &self,
        entity_id: &str,
        context: &EnrichmentContext,
    ) -> Result<EnrichmentData, ClientError> {
        self.calls.lock().unwrap().push(entity_id.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_entities.contains(entity_id) {
            return Err(ClientError::Service {
                status: 503,
                body: "engine unavailable".to_string(),
            });
        }

        Ok(match context {
            EnrichmentContext::Scan { .. } => EnrichmentData::Scan(ScanResult {
                alert_triggered: true,
                detected_objects: vec![ObjectDetection {
                    label: "person".to_string(),
                    confidence: 0.92,
                    bbox: [10, 10, 50, 80],
                }],
            }),
            EnrichmentContext::Risk { .. } => EnrichmentData::Risk(RiskAssessment {
                risk_score: 83,
                risk_level: RiskLevel::High,
                contributing_factors: vec!["Historical crime density high".to_string()],
            }),
        })
    }
}
