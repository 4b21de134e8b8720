//! Shared entity and AI-engine wire types.
//!
//! The wire types mirror the JSON exchanged with the NSSPIP AI engine:
//! `POST /analyze/surveillance` for camera-feed object detection and
//! `POST /predict/risk-score` for incident risk scoring. Unknown
//! response fields (e.g. server-side timestamps) are ignored on
//! deserialization.

use serde::{Deserialize, Serialize};

/// Stable identifier of a monitored entity (camera feed or incident),
/// e.g. `"CAM-03"` or `"INC-7"`.
pub type EntityId = String;

/// Display status of a camera feed. Polling runs only while a feed is
/// [`FeedStatus::Live`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedStatus {
    Live,
    Recording,
    Offline,
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedStatus::Live => "LIVE",
            FeedStatus::Recording => "RECORDING",
            FeedStatus::Offline => "OFFLINE",
        };
        f.write_str(s)
    }
}

/// Time-of-day bucket sent with risk-scoring requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Day,
    Night,
}

/// Risk band assigned by the scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band for a raw score, using the engine's thresholds:
    /// `> 40` MEDIUM, `> 70` HIGH, `> 90` CRITICAL.
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s > 90 => RiskLevel::Critical,
            s if s > 70 => RiskLevel::High,
            s if s > 40 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// One object detected in a surveillance frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    /// Class label, e.g. `"person"`, `"abandoned_bag"`.
    pub label: String,
    /// Model confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// `[x, y, w, h]` in service pixel coordinates.
    pub bbox: [i32; 4],
}

/// Response of a surveillance scan for one feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// True when the engine saw something worth alerting on
    /// (weapons, abandoned bags).
    pub alert_triggered: bool,
    pub detected_objects: Vec<ObjectDetection>,
}

/// Response of a risk-scoring request for one incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite risk score in `0..=100`.
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub contributing_factors: Vec<String>,
}

/// Request payload accompanying an enrichment call. Varies by use
/// case: feeds send a stream/image reference, incidents send location
/// and a time-of-day bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EnrichmentContext {
    /// Surveillance scan of a camera feed.
    Scan {
        /// Reference to the frame or stream to analyze, if any.
        image_url: Option<String>,
    },
    /// Risk scoring of an incident location.
    Risk {
        latitude: f64,
        longitude: f64,
        time_of_day: TimeOfDay,
    },
}

/// Last-known enrichment result for an entity. At most one is retained
/// per entity id, overwritten wholesale by the most recently dispatched
/// request that completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnrichmentData {
    Scan(ScanResult),
    Risk(RiskAssessment),
}
