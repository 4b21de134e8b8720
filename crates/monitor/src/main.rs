//! `nsspip-monitor` -- surveillance polling daemon.
//!
//! Polls the NSSPIP AI engine for every configured camera feed on a
//! fixed cadence, reconciles detection results into overlay
//! annotations, and logs them. Runs until Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default | Description                                  |
//! |----------------------|----------|---------|----------------------------------------------|
//! | `AI_ENGINE_URL`      | yes      | --      | Engine base URL, e.g. `http://host:8000/api/ai` |
//! | `FEED_IDS`           | no       | `CAM-01,CAM-02,CAM-03` | Comma-separated feed ids      |
//! | `POLL_INTERVAL_SECS` | no       | `5`     | Seconds between poll ticks per feed          |
//! | `SURFACE_WIDTH`      | no       | `640`   | Rendered feed width in pixels                |
//! | `SURFACE_HEIGHT`     | no       | `480`   | Rendered feed height in pixels               |

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nsspip_core::overlay::{reconcile_annotations, SurfaceGeometry};
use nsspip_core::types::{EnrichmentContext, EnrichmentData, FeedStatus};
use nsspip_enrichment::client::AiEngineClient;
use nsspip_enrichment::events::EnrichmentEvent;
use nsspip_enrichment::scheduler::PollScheduler;
use nsspip_enrichment::status::StatusTable;
use nsspip_enrichment::tracker::LifecycleTracker;

/// Default interval between poll ticks.
const DEFAULT_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nsspip_monitor=info,nsspip_enrichment=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let engine_url = std::env::var("AI_ENGINE_URL").unwrap_or_else(|_| {
        tracing::error!("AI_ENGINE_URL environment variable is required");
        std::process::exit(1);
    });

    let feed_ids: Vec<String> = std::env::var("FEED_IDS")
        .unwrap_or_else(|_| "CAM-01,CAM-02,CAM-03".into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    let surface = SurfaceGeometry {
        width: env_or("SURFACE_WIDTH", 640),
        height: env_or("SURFACE_HEIGHT", 480),
    };

    tracing::info!(
        engine_url = %engine_url,
        feeds = feed_ids.len(),
        interval_secs,
        "Starting surveillance monitor",
    );

    let tracker = Arc::new(LifecycleTracker::new());
    let client = Arc::new(AiEngineClient::new(engine_url));
    let status = Arc::new(StatusTable::new());
    for feed_id in &feed_ids {
        status.set(feed_id, FeedStatus::Live);
    }

    let scheduler = PollScheduler::new(
        Arc::clone(&tracker),
        client,
        Arc::clone(&status) as Arc<dyn nsspip_enrichment::status::StatusSource>,
    )
    .with_poll_interval(Duration::from_secs(interval_secs));

    let mut events = tracker.subscribe();

    for feed_id in &feed_ids {
        let context = EnrichmentContext::Scan {
            image_url: Some("live_stream_placeholder".to_string()),
        };
        if let Err(e) = scheduler.start_feed(feed_id, context).await {
            tracing::error!(entity_id = %feed_id, error = %e, "Failed to start feed");
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => handle_event(&tracker, &surface, event).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event subscriber lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    scheduler.shutdown().await;
}

/// Log the overlay state implied by one enrichment event.
async fn handle_event(tracker: &LifecycleTracker, surface: &SurfaceGeometry, event: EnrichmentEvent) {
    match event {
        EnrichmentEvent::ResultUpdated { entity_id, alert_triggered, .. } => {
            if let Some(EnrichmentData::Scan(scan)) = tracker.result(&entity_id).await {
                let annotations = reconcile_annotations(&scan, surface);
                tracing::info!(
                    entity_id = %entity_id,
                    detections = annotations.len(),
                    alert = alert_triggered.unwrap_or(false),
                    "Scan result updated",
                );
                for annotation in &annotations {
                    tracing::info!(
                        entity_id = %entity_id,
                        caption = %annotation.caption(),
                        x = annotation.rect.x,
                        y = annotation.rect.y,
                        in_frame = annotation.fits_within(surface),
                        "Detection overlay",
                    );
                }
            }
        }
        EnrichmentEvent::EnrichmentFailed { entity_id, error } => {
            // Already logged at source; keep the event visible at debug.
            tracing::debug!(entity_id = %entity_id, error = %error, "Enrichment failed");
        }
        EnrichmentEvent::PollingStarted { entity_id } => {
            tracing::info!(entity_id = %entity_id, "Polling started");
        }
        EnrichmentEvent::PollingStopped { entity_id, reason } => {
            tracing::info!(entity_id = %entity_id, reason = ?reason, "Polling stopped");
        }
    }
}

/// Parse a numeric env var, falling back to `default` when unset or
/// unparseable.
fn env_or(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
