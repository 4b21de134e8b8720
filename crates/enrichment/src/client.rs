//! HTTP client for the NSSPIP AI engine.
//!
//! Wraps the engine's two enrichment endpoints (surveillance scan and
//! risk scoring) using [`reqwest`]. One request is a single round
//! trip: no internal retry, the caller owns the retry policy. The
//! returned future can be dropped or its resolution discarded at any
//! point without side effects beyond the network call itself.

use async_trait::async_trait;

use nsspip_core::types::{EnrichmentContext, EnrichmentData, RiskAssessment, ScanResult};

/// Errors from the enrichment client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP round trip itself failed (timeout, DNS, connection).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The engine answered with a non-2xx status or a payload that
    /// does not parse.
    #[error("AI engine error ({status}): {body}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Raw response body, or a description of the parse failure.
        body: String,
    },
}

/// Issues a single annotate-or-score request for one entity.
///
/// Implemented by [`AiEngineClient`] in production and by in-memory
/// doubles in tests.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Enrich one entity. Exactly one round trip against the external
    /// service; the result is safe to discard if the caller no longer
    /// needs it.
    async fn enrich(
        &self,
        entity_id: &str,
        context: &EnrichmentContext,
    ) -> Result<EnrichmentData, ClientError>;
}

/// HTTP client for one AI engine deployment.
pub struct AiEngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl AiEngineClient {
    /// Create a new client.
    ///
    /// * `base_url` - engine base URL, e.g. `http://host:8000/api/ai`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across deployments).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    // ---- private helpers ----

    /// Parse a response body into the expected type, mapping non-2xx
    /// statuses and malformed payloads to [`ClientError::Service`].
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Service {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Service {
            status: status.as_u16(),
            body: format!("Malformed payload: {e}"),
        })
    }
}

#[async_trait]
impl EnrichmentClient for AiEngineClient {
    async fn enrich(
        &self,
        entity_id: &str,
        context: &EnrichmentContext,
    ) -> Result<EnrichmentData, ClientError> {
        match context {
            EnrichmentContext::Scan { image_url } => {
                let body = serde_json::json!({
                    "feed_id": entity_id,
                    "image_url": image_url,
                });

                let response = self
                    .client
                    .post(format!("{}/analyze/surveillance", self.base_url))
                    .json(&body)
                    .send()
                    .await?;

                let scan: ScanResult = Self::parse_response(response).await?;
                Ok(EnrichmentData::Scan(scan))
            }
            EnrichmentContext::Risk {
                latitude,
                longitude,
                time_of_day,
            } => {
                let body = serde_json::json!({
                    "latitude": latitude,
                    "longitude": longitude,
                    "time_of_day": time_of_day,
                });

                let response = self
                    .client
                    .post(format!("{}/predict/risk-score", self.base_url))
                    .json(&body)
                    .send()
                    .await?;

                let risk: RiskAssessment = Self::parse_response(response).await?;
                Ok(EnrichmentData::Risk(risk))
            }
        }
    }
}
