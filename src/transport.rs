//! Outbound transmission of event batches.
//!
//! The [`Transport`] trait is the seam between the delivery pipeline and the
//! network. [`HttpTransport`] is the production implementation: one POST per
//! batch over a pooled reqwest client, with the response status mapped to a
//! [`TransportError`] the pipeline can classify. Retries are not done here;
//! the pipeline owns the retry schedule.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;
use crate::event::Event;

/// SDK name reported with every batch.
pub const SDK_NAME: &str = "alertline";

/// SDK version reported with every batch.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identification of the sending library.
#[derive(Debug, Clone, Serialize)]
pub struct SdkInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for SdkInfo {
    fn default() -> Self {
        Self {
            name: SDK_NAME,
            version: SDK_VERSION,
        }
    }
}

/// A batch of events submitted in one transmission.
#[derive(Debug, Clone, Serialize)]
pub struct EventBatch {
    pub sdk: SdkInfo,
    pub sent_at: DateTime<Utc>,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            sdk: SdkInfo::default(),
            sent_at: Utc::now(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Delivers one batch to the collector. A single attempt, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &EventBatch) -> Result<(), TransportError>;
}

/// HTTP transport posting JSON batches to the collector.
///
/// The underlying reqwest client is reused across sends for connection
/// pooling. The timeout applies per attempt.
pub struct HttpTransport {
    client: Client,
    ingest_url: String,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint and API key.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::BuildHttpClient` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        Self::with_settings(
            config.ingest_url(),
            config.endpoint.clone(),
            config.request_timeout,
        )
    }

    /// Create a transport posting to an explicit URL.
    pub fn with_settings(
        ingest_url: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", SDK_NAME, SDK_VERSION))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(TransportError::BuildHttpClient)?;

        Ok(Self {
            client,
            ingest_url: ingest_url.into(),
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Base endpoint, without the API key.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &EventBatch) -> Result<(), TransportError> {
        // The ingest URL embeds the API key, so only the endpoint is logged
        debug!(
            batch_size = batch.len(),
            endpoint = %self.endpoint,
            "Sending event batch"
        );

        let body = serde_json::to_vec(batch).map_err(TransportError::Serialize)?;

        let response = self
            .client
            .post(&self.ingest_url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
