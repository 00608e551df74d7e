//! HTTP client for the interview storage backend.
//!
//! Mirrors events and interview summaries to the backend's `/api/events`
//! and `/api/interviews` endpoints.

use crate::core::events::EventRecord;
use crate::error::GatewayError;
use crate::session::InterviewSummary;
use crate::sink::{Deliver, SinkRecord};
use serde::Serialize;
use std::time::Duration;

/// Backend location.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL without trailing slash, e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Build from host and port on plain HTTP.
    pub fn local(host: &str, port: u16) -> Self {
        Self::new(format!("http://{host}:{port}"))
    }

    pub fn events_url(&self) -> String {
        format!("{}/api/events", self.base_url)
    }

    pub fn interviews_url(&self) -> String {
        format!("{}/api/interviews", self.base_url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

/// Client for the storage backend.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Test connection to the backend.
    pub async fn test_connection(&self) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    pub async fn post_event(&self, record: &EventRecord) -> Result<(), GatewayError> {
        self.post_json(&self.config.events_url(), record).await
    }

    pub async fn post_interview(&self, summary: &InterviewSummary) -> Result<(), GatewayError> {
        self.post_json(&self.config.interviews_url(), summary).await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

impl Deliver for GatewayClient {
    async fn deliver(&self, record: SinkRecord) -> Result<(), GatewayError> {
        match record {
            SinkRecord::Event(event) => self.post_event(&event).await,
            SinkRecord::Interview(summary) => self.post_interview(&summary).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_urls() {
        let config = GatewayConfig::new("http://127.0.0.1:5000/");
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.events_url(), "http://127.0.0.1:5000/api/events");
        assert_eq!(config.interviews_url(), "http://127.0.0.1:5000/api/interviews");
        assert_eq!(config.health_url(), "http://127.0.0.1:5000/health");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let client = GatewayClient::new(GatewayConfig::local("127.0.0.1", 9)).unwrap();
        let record = EventRecord {
            interview_id: "1".to_string(),
            timestamp: "2024-01-22T10:00:00.000Z".to_string(),
            message: "Interview ended".to_string(),
            kind: None,
        };
        assert!(matches!(
            client.post_event(&record).await,
            Err(GatewayError::Network(_))
        ));
    }
}
