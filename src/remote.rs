//! Ingest API wire types and client.
//!
//! Defines the service metric record posted to the ingest endpoint and the
//! HTTP client that delivers batches of them. The wire shape matches the
//! Mackerel service metrics API, so any compatible receiver works.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::{MetricSample, SampleValue};

/// Default ingest API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.mackerelio.com";

/// Header carrying the ingest API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Errors raised while delivering metrics to the ingest API.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The configured ingest base URL is not a valid URL.
    #[error("invalid ingest endpoint: {0}")]
    Endpoint(String),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The ingest API answered with a non-success status.
    #[error("ingest API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// One metric record as posted to the ingest API.
///
/// `name` is the fully qualified wire name, already carrying the service
/// prefix. `time` stays unix seconds and `value` keeps the integer/float
/// distinction of the originating sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetric {
    pub name: String,
    pub time: i64,
    pub value: SampleValue,
}

impl ServiceMetric {
    /// Build the wire record for a sample by joining the prefix and the
    /// sample label with a dot.
    pub fn from_sample(prefix: &str, sample: MetricSample) -> Self {
        Self {
            name: format!("{prefix}.{}", sample.label),
            time: sample.time,
            value: sample.value,
        }
    }
}

impl std::fmt::Display for ServiceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[name: {} time: {} value: {}]",
            self.name, self.time, self.value
        )
    }
}

/// Client-side contract for the ingest API.
///
/// Abstracting the client keeps delivery testable without a live endpoint.
#[async_trait]
pub trait IngestClient: Send + Sync {
    /// Post a batch of metrics for the given service.
    async fn post_metrics(
        &self,
        service: &str,
        metrics: &[ServiceMetric],
    ) -> Result<(), DeliverError>;
}

/// HTTP implementation of [`IngestClient`].
pub struct HttpIngestClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpIngestClient {
    /// Create a client for the given API base URL.
    ///
    /// # Errors
    /// Returns `DeliverError::Endpoint` if the base URL does not parse, or
    /// `DeliverError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliverError> {
        Url::parse(base_url)
            .map_err(|e| DeliverError::Endpoint(format!("{base_url}: {e}")))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn service_url(&self, service: &str) -> String {
        format!("{}/api/v0/services/{service}/tsdb", self.base_url)
    }
}

impl std::fmt::Debug for HttpIngestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIngestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IngestClient for HttpIngestClient {
    async fn post_metrics(
        &self,
        service: &str,
        metrics: &[ServiceMetric],
    ) -> Result<(), DeliverError> {
        let url = self.service_url(service);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&metrics)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliverError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sample_joins_prefix_and_label() {
        let sample = MetricSample::new("A", 1_700_000_000, 1.1111);
        let metric = ServiceMetric::from_sample("dummy", sample);

        assert_eq!(metric.name, "dummy.A");
        assert_eq!(metric.time, 1_700_000_000);
        assert_eq!(metric.value, SampleValue::Float(1.1111));
    }

    #[test]
    fn test_service_metric_display() {
        let metric =
            ServiceMetric::from_sample("dummy", MetricSample::new("A", 1_700_000_000, 1.1111));
        assert_eq!(
            metric.to_string(),
            "[name: dummy.A time: 1700000000 value: 1.1111]"
        );

        let metric =
            ServiceMetric::from_sample("app", MetricSample::new("requests", 1_700_000_000, 42));
        assert_eq!(
            metric.to_string(),
            "[name: app.requests time: 1700000000 value: 42]"
        );
    }

    #[test]
    fn test_service_metric_wire_shape() {
        let metric =
            ServiceMetric::from_sample("dummy", MetricSample::new("A", 1_700_000_000, 1.1111));
        let json = serde_json::to_value(&metric).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"name": "dummy.A", "time": 1_700_000_000, "value": 1.1111})
        );
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        let err = HttpIngestClient::new("not a url", "key", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, DeliverError::Endpoint(_)));
    }

    #[test]
    fn test_service_url_trims_trailing_slash() {
        let client =
            HttpIngestClient::new("http://127.0.0.1:9/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.service_url("front"),
            "http://127.0.0.1:9/api/v0/services/front/tsdb"
        );
    }
}
