//! Fixed-batch mock source for exercising the pipeline end to end.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::sample::MetricSample;
use crate::source::{MetricsSource, SourceError};

/// Configuration stanza enabling the mock source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Enable this source (default: false).
    #[serde(default)]
    pub enabled: bool,
}

/// Source returning three fixed samples labeled `A`, `B` and `C`.
///
/// Useful for verifying credentials, prefixing and delivery without a real
/// backing system; pair it with `--dry-run` to preview the outgoing batch.
#[derive(Debug, Default)]
pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsSource for MockSource {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn fetch(&self, _token: &CancelToken) -> Result<Vec<MetricSample>, SourceError> {
        let now = Utc::now().timestamp();
        Ok(vec![
            MetricSample::new("A", now, 1.1111),
            MetricSample::new("B", now, 2.2222),
            MetricSample::new("C", now, 3.3333),
        ])
    }
}
