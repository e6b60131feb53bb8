//! Metric dispatch to the ingest API.
//!
//! The [`Dispatcher`] owns the wire transform (service prefix joining) and
//! the delivery decision. Every batch is previewed in the log record by
//! record before anything leaves the process, so a dry run shows exactly
//! what a real run would post.

use std::sync::Arc;

use crate::remote::{DeliverError, IngestClient, ServiceMetric};
use crate::sample::MetricSample;

/// Transforms samples into wire records and posts them for one service.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn IngestClient>,
    service: String,
    prefix: String,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn IngestClient>,
        service: impl Into<String>,
        prefix: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            service: service.into(),
            prefix: prefix.into(),
            dry_run,
        }
    }

    /// Whether this dispatcher is in dry-run mode.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Transform a batch of samples and post it to the ingest API.
    ///
    /// In dry-run mode the batch is logged but never posted. Outside of
    /// dry-run an empty batch is still posted; the receiver decides what
    /// an empty submission means.
    pub async fn send(&self, samples: Vec<MetricSample>) -> Result<(), DeliverError> {
        let metrics: Vec<ServiceMetric> = samples
            .into_iter()
            .map(|sample| ServiceMetric::from_sample(&self.prefix, sample))
            .collect();

        tracing::info!(service = %self.service, count = metrics.len(), "will throw metric values");
        for metric in &metrics {
            tracing::info!("{}", metric);
        }

        if self.dry_run {
            tracing::info!("metrics not thrown (dry run)");
            return Ok(());
        }

        self.client.post_metrics(&self.service, &metrics).await?;
        tracing::info!(service = %self.service, count = metrics.len(), "metrics thrown");
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service", &self.service)
            .field("prefix", &self.prefix)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleValue;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(String, Vec<ServiceMetric>)>>,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<(String, Vec<ServiceMetric>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IngestClient for RecordingClient {
        async fn post_metrics(
            &self,
            service: &str,
            metrics: &[ServiceMetric],
        ) -> Result<(), DeliverError> {
            self.calls
                .lock()
                .unwrap()
                .push((service.to_string(), metrics.to_vec()));
            Ok(())
        }
    }

    /// Collects formatted log output so tests can inspect it.
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn samples() -> Vec<MetricSample> {
        vec![
            MetricSample::new("A", 1_700_000_000, 1.1111),
            MetricSample::new("B", 1_700_000_000, 7),
        ]
    }

    #[tokio::test]
    async fn test_send_applies_prefix_and_posts() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone(), "front", "app", false);

        dispatcher.send(samples()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        let (service, metrics) = &calls[0];
        assert_eq!(service, "front");
        assert_eq!(metrics[0].name, "app.A");
        assert_eq!(metrics[0].value, SampleValue::Float(1.1111));
        assert_eq!(metrics[1].name, "app.B");
        assert_eq!(metrics[1].value, SampleValue::Integer(7));
    }

    #[tokio::test]
    async fn test_dry_run_never_posts() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone(), "front", "app", true);

        dispatcher.send(samples()).await.unwrap();

        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_still_previews_each_record() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone(), "front", "app", true);

        let capture = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();

        let guard = tracing::subscriber::set_default(subscriber);
        dispatcher.send(samples()).await.unwrap();
        drop(guard);

        let output = capture.contents();
        assert!(output.contains("[name: app.A time: 1700000000 value: 1.1111]"));
        assert!(output.contains("[name: app.B time: 1700000000 value: 7]"));
        assert!(output.contains("metrics not thrown (dry run)"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_still_posted() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone(), "front", "app", false);

        dispatcher.send(Vec::new()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_empty_batch_never_posts() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone(), "front", "app", true);

        dispatcher.send(Vec::new()).await.unwrap();

        assert!(client.calls().is_empty());
    }
}
