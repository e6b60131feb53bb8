//! Pitcher - Service Metrics Agent
//!
//! This crate collects metric samples from heterogeneous sources and posts
//! them to a Mackerel-compatible ingest API. It can be used as a library by
//! other Rust projects, or run as a one-shot job with the `pitcher`
//! executable.
//!
//! # Architecture
//!
//! - **Sources**: Sample collection (mock, host system, warehouse queries)
//! - **Dispatch**: Wire transform and delivery to the ingest API
//! - **Agent**: Concurrent fan-out over all registered sources
//! - **Cancel**: Cooperative cancellation for in-flight runs
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pitcher::{Agent, CancelToken, Dispatcher, HttpIngestClient, MockSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpIngestClient::new(
//!         "https://api.mackerelio.com",
//!         "api-key",
//!         Duration::from_secs(30),
//!     )?;
//!     let dispatcher = Dispatcher::new(Arc::new(client), "front", "dummy", true);
//!
//!     let mut agent = Agent::new(dispatcher);
//!     agent.register_source(Arc::new(MockSource::new()))?;
//!     agent.run(&CancelToken::never()).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod remote;
pub mod sample;
pub mod source;

pub use agent::{Agent, AgentError};
pub use cancel::{CancelToken, Canceller};
pub use config::{AgentConfig, ConfigError, SourcesConfig};
pub use dispatch::Dispatcher;
pub use remote::{DeliverError, HttpIngestClient, IngestClient, ServiceMetric};
pub use sample::{MetricSample, SampleValue};
pub use source::{MetricsSource, MockSource, QuerySource, SourceError, SystemSource};
