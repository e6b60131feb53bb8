//! Metrics sources.
//!
//! A source is anything that can produce a batch of [`MetricSample`]s:
//! a warehouse query, a host probe, or the fixed mock batch. The agent
//! treats every implementation identically through [`MetricsSource`] and
//! fetches all registered sources concurrently, so implementations must
//! not rely on shared mutable state.
//!
//! # Example
//!
//! ```rust,no_run
//! use pitcher::{CancelToken, MetricsSource, MockSource};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let source = MockSource::new();
//! let samples = source.fetch(&CancelToken::never()).await?;
//! assert_eq!(samples.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod query;
pub mod system;

pub use mock::{MockConfig, MockSource};
pub use query::{QueryConfig, QuerySource};
pub use system::{SystemConfig, SystemSource};

use async_trait::async_trait;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::sample::MetricSample;

/// Errors a source can report from [`MetricsSource::fetch`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// Warehouse query failed (connect, execute or fetch).
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    /// A result row could not be mapped to a sample.
    #[error("malformed sample row: {0}")]
    MalformedRow(String),

    /// Source-specific failure outside the built-in categories.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A producer of metric samples.
///
/// Implementations may perform arbitrary I/O but must return an error
/// rather than a partial result when the underlying query fails outright.
/// Samples are immutable once returned and carry timestamps chosen by the
/// source itself. Fetches of unrelated sources run concurrently.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Stable, cheap, human-readable identifier used in logs and error
    /// messages.
    fn describe(&self) -> String;

    /// Produce one batch of samples.
    ///
    /// `token` signals cancellation of the surrounding run; long-running
    /// implementations should honor it where feasible. The agent also
    /// races the whole fetch against the token, so ignoring it only delays
    /// how soon the work is abandoned, never whether the run returns.
    async fn fetch(&self, token: &CancelToken) -> Result<Vec<MetricSample>, SourceError>;
}
