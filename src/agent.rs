//! Metric collection orchestration.
//!
//! The [`Agent`] owns the registered sources and one [`Dispatcher`]. A run
//! fans out over all sources concurrently, each worker fetching its samples
//! and handing them to the dispatcher. The first failure wins: it is
//! reported with the identity of the failing source and the remaining
//! workers are abandoned.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::cancel::CancelToken;
use crate::dispatch::Dispatcher;
use crate::remote::DeliverError;
use crate::source::{MetricsSource, SourceError};

/// Errors surfaced by an agent run, always carrying the identity of the
/// source that was being processed.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A source failed while fetching its samples.
    #[error("source {source} failed to fetch metrics")]
    Fetch {
        source: String,
        #[source]
        cause: SourceError,
    },

    /// A source fetched fine but its batch could not be delivered.
    #[error("failed to deliver metrics from source {source}")]
    Deliver {
        source: String,
        #[source]
        cause: DeliverError,
    },

    /// The run was cancelled while this source was still being processed.
    #[error("cancelled while processing source {0}")]
    Cancelled(String),

    /// A source worker panicked or was aborted by the runtime.
    #[error("source worker failed")]
    Worker(#[from] tokio::task::JoinError),
}

/// Orchestrates fetching from all registered sources and dispatching the
/// results.
pub struct Agent {
    dispatcher: Dispatcher,
    sources: Vec<Arc<dyn MetricsSource>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("dispatcher", &self.dispatcher)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl Agent {
    /// Create an agent with no sources registered yet.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sources: Vec::new(),
        }
    }

    /// Add a source to the processing set.
    ///
    /// # Errors
    /// Registration currently always succeeds.
    pub fn register_source(&mut self, source: Arc<dyn MetricsSource>) -> Result<(), AgentError> {
        tracing::debug!(source = %source.describe(), "registered metric source");
        self.sources.push(source);
        Ok(())
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Process every registered source once, concurrently.
    ///
    /// Returns `Ok` only if every source fetched and dispatched
    /// successfully. A run with no sources succeeds trivially.
    ///
    /// # Errors
    /// The first observed failure is returned and the remaining workers are
    /// abandoned. Cancellation through `token` surfaces as
    /// [`AgentError::Cancelled`] naming one of the sources still in flight.
    pub async fn run(&self, token: &CancelToken) -> Result<(), AgentError> {
        if self.dispatcher.dry_run() {
            tracing::info!("dry run: metrics will be logged, not delivered");
        }
        tracing::info!(sources = self.sources.len(), "processing metric sources");

        let mut workers = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let dispatcher = self.dispatcher.clone();
            let token = token.clone();

            workers.spawn(async move {
                let name = source.describe();
                tracing::debug!(source = %name, "processing source");

                // Biased so a token cancelled before the worker starts is
                // seen before any fetch work happens.
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::warn!(source = %name, "cancelled while processing source");
                        Err(AgentError::Cancelled(name.clone()))
                    }
                    result = fetch_and_send(source.as_ref(), &dispatcher, &token, &name) => result,
                }
            });
        }

        while let Some(outcome) = workers.join_next().await {
            outcome??;
        }

        tracing::info!("all metric sources processed");
        Ok(())
    }
}

async fn fetch_and_send(
    source: &dyn MetricsSource,
    dispatcher: &Dispatcher,
    token: &CancelToken,
    name: &str,
) -> Result<(), AgentError> {
    let samples = source
        .fetch(token)
        .await
        .map_err(|cause| AgentError::Fetch {
            source: name.to_string(),
            cause,
        })?;

    tracing::debug!(source = %name, count = samples.len(), "source fetched samples");

    dispatcher
        .send(samples)
        .await
        .map_err(|cause| AgentError::Deliver {
            source: name.to_string(),
            cause,
        })
}
