//! Pitcher Binary Entry Point
//!
//! This binary performs one collect-and-dispatch run over the configured
//! metric sources. Core functionality is provided by the `pitcher` library
//! crate.

use std::sync::Arc;

use clap::Parser;
use pitcher::{
    cancel,
    config::AgentConfig,
    Agent, Dispatcher, HttpIngestClient, MetricsSource, MockSource, QuerySource, SystemSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pitcher - Service Metrics Agent
#[derive(Parser, Debug)]
#[command(name = "pitcher", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/pitcher.yaml",
        env = "PITCHER_CONFIG"
    )]
    config: String,

    /// Log batches without posting them (overrides config file)
    #[arg(long, env = "PITCHER_DRY_RUN")]
    dry_run: bool,

    /// Service name (overrides config file)
    #[arg(long, env = "PITCHER_SERVICE")]
    service: Option<String>,

    /// Metric prefix (overrides config file)
    #[arg(long, env = "PITCHER_METRIC_PREFIX")]
    metric_prefix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pitcher=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Pitcher - Service Metrics Agent");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AgentConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(service) = cli.service {
        config.service = service;
    }
    if let Some(prefix) = cli.metric_prefix {
        config.metric_prefix = prefix;
    }

    tracing::info!(
        service = %config.service,
        prefix = %config.metric_prefix,
        dry_run = config.dry_run,
        "starting metric run"
    );

    let client = HttpIngestClient::new(
        &config.api_base,
        config.api_key.clone(),
        config.request_timeout,
    )?;
    let dispatcher = Dispatcher::new(
        Arc::new(client),
        config.service.clone(),
        config.metric_prefix.clone(),
        config.dry_run,
    );

    let mut agent = Agent::new(dispatcher);
    for source in build_sources(&config) {
        agent.register_source(source)?;
    }

    if agent.source_count() == 0 {
        tracing::warn!("no metric sources enabled, nothing to do");
    }

    let (canceller, token) = cancel::pair();
    tokio::spawn(async move {
        shutdown_signal().await;
        canceller.cancel();
    });

    agent.run(&token).await?;

    tracing::info!("run complete");
    Ok(())
}

/// Build the enabled metric sources from configuration.
fn build_sources(config: &AgentConfig) -> Vec<Arc<dyn MetricsSource>> {
    let mut sources: Vec<Arc<dyn MetricsSource>> = Vec::new();

    if config.sources.mock.enabled {
        sources.push(Arc::new(MockSource::new()));
    }
    if config.sources.system.enabled {
        sources.push(Arc::new(SystemSource::new()));
    }
    for query in &config.sources.query {
        if !query.enabled {
            tracing::debug!(query = %query.name, "skipping disabled query source");
            continue;
        }
        sources.push(Arc::new(QuerySource::new(query.clone())));
    }

    sources
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the env var cannot race a parallel parse.
    #[test]
    fn test_cli_dry_run_flag_and_env() {
        let cli = Cli::try_parse_from(["pitcher", "--dry-run"]).unwrap();
        assert!(cli.dry_run);

        std::env::set_var("PITCHER_DRY_RUN", "true");
        let cli = Cli::try_parse_from(["pitcher"]).unwrap();
        assert!(cli.dry_run);

        std::env::remove_var("PITCHER_DRY_RUN");
        let cli = Cli::try_parse_from(["pitcher"]).unwrap();
        assert!(!cli.dry_run);
    }
}
