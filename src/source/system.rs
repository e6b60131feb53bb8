//! Host metrics source: load averages, memory and uptime.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::cancel::CancelToken;
use crate::sample::MetricSample;
use crate::source::{MetricsSource, SourceError};

/// Configuration stanza enabling the host metrics source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Enable this source (default: false).
    #[serde(default)]
    pub enabled: bool,
}

/// Source sampling the local host through sysinfo.
///
/// Labels are source-local (`load.1`, `memory.used`, ...); the configured
/// metric prefix is applied at dispatch time like for every other source.
/// Memory figures are bytes and stay integers on the wire.
#[derive(Debug, Default)]
pub struct SystemSource;

impl SystemSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsSource for SystemSource {
    fn describe(&self) -> String {
        "system".to_string()
    }

    async fn fetch(&self, _token: &CancelToken) -> Result<Vec<MetricSample>, SourceError> {
        let mut system = System::new();
        system.refresh_memory();

        let now = Utc::now().timestamp();
        let load = System::load_average();

        let samples = vec![
            MetricSample::new("load.1", now, load.one),
            MetricSample::new("load.5", now, load.five),
            MetricSample::new("load.15", now, load.fifteen),
            MetricSample::new("memory.total", now, system.total_memory() as i64),
            MetricSample::new("memory.used", now, system.used_memory() as i64),
            MetricSample::new("memory.available", now, system.available_memory() as i64),
            MetricSample::new("memory.swap_total", now, system.total_swap() as i64),
            MetricSample::new("memory.swap_used", now, system.used_swap() as i64),
            MetricSample::new("uptime", now, System::uptime() as i64),
        ];

        Ok(samples)
    }
}
