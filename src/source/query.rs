//! Warehouse query source.
//!
//! Runs a configured SQL query against a SQLite analytics database and
//! maps the result rows to samples. A fresh connection is opened for every
//! fetch, so the source carries no state between runs and stays safe to
//! invoke concurrently with other sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Connection, Row, TypeInfo, ValueRef};

use crate::cancel::CancelToken;
use crate::sample::{MetricSample, SampleValue};
use crate::source::{MetricsSource, SourceError};

fn default_enabled() -> bool {
    true
}

/// Configuration for one warehouse query.
///
/// The query must yield the columns `label` (TEXT), `time` (INTEGER, unix
/// seconds) and `value` (INTEGER or REAL). The query text itself is opaque
/// to the agent: timestamps, granularity and aggregation are the source's
/// own business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Unique name for this query instance, used in logs.
    pub name: String,
    /// SQLite connection URL, e.g. `sqlite:/var/lib/analytics/metrics.db`.
    pub database_url: String,
    /// SQL yielding `label`, `time`, `value` columns.
    pub query: String,
    /// Optional prefix joined onto every row's label with a dot.
    #[serde(default)]
    pub label_prefix: Option<String>,
    /// Enable this query (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Source executing one configured warehouse query per fetch.
#[derive(Debug)]
pub struct QuerySource {
    config: QueryConfig,
}

impl QuerySource {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    fn row_to_sample(&self, row: &SqliteRow) -> Result<MetricSample, SourceError> {
        let label: String = row.try_get("label")?;
        let time: i64 = row.try_get("time")?;
        let value = decode_value(row)?;

        let label = match &self.config.label_prefix {
            Some(prefix) => format!("{prefix}.{label}"),
            None => label,
        };

        Ok(MetricSample { label, time, value })
    }
}

/// Decode the `value` column preserving its SQLite storage class, so
/// integer counts stay integers on the wire.
fn decode_value(row: &SqliteRow) -> Result<SampleValue, SourceError> {
    let raw = row.try_get_raw("value")?;
    let type_name = raw.type_info().name().to_string();

    match type_name.as_str() {
        "INTEGER" => Ok(SampleValue::Integer(row.try_get("value")?)),
        "REAL" => Ok(SampleValue::Float(row.try_get("value")?)),
        other => Err(SourceError::MalformedRow(format!(
            "value column has type {other}, expected INTEGER or REAL"
        ))),
    }
}

#[async_trait]
impl MetricsSource for QuerySource {
    fn describe(&self) -> String {
        format!("query:{}", self.config.name)
    }

    async fn fetch(&self, _token: &CancelToken) -> Result<Vec<MetricSample>, SourceError> {
        tracing::debug!(query = %self.config.name, db = %self.config.database_url, "running warehouse query");

        let mut conn = SqliteConnection::connect(&self.config.database_url).await?;
        let rows = sqlx::query(&self.config.query).fetch_all(&mut conn).await?;

        let mut samples = Vec::with_capacity(rows.len());
        for row in &rows {
            samples.push(self.row_to_sample(row)?);
        }

        tracing::debug!(query = %self.config.name, count = samples.len(), "warehouse query done");
        Ok(samples)
    }
}
