//! Metric sample types shared between sources and the dispatcher.

use serde::{Deserialize, Serialize};

/// A numeric observation value, integer or floating point.
///
/// The agent never interprets the magnitude or type of a value: it is
/// carried through to the wire exactly as the source produced it, so an
/// integer count serializes as a JSON integer rather than a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Integer(i64),
    Float(f64),
}

impl From<i64> for SampleValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SampleValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for SampleValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl std::fmt::Display for SampleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One metric observation produced by a source.
///
/// `label` is source-local and dot-segmented; the configured metric prefix
/// is joined onto it only at dispatch time. `time` is unix seconds chosen
/// by the source; the agent never stamps "now" on a sample's behalf.
/// Samples are immutable once created; ownership moves from the source to
/// the dispatcher untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub label: String,
    pub time: i64,
    pub value: SampleValue,
}

impl MetricSample {
    /// Create a sample from a label, a unix-seconds timestamp and a value.
    pub fn new(label: impl Into<String>, time: i64, value: impl Into<SampleValue>) -> Self {
        Self {
            label: label.into(),
            time,
            value: value.into(),
        }
    }
}
