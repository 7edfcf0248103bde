//! Probe results and the points they become in a target's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant used throughout the pipeline.
pub type Timestamp = DateTime<Utc>;

/// One probe result as produced by a sample source.
///
/// `latency_ms` is NaN when the probe failed or timed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub target: String,
    pub latency_ms: f64,
    pub sent_at: Timestamp,
    pub received_at: Option<Timestamp>,
}

impl Sample {
    /// A probe that was answered after `latency_ms`.
    pub fn reply(target: impl Into<String>, latency_ms: f64, sent_at: Timestamp) -> Self {
        let received_at = latency_ms
            .is_finite()
            .then(|| chrono::TimeDelta::microseconds((latency_ms * 1_000.0) as i64))
            .and_then(|rtt| sent_at.checked_add_signed(rtt));
        Self {
            target: target.into(),
            latency_ms,
            sent_at,
            received_at,
        }
    }

    /// A probe that was never answered.
    pub fn timeout(target: impl Into<String>, sent_at: Timestamp) -> Self {
        Self {
            target: target.into(),
            latency_ms: f64::NAN,
            sent_at,
            received_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.latency_ms.is_finite()
    }
}

/// Line-oriented wire form of a [`Sample`].
///
/// JSON has no NaN, so a missing reply is `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSample {
    pub target: String,
    pub latency_ms: Option<f64>,
    pub sent_at: Timestamp,
    #[serde(default)]
    pub received_at: Option<Timestamp>,
}

impl From<WireSample> for Sample {
    fn from(wire: WireSample) -> Self {
        Self {
            target: wire.target,
            latency_ms: wire.latency_ms.unwrap_or(f64::NAN),
            sent_at: wire.sent_at,
            received_at: wire.received_at,
        }
    }
}

impl From<&Sample> for WireSample {
    fn from(sample: &Sample) -> Self {
        Self {
            target: sample.target.clone(),
            latency_ms: sample.is_success().then_some(sample.latency_ms),
            sent_at: sample.sent_at,
            received_at: sample.received_at,
        }
    }
}

/// Lifecycle of a point in a target's history.
///
/// `Pending` may only move to `Success` or `Timeout`; `Interpolated` points
/// are synthesized and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointStatus {
    Pending,
    Success,
    Timeout,
    Interpolated,
}

/// A timestamped point in a target's rendered history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: Timestamp,
    pub value: f64,
    pub status: PointStatus,
}

impl DataPoint {
    /// Build the history point for a sample, keyed by its send time.
    pub fn from_sample(sample: &Sample) -> Self {
        let status = if sample.is_success() {
            PointStatus::Success
        } else {
            PointStatus::Timeout
        };
        Self {
            timestamp: sample.sent_at,
            value: sample.latency_ms,
            status,
        }
    }

    pub fn pending(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            value: f64::NAN,
            status: PointStatus::Pending,
        }
    }

    pub fn interpolated(timestamp: Timestamp, value: f64) -> Self {
        Self {
            timestamp,
            value,
            status: PointStatus::Interpolated,
        }
    }
}
