//! Running latency statistics.
//!
//! Mean and variance use Welford's online algorithm, so the accumulators stay
//! numerically stable however long the stream runs and no raw samples are kept.

use std::collections::BTreeMap;

use serde::Serialize;

use super::duration::format_latency;

/// Per-target counters, Welford accumulators and extrema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
    /// `+inf` until the first successful sample.
    pub min_latency: f64,
    /// `-inf` until the first successful sample.
    pub max_latency: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            packets_sent: 0,
            packets_received: 0,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min_latency: f64::INFINITY,
            max_latency: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    /// Account for one probe attempt. Only finite latencies reach the accumulators.
    pub fn record(&mut self, latency_ms: f64) {
        self.packets_sent += 1;
        if latency_ms.is_finite() {
            self.packets_received += 1;
            self.update(latency_ms);
            self.min_latency = self.min_latency.min(latency_ms);
            self.max_latency = self.max_latency.max(latency_ms);
        }
    }

    /// One Welford step. `value` must be finite.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Sample variance, undefined below two samples.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Loss as a percentage; 0 when nothing was sent.
    pub fn loss_percent(&self) -> f64 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        let lost = self.packets_sent.saturating_sub(self.packets_received);
        lost as f64 / self.packets_sent as f64 * 100.0
    }

    /// Highest latency seen so far, if any probe succeeded.
    pub fn ceiling(&self) -> Option<f64> {
        self.max_latency.is_finite().then_some(self.max_latency)
    }

    /// Formatted values for every [`Metric`].
    pub fn summarize(&self) -> BTreeMap<Metric, String> {
        let na = || "N/A".to_string();
        let mut summary = BTreeMap::new();
        summary.insert(Metric::Sent, self.packets_sent.to_string());
        summary.insert(Metric::Received, self.packets_received.to_string());
        summary.insert(Metric::Loss, format!("{:.1}%", self.loss_percent()));

        if self.packets_received > 0 {
            summary.insert(Metric::Mean, format_latency(self.mean));
            summary.insert(Metric::Min, format_latency(self.min_latency));
            summary.insert(Metric::Max, format_latency(self.max_latency));
            summary.insert(
                Metric::StdDev,
                self.std_dev().map(format_latency).unwrap_or_else(na),
            );
        } else {
            for metric in [Metric::Mean, Metric::Min, Metric::Max, Metric::StdDev] {
                summary.insert(metric, na());
            }
        }
        summary
    }
}

/// A column of the summary table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Metric {
    Sent,
    Received,
    Loss,
    Mean,
    Min,
    Max,
    StdDev,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Sent,
        Metric::Received,
        Metric::Loss,
        Metric::Mean,
        Metric::Min,
        Metric::Max,
        Metric::StdDev,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Sent => "Sent",
            Metric::Received => "Recv",
            Metric::Loss => "Loss",
            Metric::Mean => "Avg",
            Metric::Min => "Min",
            Metric::Max => "Max",
            Metric::StdDev => "StdDev",
        }
    }
}
