//! Per-target history with time alignment and gap interpolation.
//!
//! Points are ordered by probe send time, not arrival time. When a target
//! leaves a timeout, the gap is bridged with synthesized points so a single
//! missed probe does not punch a notch into the chart:
//!
//! ```text
//! Timeout ──▶ Success : ramp from the ceiling down to the new value
//! Timeout ──▶ Timeout : NaN fillers (continuous "no data" region)
//! anything else       : no synthesis
//! ```

use std::collections::{BTreeMap, VecDeque};

use chrono::TimeDelta;

use super::sample::{DataPoint, PointStatus, Sample, Timestamp};
use super::stats::{Metric, RunningStats};

/// Bounds applied to every series of a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPolicy {
    /// Maximum number of retained points per target.
    pub capacity: usize,
    /// Spacing of synthesized points.
    pub tick: TimeDelta,
}

/// Aggregate state for one target.
#[derive(Debug, Clone)]
pub struct Series {
    pub target: String,
    history: VecDeque<DataPoint>,
    pub stats: RunningStats,
    pub summary: BTreeMap<Metric, String>,
}

impl Series {
    pub fn new(target: impl Into<String>) -> Self {
        let stats = RunningStats::default();
        let summary = stats.summarize();
        Self {
            target: target.into(),
            history: VecDeque::new(),
            stats,
            summary,
        }
    }

    /// Points in non-decreasing timestamp order.
    pub fn history(&self) -> &VecDeque<DataPoint> {
        &self.history
    }

    /// Fold one sample into history, counters and summary.
    pub fn ingest(&mut self, sample: &Sample, policy: &HistoryPolicy) {
        let point = DataPoint::from_sample(sample);

        if !self.resolve_pending(&point) {
            self.insert(point, policy);
        }

        self.stats.record(sample.latency_ms);
        self.evict(policy.capacity);
        self.summary = self.stats.summarize();
    }

    /// Insert an unresolved probe. Counters are untouched until it resolves.
    pub fn record_pending(&mut self, sent_at: Timestamp, policy: &HistoryPolicy) {
        self.insert(DataPoint::pending(sent_at), policy);
        self.evict(policy.capacity);
    }

    /// Flip Pending points older than `threshold` to Timeout. Returns how many flipped.
    pub fn expire_pending(&mut self, now: Timestamp, threshold: TimeDelta) -> usize {
        let mut expired = 0;
        for point in self.history.iter_mut().rev() {
            if point.status == PointStatus::Pending && now - point.timestamp > threshold {
                point.status = PointStatus::Timeout;
                point.value = f64::NAN;
                expired += 1;
            }
        }
        expired
    }

    /// Replace a Pending point carrying the same send time, if there is one.
    fn resolve_pending(&mut self, point: &DataPoint) -> bool {
        let start = self.history.partition_point(|p| p.timestamp < point.timestamp);
        let slot = self
            .history
            .range_mut(start..)
            .take_while(|p| p.timestamp == point.timestamp)
            .find(|p| p.status == PointStatus::Pending);

        match slot {
            Some(pending) => {
                *pending = *point;
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, point: DataPoint, policy: &HistoryPolicy) {
        let Some(last) = self.history.back().copied() else {
            self.history.push_back(point);
            return;
        };

        if point.timestamp >= last.timestamp {
            self.bridge_gap(&last, &point, policy);
            self.history.push_back(point);
            return;
        }

        // Late arrival: ordered insert after any equal timestamps, no synthesis.
        let index = self.history.partition_point(|p| p.timestamp <= point.timestamp);
        self.history.insert(index, point);
    }

    fn bridge_gap(&mut self, last: &DataPoint, next: &DataPoint, policy: &HistoryPolicy) {
        if last.status != PointStatus::Timeout {
            return;
        }
        let ramp_to = match next.status {
            PointStatus::Success => Some(next.value),
            PointStatus::Timeout => None,
            _ => return,
        };

        let steps = match whole_ticks(next.timestamp - last.timestamp, policy.tick) {
            Some(steps) if steps <= 1 => return,
            Some(steps) if steps <= policy.capacity as i64 => steps,
            // Anything longer would be evicted before it is drawn.
            _ => {
                self.history
                    .push_back(DataPoint::interpolated(last.timestamp + policy.tick, f64::NAN));
                return;
            }
        };

        let ceiling = ramp_to.map(|target| match self.stats.ceiling() {
            Some(max) => max.max(target),
            None => target,
        });

        for i in 1..steps {
            let timestamp = last.timestamp + policy.tick * i as i32;
            let value = match (ceiling, ramp_to) {
                (Some(ceiling), Some(target)) => {
                    ceiling + (target - ceiling) * (i as f64 / steps as f64)
                }
                _ => f64::NAN,
            };
            self.history.push_back(DataPoint::interpolated(timestamp, value));
        }
    }

    fn evict(&mut self, capacity: usize) {
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

/// Number of whole `tick`s in `gap`, `None` if either does not fit in nanoseconds.
fn whole_ticks(gap: TimeDelta, tick: TimeDelta) -> Option<i64> {
    let tick = tick.num_nanoseconds().filter(|t| *t > 0)?;
    Some(gap.num_nanoseconds()? / tick)
}
