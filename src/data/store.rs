//! The per-target series store.
//!
//! Exactly one task (the pipeline) mutates the store; readers such as the
//! renderer or an export take a read lock on the whole store through
//! [`SharedStore`], so they always observe a consistent, ordered history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::TimeDelta;
use parking_lot::RwLock;

use super::sample::{Sample, Timestamp};
use super::series::{HistoryPolicy, Series};

/// The store behind a read-write lock, shared between the pipeline and readers.
pub type SharedStore = Arc<RwLock<SeriesStore>>;

/// All series, keyed by target identifier.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    policy: HistoryPolicy,
    series: HashMap<String, Series>,
}

impl SeriesStore {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            series: HashMap::new(),
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Route a sample to its target's series, creating the series on first sight.
    pub fn ingest(&mut self, sample: &Sample) {
        let policy = self.policy;
        self.series_mut(&sample.target).ingest(sample, &policy);
    }

    /// Record a probe whose outcome is not known yet.
    pub fn record_pending(&mut self, target: &str, sent_at: Timestamp) {
        let policy = self.policy;
        self.series_mut(target).record_pending(sent_at, &policy);
    }

    /// Time out every Pending point older than `threshold`, across all targets.
    pub fn expire_pending(&mut self, now: Timestamp, threshold: TimeDelta) -> usize {
        self.series
            .values_mut()
            .map(|series| series.expire_pending(now, threshold))
            .sum()
    }

    pub fn get(&self, target: &str) -> Option<&Series> {
        self.series.get(target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.series.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Series for `order` that exist, in that order.
    pub fn in_order<'a, I>(&'a self, order: I) -> Vec<&'a Series>
    where
        I: IntoIterator<Item = &'a String>,
    {
        order
            .into_iter()
            .filter_map(|target| self.series.get(target))
            .collect()
    }

    fn series_mut(&mut self, target: &str) -> &mut Series {
        self.series
            .entry(target.to_string())
            .or_insert_with(|| Series::new(target))
    }
}
