//! Data model and processing for latency samples.
//!
//! ## Submodules
//!
//! - [`sample`]: raw [`Sample`]s and the [`DataPoint`]s they become
//! - [`stats`]: Welford running statistics, loss and the per-target summary
//! - [`series`]: time-ordered, gap-aware history per target
//! - [`store`]: the per-target [`SeriesStore`] and its shared handle
//! - [`window`]: pre-roll / rolling chart window and column mapping
//! - [`duration`]: parsing config durations and formatting latencies
//!
//! ## Data Flow
//!
//! ```text
//! Sample (from a SampleSource)
//!        │
//!        ▼
//! SeriesStore::ingest()
//!        │
//!        ├──▶ Series history (ordered insert + gap interpolation + eviction)
//!        │
//!        └──▶ RunningStats (counters, Welford, extrema) ──▶ summary
//! ```

pub mod duration;
pub mod sample;
pub mod series;
pub mod stats;
pub mod store;
pub mod window;

pub use sample::{DataPoint, PointStatus, Sample, Timestamp, WireSample};
pub use series::{HistoryPolicy, Series};
pub use stats::{Metric, RunningStats};
pub use store::{SeriesStore, SharedStore};
pub use window::{Column, TimeWindow, WindowManager, WindowRegime};
