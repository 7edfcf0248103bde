//! The pipeline scheduler.
//!
//! One task owns all writes to the [`SeriesStore`]. It waits on four sources
//! at once and reacts to whichever is ready:
//!
//! ```text
//!   stop signal ───────▶ exit
//!   sample queue ──────▶ SeriesStore::ingest
//!   refresh timer ─────▶ summary rows + chart ──▶ DrawSurface::present
//!   maintenance timer ─▶ SeriesStore::expire_pending
//! ```
//!
//! A frame is drawn before anything else is processed, so the surface is
//! never blank while the first probes are still in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::chart::{Chart, ChartRenderer, Layer, Palette};
use crate::config::PipelineConfig;
use crate::data::{
    Metric, RunningStats, Sample, SeriesStore, SharedStore, TimeWindow, Timestamp, WindowManager,
    WindowRegime,
};
use crate::error::ConfigError;

/// Current size of the chart area and the target to chart alone, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
    pub focus: Option<String>,
}

/// Where frames are painted. Implemented by the terminal UI.
pub trait DrawSurface: Send + Sync {
    fn viewport(&self) -> Viewport;
    fn present(&self, frame: DashboardFrame);
}

/// One summary table row.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub target: String,
    pub color: &'static str,
    /// Formatted values in [`Metric::ALL`] order.
    pub cells: Vec<String>,
    pub loss_percent: f64,
    pub has_data: bool,
}

/// Everything the surface needs for one redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardFrame {
    pub headers: Vec<&'static str>,
    pub rows: Vec<SummaryRow>,
    pub chart: Chart,
    pub window: TimeWindow,
    pub regime: WindowRegime,
    pub rendered_at: Timestamp,
}

impl DashboardFrame {
    /// Targets that have reported at least once.
    pub fn active_targets(&self) -> usize {
        self.rows.iter().filter(|r| r.has_data).count()
    }
}

/// Counters returned when the pipeline exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub samples: u64,
    pub refreshes: u64,
    pub expired: u64,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: SharedStore,
    palette: Palette,
    windows: WindowManager,
    renderer: ChartRenderer,
    timeout_threshold: TimeDelta,
    surface: Arc<dyn DrawSurface>,
    report: PipelineReport,
}

impl Pipeline {
    /// Fails fast on any out-of-range configuration value.
    ///
    /// `targets` fixes display order and colors; targets first seen in the
    /// sample stream are appended after them.
    pub fn new(
        config: PipelineConfig,
        targets: &[String],
        probe_timeout: Duration,
        surface: Arc<dyn DrawSurface>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let policy = config.history_policy()?;
        let windows = WindowManager::new(Utc::now(), config.window_span()?);
        let timeout_threshold = config.timeout_threshold(probe_timeout)?;

        Ok(Self {
            renderer: ChartRenderer::new(config.chart_settings()),
            store: SeriesStore::new(policy).shared(),
            palette: Palette::new(targets),
            windows,
            timeout_threshold,
            surface,
            report: PipelineReport::default(),
            config,
        })
    }

    /// Read handle on the store, for exports and tests.
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Drive the pipeline until `stop` flips to `true` or its sender is dropped.
    ///
    /// A closed sample queue does not end the loop: the last state stays on
    /// screen until the caller stops it.
    pub async fn run(
        mut self,
        mut samples: mpsc::Receiver<Sample>,
        mut stop: watch::Receiver<bool>,
    ) -> PipelineReport {
        let start = Instant::now();
        let mut refresh = interval_at(
            start + self.config.refresh_interval,
            self.config.refresh_interval,
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut maintenance = interval_at(
            start + self.config.maintenance_interval,
            self.config.maintenance_interval,
        );
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh();

        let mut stream_open = true;
        while !*stop.borrow() {
            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                sample = samples.recv(), if stream_open => match sample {
                    Some(sample) => self.ingest(&sample),
                    None => {
                        info!("sample stream closed");
                        stream_open = false;
                    }
                },
                _ = refresh.tick() => self.refresh(),
                _ = maintenance.tick() => self.maintain(Utc::now()),
            }
        }

        info!(
            samples = self.report.samples,
            refreshes = self.report.refreshes,
            expired = self.report.expired,
            "pipeline stopped"
        );
        self.report
    }

    fn ingest(&mut self, sample: &Sample) {
        if self.palette.register(&sample.target) {
            debug!(target_name = %sample.target, "new target");
        }
        self.store.write().ingest(sample);
        self.report.samples += 1;
    }

    fn maintain(&mut self, now: Timestamp) {
        let expired = self
            .store
            .write()
            .expire_pending(now, self.timeout_threshold);
        if expired > 0 {
            debug!(expired, "pending probes timed out");
            self.report.expired += expired as u64;
        }
    }

    fn refresh(&mut self) {
        let frame = self.build_frame(&self.surface.viewport(), Utc::now());
        self.surface.present(frame);
        self.report.refreshes += 1;
    }

    fn build_frame(&self, viewport: &Viewport, now: Timestamp) -> DashboardFrame {
        let window = self.windows.current(now);
        let store = self.store.read();
        let empty = RunningStats::default().summarize();

        let rows = self
            .palette
            .targets()
            .iter()
            .map(|target| {
                let series = store.get(target);
                let summary = series.map(|s| &s.summary).unwrap_or(&empty);
                SummaryRow {
                    target: target.clone(),
                    color: self.palette.color_for(target),
                    cells: Metric::ALL
                        .iter()
                        .map(|m| summary.get(m).cloned().unwrap_or_default())
                        .collect(),
                    loss_percent: series.map_or(0.0, |s| s.stats.loss_percent()),
                    has_data: series.is_some(),
                }
            })
            .collect();

        let layers: Vec<Layer<'_>> = store
            .in_order(self.palette.targets())
            .into_iter()
            .filter(|s| viewport.focus.as_ref().map_or(true, |f| *f == s.target))
            .map(|s| Layer {
                color: self.palette.color_for(&s.target),
                points: s.history(),
            })
            .collect();

        let chart = self
            .renderer
            .render(&layers, &window, viewport.width, viewport.height);

        DashboardFrame {
            headers: Metric::ALL.iter().map(Metric::label).collect(),
            rows,
            chart,
            window,
            regime: self.windows.regime(now),
            rendered_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Notice;
    use crate::data::PointStatus;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        viewport: Mutex<Viewport>,
        frames: Mutex<Vec<DashboardFrame>>,
    }

    impl Recorder {
        fn sized(width: u16, height: u16) -> Arc<Self> {
            Arc::new(Self {
                viewport: Mutex::new(Viewport {
                    width,
                    height,
                    focus: None,
                }),
                frames: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> DashboardFrame {
            self.frames.lock().last().cloned().unwrap()
        }
    }

    impl DrawSurface for Recorder {
        fn viewport(&self) -> Viewport {
            self.viewport.lock().clone()
        }

        fn present(&self, frame: DashboardFrame) {
            self.frames.lock().push(frame);
        }
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn pipeline(recorder: &Arc<Recorder>, names: &[&str]) -> Pipeline {
        Pipeline::new(
            PipelineConfig::default(),
            &targets(names),
            Duration::from_secs(1),
            recorder.clone(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let recorder = Recorder::sized(80, 20);
        let config = PipelineConfig {
            history_capacity: 5,
            ..Default::default()
        };
        let result = Pipeline::new(config, &[], Duration::from_secs(1), recorder);
        assert!(matches!(result, Err(ConfigError::HistoryCapacity { .. })));
    }

    #[test]
    fn rejects_timeout_threshold_out_of_range() {
        let recorder = Recorder::sized(80, 20);
        let config = PipelineConfig {
            timeout_buffer_ratio: 1e300,
            ..Default::default()
        };
        let result = Pipeline::new(config, &[], Duration::from_secs(3), recorder);
        assert!(matches!(result, Err(ConfigError::TimeoutBufferRatio(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn draws_before_any_sample() {
        let recorder = Recorder::sized(80, 20);
        let pipeline = pipeline(&recorder, &["a", "b"]);
        let (_tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(pipeline.run(rx, stop_rx));
        tokio::task::yield_now().await;
        stop_tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.samples, 0);
        let first = recorder.frames.lock()[0].clone();
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].cells, vec!["0", "0", "0.0%", "N/A", "N/A", "N/A", "N/A"]);
        assert_eq!(first.active_targets(), 0);
        assert_eq!(first.chart, Chart::Notice(Notice::NoData));
        assert_eq!(first.regime, WindowRegime::PreRoll);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_reach_summary_and_chart() {
        let recorder = Recorder::sized(80, 20);
        let pipeline = pipeline(&recorder, &["a", "b"]);
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));

        let now = Utc::now();
        for (i, ms) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            let sent = now + TimeDelta::milliseconds(200 * i as i64);
            tx.send(Sample::reply("a", ms, sent)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(450)).await;
        stop_tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.samples, 3);
        assert!(report.refreshes >= 3);
        let frame = recorder.last();
        assert_eq!(frame.headers[0], "Sent");
        assert_eq!(frame.rows[0].cells[0], "3");
        assert_eq!(frame.rows[0].cells[3], "20.0ms");
        assert_eq!(frame.rows[0].color, "green");
        assert!(!frame.rows[1].has_data);
        assert!(matches!(frame.chart, Chart::Raster(ref text) if text.contains("[green]")));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_targets_are_appended() {
        let recorder = Recorder::sized(80, 20);
        let pipeline = pipeline(&recorder, &["a"]);
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));

        tx.send(Sample::reply("late", 5.0, Utc::now())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        let frame = recorder.last();
        let names: Vec<&str> = frame.rows.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(names, vec!["a", "late"]);
        assert_eq!(frame.rows[1].color, "yellow");
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_expires_overdue_pending() {
        let recorder = Recorder::sized(80, 20);
        let pipeline = pipeline(&recorder, &["a"]);
        let store = pipeline.store();
        let now = Utc::now();
        store
            .write()
            .record_pending("a", now - TimeDelta::seconds(10));
        store.write().record_pending("a", now + TimeDelta::seconds(60));

        let (_tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop_tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.expired, 1);
        let store = store.read();
        let statuses: Vec<PointStatus> = store
            .get("a")
            .unwrap()
            .history()
            .iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(statuses, vec![PointStatus::Timeout, PointStatus::Pending]);
    }

    #[tokio::test(start_paused = true)]
    async fn focus_limits_chart_to_one_target() {
        let recorder = Recorder::sized(80, 20);
        recorder.viewport.lock().focus = Some("b".to_string());
        let pipeline = pipeline(&recorder, &["a", "b"]);
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));

        let now = Utc::now();
        tx.send(Sample::reply("a", 10.0, now)).await.unwrap();
        tx.send(Sample::reply("b", 20.0, now)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        let Chart::Raster(text) = recorder.last().chart else {
            panic!("expected a raster");
        };
        assert!(text.contains("[yellow]"));
        assert!(!text.contains("[green]"));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_keeps_refreshing_until_stopped() {
        let recorder = Recorder::sized(80, 20);
        let pipeline = pipeline(&recorder, &["a"]);
        let (tx, rx) = mpsc::channel::<Sample>(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));

        drop(tx);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(!handle.is_finished());

        drop(stop_tx);
        let report = handle.await.unwrap();
        assert!(report.refreshes >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn small_viewport_shows_notice() {
        let recorder = Recorder::sized(10, 3);
        let pipeline = pipeline(&recorder, &["a"]);
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(pipeline.run(rx, stop_rx));

        tx.send(Sample::reply("a", 10.0, Utc::now())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(recorder.last().chart, Chart::Notice(Notice::TooSmall));
    }
}
