//! Application state and interaction logic.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::data::{SharedStore, Timestamp};
use crate::pipeline::DashboardFrame;
use crate::ui::{TerminalSurface, Theme};

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    /// Focused row in the summary table; `None` charts every target.
    pub focus: Option<usize>,
    /// Latest frame published by the pipeline.
    pub frame: Option<DashboardFrame>,

    surface: Arc<TerminalSurface>,
    store: SharedStore,
    description: String,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app, picking a theme from the terminal background.
    pub fn new(surface: Arc<TerminalSurface>, store: SharedStore, description: &str) -> Self {
        Self::with_theme(surface, store, description, Theme::auto_detect())
    }

    pub fn with_theme(
        surface: Arc<TerminalSurface>,
        store: SharedStore,
        description: &str,
        theme: Theme,
    ) -> Self {
        Self {
            running: true,
            show_help: false,
            focus: None,
            frame: None,
            surface,
            store,
            description: description.to_string(),
            theme,
            status_message: None,
        }
    }

    /// Returns a description of the sample source.
    pub fn source_description(&self) -> &str {
        &self.description
    }

    /// Pick up a newly presented frame. Returns `true` if there was one.
    pub fn poll_frame(&mut self) -> bool {
        let Some(frame) = self.surface.take_frame() else {
            return false;
        };
        self.frame = Some(frame);
        if let Some(index) = self.focus {
            if index >= self.target_count() {
                self.focus = None;
            }
        }
        true
    }

    /// Tell the pipeline how large the chart area is and what to chart.
    pub fn sync_viewport(&self, width: u16, height: u16) {
        let focus = self.focused_target().map(str::to_string);
        self.surface.set_viewport(width, height, focus);
    }

    pub fn target_count(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.rows.len())
    }

    /// Name of the focused target, if one is focused.
    pub fn focused_target(&self) -> Option<&str> {
        let frame = self.frame.as_ref()?;
        let row = frame.rows.get(self.focus?)?;
        Some(&row.target)
    }

    /// All targets → first → … → last → all targets.
    pub fn focus_next(&mut self) {
        let count = self.target_count();
        self.focus = match self.focus {
            _ if count == 0 => None,
            None => Some(0),
            Some(i) if i + 1 < count => Some(i + 1),
            Some(_) => None,
        };
    }

    /// Reverse of [`App::focus_next`].
    pub fn focus_prev(&mut self) {
        let count = self.target_count();
        self.focus = match self.focus {
            _ if count == 0 => None,
            None => Some(count - 1),
            Some(0) => None,
            Some(i) => Some(i - 1),
        };
    }

    pub fn focus_all(&mut self) {
        self.focus = None;
    }

    /// Focus the target at `index`, ignoring rows that do not exist.
    pub fn focus_row(&mut self, index: usize) {
        if index < self.target_count() {
            self.focus = Some(index);
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Export per-target statistics to a JSON file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref frame) = self.frame else {
            anyhow::bail!("No data to export");
        };

        let store = self.store.read();
        let targets = store
            .in_order(frame.rows.iter().map(|r| &r.target))
            .into_iter()
            .map(|series| {
                let stats = &series.stats;
                TargetExport {
                    target: &series.target,
                    packets_sent: stats.packets_sent,
                    packets_received: stats.packets_received,
                    loss_percent: stats.loss_percent(),
                    mean_ms: stats.mean(),
                    min_ms: stats.min_latency.is_finite().then_some(stats.min_latency),
                    max_ms: stats.ceiling(),
                    std_dev_ms: stats.std_dev(),
                    history_points: series.history().len(),
                }
            })
            .collect();

        let export = Export {
            exported_at: Utc::now(),
            source: &self.description,
            targets,
        };

        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Export<'a> {
    exported_at: Timestamp,
    source: &'a str,
    targets: Vec<TargetExport<'a>>,
}

#[derive(Serialize)]
struct TargetExport<'a> {
    target: &'a str,
    packets_sent: u64,
    packets_received: u64,
    loss_percent: f64,
    mean_ms: Option<f64>,
    min_ms: Option<f64>,
    max_ms: Option<f64>,
    std_dev_ms: Option<f64>,
    history_points: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Chart;
    use crate::data::{HistoryPolicy, Sample, SeriesStore, TimeWindow, WindowRegime};
    use crate::pipeline::{DrawSurface, SummaryRow};
    use chrono::TimeDelta;

    fn row(target: &str) -> SummaryRow {
        SummaryRow {
            target: target.to_string(),
            color: "green",
            cells: Vec::new(),
            loss_percent: 0.0,
            has_data: true,
        }
    }

    fn frame(targets: &[&str]) -> DashboardFrame {
        let now = Utc::now();
        DashboardFrame {
            headers: Vec::new(),
            rows: targets.iter().map(|t| row(t)).collect(),
            chart: Chart::default(),
            window: TimeWindow { start: now, end: now },
            regime: WindowRegime::PreRoll,
            rendered_at: now,
        }
    }

    fn app() -> (Arc<TerminalSurface>, App) {
        let surface = Arc::new(TerminalSurface::new());
        let store = SeriesStore::new(HistoryPolicy {
            capacity: 150,
            tick: TimeDelta::milliseconds(200),
        })
        .shared();
        let app = App::with_theme(surface.clone(), store, "test", Theme::dark());
        (surface, app)
    }

    #[test]
    fn focus_cycles_through_all_and_each_target() {
        let (surface, mut app) = app();
        surface.present(frame(&["a", "b"]));
        assert!(app.poll_frame());

        let mut seen = Vec::new();
        for _ in 0..4 {
            app.focus_next();
            seen.push(app.focused_target().map(str::to_string));
        }
        assert_eq!(
            seen,
            vec![Some("a".into()), Some("b".into()), None, Some("a".into())]
        );

        app.focus_all();
        app.focus_prev();
        assert_eq!(app.focused_target(), Some("b"));
        app.focus_prev();
        app.focus_prev();
        assert_eq!(app.focused_target(), None);
    }

    #[test]
    fn focus_without_targets_stays_on_all() {
        let (_surface, mut app) = app();
        app.focus_next();
        assert_eq!(app.focus, None);
        app.focus_row(3);
        assert_eq!(app.focus, None);
    }

    #[test]
    fn focus_reset_when_rows_shrink() {
        let (surface, mut app) = app();
        surface.present(frame(&["a", "b", "c"]));
        app.poll_frame();
        app.focus_row(2);

        surface.present(frame(&["a"]));
        app.poll_frame();
        assert_eq!(app.focus, None);
        assert!(!app.poll_frame());
    }

    #[test]
    fn viewport_carries_focus() {
        let (surface, mut app) = app();
        surface.present(frame(&["a", "b"]));
        app.poll_frame();
        app.focus_row(1);
        app.sync_viewport(70, 15);

        let viewport = surface.viewport();
        assert_eq!((viewport.width, viewport.height), (70, 15));
        assert_eq!(viewport.focus.as_deref(), Some("b"));
    }

    #[test]
    fn status_message_is_shown() {
        let (_surface, mut app) = app();
        assert!(app.get_status_message().is_none());
        app.set_status_message("saved".to_string());
        assert_eq!(app.get_status_message(), Some("saved"));
    }

    #[test]
    fn export_requires_a_frame() {
        let (_surface, app) = app();
        let dir = tempfile::tempdir().unwrap();
        assert!(app.export_state(&dir.path().join("out.json")).is_err());
    }

    #[test]
    fn export_writes_stats_in_display_order() {
        let surface = Arc::new(TerminalSurface::new());
        let store = SeriesStore::new(HistoryPolicy {
            capacity: 150,
            tick: TimeDelta::milliseconds(200),
        })
        .shared();
        let now = Utc::now();
        {
            let mut store = store.write();
            store.ingest(&Sample::reply("b", 10.0, now));
            store.ingest(&Sample::reply("a", 20.0, now));
            store.ingest(&Sample::timeout("a", now + TimeDelta::milliseconds(200)));
        }
        let mut app = App::with_theme(surface.clone(), store, "test", Theme::dark());
        surface.present(frame(&["a", "b"]));
        app.poll_frame();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        app.export_state(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let targets = json["targets"].as_array().unwrap();
        assert_eq!(targets[0]["target"], "a");
        assert_eq!(targets[0]["packets_sent"], 2);
        assert_eq!(targets[0]["loss_percent"], 50.0);
        assert!(targets[0]["std_dev_ms"].is_null());
        assert_eq!(targets[1]["target"], "b");
        assert_eq!(targets[1]["mean_ms"], 10.0);
        assert_eq!(json["source"], "test");
    }
}
