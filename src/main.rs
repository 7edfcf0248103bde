use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::sync::watch;

use rttwatch::config::{AddressFamily, Settings};
use rttwatch::logging::Logging;
use rttwatch::pipeline::Pipeline;
use rttwatch::source::{ProbeSource, SampleSource, StreamSource};
use rttwatch::ui::{self, TerminalSurface};
use rttwatch::{events, App};

#[derive(Parser, Debug)]
#[command(name = "rttwatch", version)]
#[command(about = "Live round-trip latency dashboard for a set of hosts")]
struct Args {
    /// Hosts to probe (`host`, `host:port`, `[v6]:port`)
    targets: Vec<String>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time between probes of each target (e.g. "200ms", "1s")
    #[arg(short, long)]
    interval: Option<String>,

    /// Per-probe timeout (e.g. "3s")
    #[arg(short, long)]
    timeout: Option<String>,

    /// History points kept per target
    #[arg(long)]
    history: Option<usize>,

    /// Port used for targets without one
    #[arg(short, long)]
    port: Option<u16>,

    /// Connect over IPv4 only (the default)
    #[arg(short = '4', long, conflicts_with = "ipv6")]
    ipv4: bool,

    /// Connect over IPv6 only
    #[arg(short = '6', long)]
    ipv6: bool,

    /// Dashboard refresh interval (e.g. "200ms")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Read JSON samples from stdin, one per line, instead of probing
    #[arg(long, conflicts_with = "targets")]
    stdin: bool,

    /// Write logs to this file (level from RTTWATCH_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Apply command line overrides on top of file and environment settings.
    fn apply(&self, settings: &mut Settings) {
        if !self.targets.is_empty() {
            settings.targets = self.targets.clone();
        }
        if let Some(ref interval) = self.interval {
            settings.probe.interval = interval.clone();
        }
        if let Some(ref timeout) = self.timeout {
            settings.probe.timeout = timeout.clone();
        }
        if let Some(port) = self.port {
            settings.probe.port = port;
        }
        if self.ipv4 {
            settings.probe.family = AddressFamily::Ipv4;
        } else if self.ipv6 {
            settings.probe.family = AddressFamily::Ipv6;
        }
        if let Some(history) = self.history {
            settings.pipeline.history_capacity = history;
        }
        if let Some(ref refresh) = self.refresh {
            settings.pipeline.refresh_interval = refresh.clone();
        }
        if self.stdin {
            settings.targets.clear();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logging = Logging::init(args.log_file.as_deref())?;

    let mut settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    args.apply(&mut settings);

    let pipeline_config = settings.pipeline_config()?;
    let probe_config = settings.probe_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut source: Box<dyn SampleSource> = if args.stdin {
        let queue = probe_config.queue_capacity;
        Box::new(StreamSource::new(tokio::io::stdin(), "stdin", queue))
    } else {
        Box::new(ProbeSource::new(&settings.targets, probe_config.clone())?)
    };
    tracing::info!(source = source.description(), "starting");

    let surface = Arc::new(TerminalSurface::new());
    let pipeline = Pipeline::new(
        pipeline_config,
        &settings.targets,
        probe_config.timeout,
        surface.clone(),
    )?;
    let store = pipeline.store();
    let (stop_tx, stop_rx) = watch::channel(false);

    let pipeline_task = runtime.block_on(async {
        let samples = source.take_stream()?;
        source.start()?;
        Ok::<_, anyhow::Error>(tokio::spawn(pipeline.run(samples, stop_rx)))
    })?;

    let mut app = App::new(surface, store, source.description());
    let result = run_tui(&mut app);

    runtime.block_on(async {
        source.stop().await;
        let _ = stop_tx.send(true);
        match pipeline_task.await {
            Ok(report) => tracing::info!(
                samples = report.samples,
                refreshes = report.refreshes,
                expired = report.expired,
                dropped = source.dropped(),
                "stopped"
            ),
            Err(e) => tracing::error!(error = %e, "pipeline task failed"),
        }
    });
    runtime.shutdown_timeout(Duration::from_millis(100));

    result
}

/// Run the dashboard on the current thread until the user quits.
fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 40;
    const MIN_HEIGHT: u16 = 14;
    const CHART_MIN_HEIGHT: u16 = 8;

    let mut table_start_row = 1;

    while app.running {
        app.poll_frame();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(app.theme.warning));
                let centered =
                    ratatui::layout::Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5)
                        .intersection(area);
                frame.render_widget(paragraph, centered);
                return;
            }

            let max_table = area.height.saturating_sub(CHART_MIN_HEIGHT + 2);
            let table_height = ui::summary::height_for(app.target_count()).min(max_table);

            let chunks = Layout::vertical([
                Constraint::Length(1),            // Header bar
                Constraint::Length(table_height), // Summary table
                Constraint::Min(CHART_MIN_HEIGHT), // Chart
                Constraint::Length(1),            // Status bar
            ])
            .split(area);

            // The pipeline sizes the next chart to this frame's panel.
            let chart_area = ui::chart::inner_area(chunks[2]);
            app.sync_viewport(chart_area.width, chart_area.height);
            table_start_row = chunks[1].y + 1;

            ui::common::render_header(frame, app, chunks[0]);
            ui::summary::render(frame, app, chunks[1]);
            ui::chart::render(frame, app, chunks[2]);
            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(50))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, table_start_row),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn family_flags_override_settings() {
        let mut settings = Settings::default();
        Args::try_parse_from(["rttwatch", "-6", "example.com"])
            .unwrap()
            .apply(&mut settings);
        assert_eq!(settings.probe.family, AddressFamily::Ipv6);

        Args::try_parse_from(["rttwatch", "--ipv4", "example.com"])
            .unwrap()
            .apply(&mut settings);
        assert_eq!(settings.probe.family, AddressFamily::Ipv4);
    }

    #[test]
    fn family_flags_conflict() {
        let err = Args::try_parse_from(["rttwatch", "-4", "-6", "example.com"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn version_flag() {
        let err = Args::try_parse_from(["rttwatch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}
