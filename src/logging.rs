//! Log file setup.
//!
//! The terminal belongs to the dashboard, so events only go to a file and
//! only when one is requested. The level filter comes from `RTTWATCH_LOG`
//! (e.g. `RTTWATCH_LOG=rttwatch=debug`) and defaults to `info`.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "RTTWATCH_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Keeps the background writer alive; buffered lines are flushed on drop.
#[derive(Default)]
pub struct Logging {
    _guard: Option<WorkerGuard>,
}

impl Logging {
    /// Install the global subscriber writing to `log_file`. `None` disables logging.
    pub fn init(log_file: Option<&Path>) -> Result<Self> {
        let Some(path) = log_file else {
            return Ok(Self::default());
        };

        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(filter(std::env::var(LOG_ENV).ok().as_deref()))
            .with(layer)
            .try_init()
            .context("failed to install log subscriber")?;

        Ok(Self {
            _guard: Some(guard),
        })
    }
}

/// Filter from an `EnvFilter` directive string, falling back to `info`.
fn filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
