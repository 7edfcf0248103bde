//! # rttwatch
//!
//! A live terminal dashboard and library for round-trip latency to many
//! targets at once.
//!
//! Samples arrive from a [`SampleSource`] (the built-in TCP connect prober,
//! a newline-delimited JSON stream, or an in-process channel). The
//! [`Pipeline`] folds them into per-target running statistics and a
//! gap-aware history, and on every refresh tick renders a summary table
//! plus a braille line chart onto a [`DrawSurface`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐  mpsc   ┌────────────┐  present  ┌───────────────┐ │
//! │  │  source  │────────▶│  pipeline  │──────────▶│ DrawSurface   │ │
//! │  │ (probes) │ Sample  │ (tokio task)│ Dashboard │ (ui, terminal)│ │
//! │  └──────────┘         └─────┬──────┘  Frame    └───────┬───────┘ │
//! │                             │                          │         │
//! │                             ▼                          ▼         │
//! │                      ┌────────────┐             ┌──────────┐     │
//! │                      │    data    │◀────────────│   app    │     │
//! │                      │SeriesStore │   export    │ (events) │     │
//! │                      └────────────┘             └──────────┘     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`SampleSource`] trait with probe, stream and channel sources
//! - **[`data`]**: samples, running statistics, per-target history and chart windows
//! - **[`chart`]**: braille rasterization with axis labels and stable target colors
//! - **[`pipeline`]**: the event loop tying ingest, maintenance and refresh together
//! - **[`ui`]**, **[`app`]**, **[`events`]**: the ratatui dashboard
//! - **[`config`]**, **[`logging`]**: layered settings and file logging
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Probe two hosts over TCP
//! rttwatch 1.1.1.1:443 example.com
//!
//! # Chart samples produced by another program
//! my-pinger | rttwatch --stdin
//! ```
//!
//! ### As a library with a channel source
//!
//! ```no_run
//! use std::sync::Arc;
//! use rttwatch::{ChannelSource, Pipeline, PipelineConfig, Sample, SampleSource, TerminalSurface};
//!
//! # tokio_test::block_on(async {
//! let (tx, mut source) = ChannelSource::create("in-process", 64);
//! let surface = Arc::new(TerminalSurface::new());
//! let targets = vec!["db-primary".to_string()];
//! let pipeline = Pipeline::new(
//!     PipelineConfig::default(),
//!     &targets,
//!     std::time::Duration::from_secs(3),
//!     surface.clone(),
//! )
//! .unwrap();
//!
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let samples = source.take_stream().unwrap();
//! let task = tokio::spawn(pipeline.run(samples, stop_rx));
//!
//! tx.send(Sample::reply("db-primary", 1.8, chrono::Utc::now())).await.unwrap();
//! stop_tx.send(true).unwrap();
//! let report = task.await.unwrap();
//! println!("{} samples", report.samples);
//! # });
//! ```

pub mod app;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod pipeline;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::{AddressFamily, PipelineConfig, ProbeConfig, Settings};
pub use data::{DataPoint, RunningStats, Sample, SeriesStore, WireSample};
pub use error::{ConfigError, SourceError};
pub use pipeline::{DashboardFrame, DrawSurface, Pipeline, Viewport};
pub use source::{ChannelSource, ProbeSource, SampleSource, StreamSource};
pub use ui::TerminalSurface;
