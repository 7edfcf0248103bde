//! Terminal rendering with ratatui.
//!
//! - [`markup`]: `[color]…[white]` chart markup to styled lines
//! - [`surface`]: [`TerminalSurface`], the pipeline's draw surface
//! - [`summary`]: per-target statistics table
//! - [`chart`]: latency chart panel
//! - [`common`]: header, status bar, help overlay
//! - [`theme`]: light/dark styles

pub mod chart;
pub mod common;
pub mod markup;
pub mod summary;
pub mod surface;
pub mod theme;

pub use surface::TerminalSurface;
pub use theme::Theme;
