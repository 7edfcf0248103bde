//! Braille line chart: colors, dot raster and the markup renderer.

pub mod palette;
pub mod raster;
pub mod render;

pub use palette::Palette;
pub use raster::{Cell, Raster};
pub use render::{Chart, ChartRenderer, ChartSettings, Layer, Notice, ValueRange};
