//! Renders target histories into a markup-colored braille line chart.
//!
//! The output is a block of text with inline `[color]…[white]` tags, one line
//! per terminal row:
//!
//! ```text
//!  42.1ms │⠀⠀⡠⠊⠉⠢⡀⠀⠀      <- value axis labels, braille body
//!  21.0ms │⠔⠁⠀⠀⠀⠀⠈⠢⣀
//!   0µs   │
//!         └─────────────   <- time axis
//!          12:00:01  12:00:31
//! ```

use std::collections::VecDeque;
use std::fmt::{self, Write};

use chrono::Local;

use super::raster::Raster;
use crate::data::duration::format_latency;
use crate::data::{Column, DataPoint, TimeWindow};

/// Maximum number of value axis labels.
const Y_LABELS: usize = 5;
/// Separator and gutter space right of the value labels.
const LABEL_GUTTER: usize = 2;
/// Rows reserved for the time axis rule and the time labels.
const TIME_AXIS_ROWS: usize = 2;

/// Why a chart could not be drawn. Shown in place of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    TooSmall,
    TooLarge,
    NoData,
    AreaTooSmall,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Notice::TooSmall => "terminal too small",
            Notice::TooLarge => "terminal too large",
            Notice::NoData => "no data in the current window",
            Notice::AreaTooSmall => "drawable area too small",
        };
        f.write_str(text)
    }
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Raster(String),
    Notice(Notice),
}

impl Default for Chart {
    fn default() -> Self {
        Chart::Notice(Notice::NoData)
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chart::Raster(text) => f.write_str(text),
            Chart::Notice(notice) => write!(f, "[yellow]{notice}[white]"),
        }
    }
}

/// One target's contribution to the chart.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub color: &'static str,
    pub points: &'a VecDeque<DataPoint>,
}

/// Size bounds and value axis padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSettings {
    pub min_width: u16,
    pub min_height: u16,
    pub max_size: u16,
    pub value_buffer_ratio: f64,
}

/// Padded value axis bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Range over the finite values inside `window`, `None` without any.
    pub fn of(layers: &[Layer<'_>], window: &TimeWindow, buffer_ratio: f64) -> Option<Self> {
        let (mut min, mut max) = layers
            .iter()
            .flat_map(|layer| layer.points.iter())
            .filter(|p| window.contains(p.timestamp) && p.value.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, p| match acc {
                None => Some((p.value, p.value)),
                Some((lo, hi)) => Some((lo.min(p.value), hi.max(p.value))),
            })?;

        if min == max {
            min -= 1.0;
            max += 1.0;
        }
        max += max * buffer_ratio;
        min -= min * buffer_ratio;

        Some(Self {
            min: min.max(0.0),
            max,
        })
    }

    pub fn span(&self) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            span
        } else {
            1.0
        }
    }

    /// Dot row for `value`: larger values higher up, non-finite at the top.
    fn dot_row(&self, value: f64, dot_height: usize) -> i64 {
        let bottom = dot_height.saturating_sub(1) as f64;
        let normalized = (value - self.min) / self.span();
        if !normalized.is_finite() {
            return 0;
        }
        ((1.0 - normalized) * bottom).round().clamp(0.0, bottom) as i64
    }
}

/// Draws layers into a text block sized to the surface.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    settings: ChartSettings,
}

impl ChartRenderer {
    pub fn new(settings: ChartSettings) -> Self {
        Self { settings }
    }

    /// Render `layers` (in draw order) for `window` into `width × height` cells.
    pub fn render(
        &self,
        layers: &[Layer<'_>],
        window: &TimeWindow,
        width: u16,
        height: u16,
    ) -> Chart {
        if let Err(notice) = self.check_size(width, height) {
            return Chart::Notice(notice);
        }

        let Some(range) = ValueRange::of(layers, window, self.settings.value_buffer_ratio) else {
            return Chart::Notice(Notice::NoData);
        };

        let body_rows = (height as usize).saturating_sub(TIME_AXIS_ROWS);
        let labels = axis_labels(&range, body_rows);
        let edges = [format_latency(range.max), format_latency(range.min)];
        let label_width = labels
            .iter()
            .flatten()
            .chain(&edges)
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0)
            + LABEL_GUTTER;

        let chart_cols = (width as usize).saturating_sub(label_width);
        if body_rows == 0 || chart_cols == 0 {
            return Chart::Notice(Notice::AreaTooSmall);
        }

        let mut raster = Raster::new(chart_cols, body_rows);
        for layer in layers {
            plot(&mut raster, layer, window, &range);
        }

        Chart::Raster(compose(&raster, &labels, label_width, window, height as usize))
    }

    fn check_size(&self, width: u16, height: u16) -> Result<(), Notice> {
        let s = &self.settings;
        if width < s.min_width || height < s.min_height {
            return Err(Notice::TooSmall);
        }
        if width > s.max_size || height > s.max_size {
            return Err(Notice::TooLarge);
        }
        Ok(())
    }
}

/// Plot one layer, joining consecutive in-window points with lines.
fn plot(raster: &mut Raster, layer: &Layer<'_>, window: &TimeWindow, range: &ValueRange) {
    let dot_width = raster.dot_width();
    let dot_height = raster.dot_height();
    let mut previous: Option<(i64, i64)> = None;

    for point in layer.points.iter().filter(|p| window.contains(p.timestamp)) {
        let Column::At(x) = window.column(point.timestamp, dot_width) else {
            continue;
        };
        let current = (x as i64, range.dot_row(point.value, dot_height));

        match previous {
            Some(from) => raster.line(from, current, layer.color),
            None => raster.set(current.0, current.1, layer.color),
        }
        previous = Some(current);
    }
}

/// Up to five value labels spread evenly over the range, keyed by character row.
fn axis_labels(range: &ValueRange, body_rows: usize) -> Vec<Option<String>> {
    let mut labels = vec![None; body_rows];
    let count = Y_LABELS.min(body_rows);
    if count < 2 {
        return labels;
    }

    for i in 0..count {
        let normalized = i as f64 / (count - 1) as f64;
        let value = range.max - normalized * range.span();
        let row = (normalized * (body_rows - 1) as f64).round() as usize;
        labels[row] = Some(format_latency(value));
    }
    labels
}

fn compose(
    raster: &Raster,
    labels: &[Option<String>],
    label_width: usize,
    window: &TimeWindow,
    height: usize,
) -> String {
    let chart_cols = raster.dot_width() / 2;
    let mut lines: Vec<String> = Vec::with_capacity(raster.rows() + TIME_AXIS_ROWS);

    for (row, label) in labels.iter().enumerate() {
        let mut line = format!(
            "[gray]{:>w$}[white] [gray]│[white]",
            label.as_deref().unwrap_or(""),
            w = label_width - LABEL_GUTTER
        );
        for cell in raster.row(row) {
            match cell.color {
                Some(color) if !cell.is_blank() => {
                    let _ = write!(line, "[{color}]{}[white]", cell.glyph());
                }
                _ => line.push(' '),
            }
        }
        lines.push(line);
    }

    lines.push(format!(
        "[gray]{:w$}└{}[white]",
        "",
        "─".repeat(chart_cols),
        w = label_width - 1
    ));

    let start = window.start.with_timezone(&Local).format("%H:%M:%S").to_string();
    let end = window.end.with_timezone(&Local).format("%H:%M:%S").to_string();
    lines.push(format!(
        "[gray]{:lw$}{}[white]",
        "",
        time_labels(&start, &end, chart_cols),
        lw = label_width
    ));

    lines.truncate(height);
    lines.join("\n")
}

/// Start and end times spread across `cols`, dropping what does not fit.
fn time_labels(start: &str, end: &str, cols: usize) -> String {
    let used = start.len() + end.len();
    if used < cols {
        format!("{start}{:gap$}{end}", "", gap = cols - used)
    } else if start.len() <= cols {
        start.to_string()
    } else {
        String::new()
    }
}
