//! Visible time span of the chart and timestamp → column mapping.

use chrono::TimeDelta;

use super::sample::Timestamp;

/// Half-open time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Where a timestamp lands on a row of `columns` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    OffLeft,
    At(usize),
    OffRight,
}

impl TimeWindow {
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Linear map of `timestamp` onto `columns` cells.
    pub fn column(&self, timestamp: Timestamp, columns: usize) -> Column {
        if timestamp < self.start {
            return Column::OffLeft;
        }
        if timestamp >= self.end || columns == 0 {
            return Column::OffRight;
        }

        let fraction = seconds(timestamp - self.start) / seconds(self.span());
        let index = (fraction * columns as f64).floor() as usize;
        Column::At(index.min(columns - 1))
    }
}

/// Chooses between the fixed pre-roll window and the trailing rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowManager {
    origin: Timestamp,
    span: TimeDelta,
}

/// Which regime produced a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRegime {
    /// Filling in from the left, anchored at pipeline start.
    PreRoll,
    /// Trailing `now`.
    Rolling,
}

impl WindowManager {
    /// `span` is the history capacity times the maintenance tick.
    pub fn new(origin: Timestamp, span: TimeDelta) -> Self {
        Self { origin, span }
    }

    pub fn regime(&self, now: Timestamp) -> WindowRegime {
        if now - self.origin < self.span {
            WindowRegime::PreRoll
        } else {
            WindowRegime::Rolling
        }
    }

    pub fn current(&self, now: Timestamp) -> TimeWindow {
        match self.regime(now) {
            WindowRegime::PreRoll => TimeWindow {
                start: self.origin,
                end: self.origin + self.span,
            },
            WindowRegime::Rolling => TimeWindow {
                start: now - self.span,
                end: now,
            },
        }
    }
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + delta.subsec_nanos() as f64 * 1e-9
}
