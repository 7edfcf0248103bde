//! The terminal side of the [`DrawSurface`] boundary.
//!
//! The pipeline publishes frames from its own task; the draw loop on the main
//! thread reports the chart size it has and picks up the newest frame.

use parking_lot::Mutex;

use crate::pipeline::{DashboardFrame, DrawSurface, Viewport};

#[derive(Debug, Default)]
pub struct TerminalSurface {
    viewport: Mutex<Viewport>,
    latest: Mutex<Option<DashboardFrame>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the chart area size and focused target for the next frame.
    pub fn set_viewport(&self, width: u16, height: u16, focus: Option<String>) {
        *self.viewport.lock() = Viewport {
            width,
            height,
            focus,
        };
    }

    /// Newest frame, if one was presented since the last call.
    pub fn take_frame(&self) -> Option<DashboardFrame> {
        self.latest.lock().take()
    }
}

impl DrawSurface for TerminalSurface {
    fn viewport(&self) -> Viewport {
        self.viewport.lock().clone()
    }

    fn present(&self, frame: DashboardFrame) {
        *self.latest.lock() = Some(frame);
    }
}
