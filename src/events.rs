use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::App;

/// File written by the export key.
pub const EXPORT_FILE: &str = "rttwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Chart focus
        KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
        KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),
        KeyCode::Home => app.focus_all(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    tracing::info!(path = %export_path.display(), "exported statistics");
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "export failed");
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle mouse events.
///
/// `table_start_row` is the screen row of the summary table's header line.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, table_start_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.focus_prev(),
        MouseEventKind::ScrollDown => app.focus_next(),

        MouseEventKind::Down(MouseButton::Left) => {
            if mouse.row > table_start_row {
                let item_row = (mouse.row - table_start_row - 1) as usize;
                app.focus_row(item_row);
            }
        }

        MouseEventKind::Down(MouseButton::Right) => app.focus_all(),

        _ => {}
    }
}
