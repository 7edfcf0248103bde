//! Common UI components.
//!
//! This module contains the header bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;

/// Render the header bar.
///
/// Displays: worst loss indicator, source, targets reporting, last refresh.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(" RTTWATCH ", Style::default().add_modifier(Modifier::BOLD));

    let Some(ref data) = app.frame else {
        let line = Line::from(vec![
            title,
            Span::raw(format!("│ {} │ Starting...", app.source_description())),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let worst_loss = data
        .rows
        .iter()
        .filter(|r| r.has_data)
        .map(|r| r.loss_percent)
        .fold(0.0_f64, f64::max);

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.loss_style(worst_loss)),
        title,
        Span::raw("│ "),
        Span::raw(app.source_description().to_string()),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", data.active_targets()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("/{} targets reporting │ ", data.rows.len())),
        Span::styled(
            data.rendered_at
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows temporary status messages, otherwise the available controls.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let focus = app.focused_target().unwrap_or("all targets");
    let status = format!(
        " Chart: {} | ↑↓/jk:focus Home:all e:export ?:help q:quit",
        focus
    );

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the dashboard.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Chart focus"),
        Line::from("  ↓ j         Next target"),
        Line::from("  ↑ k         Previous target"),
        Line::from("  Home        All targets"),
        Line::from("  Click row   Focus that target"),
        Line::from(""),
        section(" General"),
        Line::from("  e           Export stats to JSON"),
        Line::from("  ?           Toggle this help"),
        Line::from("  q Esc ^C    Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 16u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
