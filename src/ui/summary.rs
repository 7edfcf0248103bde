//! Summary table rendering.
//!
//! One row per target in display order: the target name in its chart color,
//! then the running statistics.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use super::markup;
use crate::app::App;
use crate::data::Metric;

/// Index of the Loss column within the metric cells.
const LOSS_COLUMN: usize = 2;

/// Table height for `targets` rows, including borders and header.
pub fn height_for(targets: usize) -> u16 {
    (targets as u16).saturating_add(3)
}

/// Render the per-target statistics table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(ref data) = app.frame else {
        frame.render_widget(block.title(" Targets "), area);
        return;
    };

    let header = Row::new(
        std::iter::once("Target")
            .chain(data.headers.iter().copied())
            .map(Cell::from)
            .collect::<Vec<_>>(),
    )
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = data
        .rows
        .iter()
        .map(|row| {
            let name_style = match markup::color(row.color) {
                Some(color) if row.has_data => Style::default().fg(color),
                _ => app.theme.muted,
            };

            let mut cells = vec![Cell::from(row.target.clone()).style(name_style)];
            cells.extend(row.cells.iter().enumerate().map(|(i, value)| {
                let cell = Cell::from(value.clone());
                if i == LOSS_COLUMN && row.has_data {
                    cell.style(app.theme.loss_style(row.loss_percent))
                } else {
                    cell
                }
            }));
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Fill(3))
        .chain(Metric::ALL.iter().map(|_| Constraint::Fill(1)))
        .collect();

    let focus_info = match app.focused_target() {
        Some(target) => format!(" [focus: {}]", target),
        None => String::new(),
    };
    let title = format!(
        " Targets ({}/{}){} ",
        data.active_targets(),
        data.rows.len(),
        focus_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(app.focus);

    frame.render_stateful_widget(table, area, &mut state);
}
