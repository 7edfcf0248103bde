//! Latency chart panel.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::markup;
use crate::app::App;
use crate::chart::Chart;
use crate::data::WindowRegime;

fn block(app: &App) -> Block<'static> {
    let title = match app.focused_target() {
        Some(target) => format!(" Latency: {} ", target),
        None => " Latency ".to_string(),
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

/// Area available to the rasterized chart inside the panel border.
pub fn inner_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Render the latest chart, or the notice standing in for it.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut block = block(app);
    if let Some(data) = &app.frame {
        let regime = match data.regime {
            WindowRegime::PreRoll => " filling ",
            WindowRegime::Rolling => " rolling ",
        };
        block = block.title_bottom(Line::from(regime).right_aligned());
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = match app.frame.as_ref().map(|f| &f.chart) {
        Some(Chart::Raster(text)) => Paragraph::new(markup::parse(text)),
        Some(Chart::Notice(notice)) => notice_paragraph(&notice.to_string(), app),
        None => notice_paragraph("waiting for the first frame", app),
    };

    frame.render_widget(paragraph, inner);
}

fn notice_paragraph(text: &str, app: &App) -> Paragraph<'static> {
    Paragraph::new(vec![Line::from(""), Line::from(text.to_string())])
        .alignment(Alignment::Center)
        .style(Style::default().fg(app.theme.warning))
}
