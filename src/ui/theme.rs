//! Dashboard colors, picked for light or dark terminal backgrounds.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

/// Loss above this percentage is shown as critical.
const LOSS_CRITICAL: f64 = 5.0;

/// Colors used by every panel. Target colors come from the chart palette instead.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Status messages and the help border.
    pub highlight: Color,
    /// Color for partial packet loss and notices.
    pub warning: Color,
    /// Color for heavy packet loss.
    pub critical: Color,
    /// Color for no packet loss.
    pub healthy: Color,
    /// Panel borders.
    pub border: Color,
    /// Summary table header.
    pub header: Style,
    /// Style for the focused target row.
    pub selected: Style,
    /// Style for secondary text such as targets without data yet.
    pub muted: Style,
    pub border_type: BorderType,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            muted: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            muted: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Light theme when the terminal reports a bright background, dark otherwise.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for a loss percentage cell.
    pub fn loss_style(&self, loss_percent: f64) -> Style {
        if loss_percent <= 0.0 {
            Style::default().fg(self.healthy)
        } else if loss_percent <= LOSS_CRITICAL {
            Style::default().fg(self.warning)
        } else {
            Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_style_thresholds() {
        let theme = Theme::dark();
        assert_eq!(theme.loss_style(0.0).fg, Some(Color::Green));
        assert_eq!(theme.loss_style(2.5).fg, Some(Color::Yellow));
        assert_eq!(theme.loss_style(30.0).fg, Some(Color::Red));
    }
}
