//! Converts `[color]text[white]` markup into styled ratatui lines.
//!
//! `[white]` closes a colored run and maps to the terminal's default
//! foreground so the text stays readable on light backgrounds. Brackets that
//! do not form a known tag are kept as text.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

/// Terminal color for a markup color name.
pub fn color(name: &str) -> Option<Color> {
    let color = match name {
        "white" => Color::Reset,
        "black" => Color::Black,
        "gray" | "grey" => Color::DarkGray,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "red" => Color::Red,
        "orange" => Color::Rgb(255, 165, 0),
        "purple" => Color::Rgb(128, 0, 128),
        "lime" => Color::LightGreen,
        "pink" => Color::LightMagenta,
        "darkcyan" => Color::Rgb(0, 139, 139),
        "darkgreen" => Color::Rgb(0, 100, 0),
        "darkblue" => Color::Rgb(0, 0, 139),
        "darkmagenta" => Color::Rgb(139, 0, 139),
        _ => return None,
    };
    Some(color)
}

/// Parse a multi-line markup block.
pub fn parse(text: &str) -> Vec<Line<'static>> {
    text.lines().map(parse_line).collect()
}

/// Parse one line. Color state does not carry over between lines.
pub fn parse_line(line: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = Style::default();
    let mut run = String::new();
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let (before, tail) = rest.split_at(open);
        run.push_str(before);

        let tag = tail[1..]
            .find(']')
            .map(|close| &tail[1..1 + close])
            .and_then(|name| color(name).map(|c| (name.len(), c)));

        match tag {
            Some((len, fg)) => {
                flush(&mut spans, &mut run, style);
                style = Style::default().fg(fg);
                rest = &tail[len + 2..];
            }
            None => {
                run.push('[');
                rest = &tail[1..];
            }
        }
    }
    run.push_str(rest);
    flush(&mut spans, &mut run, style);

    Line::from(spans)
}

fn flush(spans: &mut Vec<Span<'static>>, run: &mut String, style: Style) {
    if !run.is_empty() {
        spans.push(Span::styled(std::mem::take(run), style));
    }
}
