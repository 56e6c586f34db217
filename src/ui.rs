pub mod calibration;
pub mod home;
pub mod image_view;
pub mod report;
pub mod screen;
pub mod tracking;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;

pub fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub fn accent() -> Style {
    bold().fg(Color::Rgb(37, 99, 235))
}

/// Draw whichever screen the session currently calls for
pub fn draw(app: &mut App, f: &mut Frame) {
    app.viewport = f.area();
    let screen = screen::current_screen(app.screen());
    screen.render(app, f);
}

/// Rect of the given size centred inside `area`, clipped to it
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Column at which `text` starts when centred on `center`
pub fn centered_column(text: &str, center: u16, area: Rect) -> u16 {
    let half = (text.width() / 2) as u16;
    let right_edge = area.right().saturating_sub(text.width() as u16);
    center.saturating_sub(half).clamp(area.x, right_edge.max(area.x))
}

/// One-line key legend, e.g. `[c] calibrate  [q] quit`
pub fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(format!("[{key}]"), bold()));
        spans.push(Span::styled(format!(" {label}"), dim()));
    }
    Line::from(spans)
}

/// Split off a one-line footer; the status message wins over the key legend
pub fn with_footer(app: &App, area: Rect, hints: &[(&str, &str)], f: &mut Frame) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let footer = match &app.status {
        Some(msg) => Line::from(Span::styled(msg.clone(), bold().fg(Color::Yellow))),
        None => key_hints(hints),
    };
    f.render_widget(Paragraph::new(footer).alignment(Alignment::Center), chunks[1]);
    chunks[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_clipped() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(centered_rect(50, 40, area), area);
    }

    #[test]
    fn centered_column_stays_in_area() {
        let area = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_column("abcd", 10, area), 8);
        assert_eq!(centered_column("abcd", 0, area), 0);
        assert_eq!(centered_column("abcd", 19, area), 16);
    }
}
