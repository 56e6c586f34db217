use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::ui::{bold, dim, image_view::render_fitted, with_footer};

pub fn render_tracking(app: &mut App, f: &mut Frame) {
    let body = with_footer(app, f.area(), &[("enter/x", "finish viewing")], f);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(body);

    let header = Line::from(vec![
        Span::styled("Tracking in progress", bold()),
        Span::styled(format!("  {} samples", app.session.buffered()), dim()),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    render_fitted(&mut app.preview, chunks[1], f.buffer_mut());
}
