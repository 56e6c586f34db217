use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::Color,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, ReportTab};
use crate::report::ReportMetrics;
use crate::ui::{accent, bold, dim, image_view::render_fitted, with_footer};

/// (label, value) pairs for the metric cards
pub fn metric_cards(metrics: &ReportMetrics) -> [(&'static str, String); 3] {
    [
        ("Total Duration", format!("{:.1}s", metrics.duration_secs)),
        ("Data Points", metrics.point_count.to_string()),
        ("Sample Rate", format!("{:.1} Hz", metrics.sample_rate_hz)),
    ]
}

pub fn render_report(app: &mut App, f: &mut Frame) {
    let body = with_footer(
        app,
        f.area(),
        &[("h/g", "switch view"), ("e", "export"), ("b", "back"), ("q", "quit")],
        f,
    );

    let Some(view) = app.report_view.as_mut() else {
        f.render_widget(
            Paragraph::new("No report available").alignment(Alignment::Center),
            body,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(body);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled("Eye Tracking Analysis Report", accent())),
            Line::from(Span::styled(view.title.clone(), dim())),
        ])
        .alignment(Alignment::Center),
        chunks[0],
    );

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(chunks[1]);
    for ((label, value), rect) in metric_cards(&view.metrics).into_iter().zip(cards.iter()) {
        f.render_widget(
            Paragraph::new(Span::styled(value, bold()))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(format!(" {label} "))),
            *rect,
        );
    }

    f.render_widget(
        Tabs::new(vec!["Heatmap", "Gaze Plot"])
            .select(app.report_tab.index())
            .highlight_style(bold().fg(Color::Rgb(37, 99, 235))),
        chunks[2],
    );

    let image = match app.report_tab {
        ReportTab::Heatmap => &mut view.heatmap,
        ReportTab::GazePlot => &mut view.gaze_plot,
    };
    render_fitted(image, chunks[3], f.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_cards_format_values() {
        let cards = metric_cards(&ReportMetrics {
            duration_secs: 3.26,
            point_count: 98,
            sample_rate_hz: 30.04,
        });
        assert_eq!(cards[0], ("Total Duration", "3.3s".to_string()));
        assert_eq!(cards[1], ("Data Points", "98".to_string()));
        assert_eq!(cards[2], ("Sample Rate", "30.0 Hz".to_string()));
    }
}
