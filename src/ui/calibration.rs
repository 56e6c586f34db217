use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    widgets::Gauge,
    Frame,
};

use crate::app::App;
use crate::calibration::CalibrationTarget;
use crate::ui::{bold, centered_column, dim, with_footer};

/// Cell that a normalized target position maps to inside `area`
pub fn target_cell(target: &CalibrationTarget, area: Rect) -> (u16, u16) {
    let col = (target.normalized_x * area.width as f64) as u16;
    let row = (target.normalized_y * area.height as f64) as u16;
    (
        area.x + col.min(area.width.saturating_sub(1)),
        area.y + row.min(area.height.saturating_sub(1)),
    )
}

pub fn render_calibration(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let tracker = app.session.tracker();
    let required = tracker.required_clicks();
    let complete = tracker.is_complete();

    let hints: &[(&str, &str)] = if complete {
        &[("enter", "finish calibration"), ("c", "restart"), ("esc", "cancel")]
    } else {
        &[("click/1-9", "confirm target"), ("c", "restart"), ("esc", "cancel")]
    };
    let body = with_footer(app, area, hints, f);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(14), Constraint::Min(10)])
        .split(Rect::new(body.x, body.y, body.width, 1.min(body.height)));

    f.render_widget(Span::styled("Calibration", bold()), header[0]);
    let tracker = app.session.tracker();
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Rgb(37, 99, 235)))
            .ratio(tracker.progress().clamp(0.0, 1.0))
            .label(format!(
                "{}/{} clicks",
                tracker.total_confirms(),
                tracker.required_total()
            )),
        header[1],
    );

    // Targets are laid out over the whole frame so clicks map straight to screen space
    let buf = f.buffer_mut();
    for target in tracker.targets() {
        let (col, row) = target_cell(target, area);
        let (glyph, style) = if target.is_satisfied(required) {
            ("✔", bold().fg(Color::Green))
        } else {
            ("◉", bold().fg(Color::Red))
        };
        buf.set_string(col, row, glyph, style);

        let label = format!("{} {}/{}", target.id + 1, target.confirm_count, required);
        if row + 1 < body.bottom() {
            let start = centered_column(&label, col, area);
            buf.set_string(start, row + 1, &label, dim());
        }
    }

    if complete {
        let msg = "All targets confirmed. Press Enter to finish.";
        let row = area.y + area.height / 2;
        let start = centered_column(msg, area.x + area.width / 2, area);
        buf.set_string(start, row, msg, bold().fg(Color::Green));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationTracker;
    use crate::config::Config;
    use crate::estimator::{Readiness, SimulatedEstimator};
    use crate::session::SessionEvent;
    use crate::stimulus::Stimulus;
    use crate::ui::draw;
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    #[test]
    fn renders_with_huge_click_requirement() {
        let cfg = Config {
            required_clicks: 1_000_000_000,
            privacy_acknowledged: true,
            screen_width: 320,
            screen_height: 240,
            ..Config::default()
        };
        let estimator = SimulatedEstimator::new(cfg.screen(), 30.0).with_seed(1);
        let stimulus = Stimulus::blank(cfg.screen()).unwrap();
        let mut app = App::new(cfg, Box::new(estimator), stimulus, PathBuf::from("."));
        app.session.set_readiness(Readiness::Ready);
        assert!(app.dispatch(SessionEvent::StartCalibration));

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("0/9000000000 clicks"));
    }

    #[test]
    fn target_cells_cover_the_grid() {
        let tracker = CalibrationTracker::new(5);
        let area = Rect::new(0, 0, 100, 30);
        let cells: Vec<_> = tracker
            .targets()
            .iter()
            .map(|t| target_cell(t, area))
            .collect();
        assert_eq!(cells[0], (10, 3));
        assert_eq!(cells[4], (50, 15));
        assert_eq!(cells[8], (90, 27));
    }

    #[test]
    fn target_cells_clamp_to_tiny_areas() {
        let tracker = CalibrationTracker::new(5);
        let area = Rect::new(0, 0, 1, 1);
        for t in tracker.targets() {
            assert_eq!(target_cell(t, area), (0, 0));
        }
    }
}
