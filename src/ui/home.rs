use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::estimator::Readiness;
use crate::ui::{accent, bold, centered_rect, dim, with_footer};

const PRIVACY_TEXT: [&str; 4] = [
    "This application uses your webcam to estimate where you are looking on the screen.",
    "Camera frames are processed locally and never leave this machine.",
    "Only gaze coordinates and timestamps are kept, in memory, for the current session.",
    "Exported reports are written to disk only when you ask for them.",
];

pub fn render_privacy(app: &mut App, f: &mut Frame) {
    let body = with_footer(app, f.area(), &[("a", "accept"), ("q", "quit")], f);
    let rect = centered_rect(72, 14, body);

    let mut lines = vec![Line::from(Span::styled("Privacy notice", accent())), Line::default()];
    lines.extend(PRIVACY_TEXT.iter().map(|t| Line::from(*t)));

    let block = Block::default().borders(Borders::ALL).title(" gazemap ");
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}

fn readiness_line(readiness: &Readiness) -> Line<'static> {
    match readiness {
        Readiness::Ready => Line::from(Span::styled("Gaze estimator ready", bold().fg(Color::Green))),
        Readiness::Pending => Line::from(Span::styled(
            "Initializing gaze estimator...",
            bold().fg(Color::Yellow),
        )),
        Readiness::Unavailable(reason) => Line::from(vec![
            Span::styled("Gaze estimator unavailable: ", bold().fg(Color::Red)),
            Span::raw(reason.clone()),
        ]),
    }
}

pub fn render_home(app: &mut App, f: &mut Frame) {
    let session = &app.session;
    let ready = session.is_ready();
    let calibrated = session.has_calibrated();

    let calibrate_label = if calibrated { "recalibrate" } else { "calibrate" };
    let mut hints = vec![("c", calibrate_label)];
    if calibrated {
        hints.push(("t", "track"));
    }
    if !ready {
        hints.push(("r", "retry"));
    }
    hints.push(("q", "quit"));
    let body = with_footer(app, f.area(), &hints, f);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(body);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled("Visual Analytics", accent())),
            Line::from(Span::styled(
                "Calibrate the camera, look at the stimulus, then review where your attention went.",
                dim(),
            )),
        ])
        .alignment(Alignment::Center),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(readiness_line(session.readiness())).alignment(Alignment::Center),
        chunks[1],
    );

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    let calibration_status = if calibrated {
        Span::styled("Calibrated", Style::default().fg(Color::Green))
    } else {
        Span::styled("Not calibrated yet", Style::default().fg(Color::Yellow))
    };
    f.render_widget(
        Paragraph::new(vec![
            Line::from("Look at each target and click it until it turns green."),
            Line::default(),
            Line::from(calibration_status),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" 1. Calibrate ")),
        panels[0],
    );

    let track_status = if calibrated {
        Span::styled("Press t to start", Style::default().fg(Color::Green))
    } else {
        Span::styled("Calibrate first", dim())
    };
    f.render_widget(
        Paragraph::new(vec![
            Line::from(vec![Span::raw("Stimulus: "), Span::styled(app.stimulus.name(), bold())]),
            Line::from(format!("Size: {}", app.stimulus.extent())),
            Line::default(),
            Line::from(track_status),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" 2. Track ")),
        panels[1],
    );

    let gaze = match app.last_gaze() {
        Some(g) => format!("Gaze: ({:.0}, {:.0})", g.x, g.y),
        None => "Gaze: waiting for samples".to_string(),
    };
    f.render_widget(
        Paragraph::new(Span::styled(gaze, dim())).alignment(Alignment::Center),
        chunks[3],
    );
}
