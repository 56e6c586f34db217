use ratatui::Frame;

use crate::app::{App, AppScreen};
use crate::ui::{calibration, home, report, tracking};

/// A UI screen boundary: each session state draws through one of these
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

pub struct PrivacyScreen;

impl Screen for PrivacyScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        home::render_privacy(app, f);
    }
}

pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        home::render_home(app, f);
    }
}

pub struct CalibrationScreen;

impl Screen for CalibrationScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        calibration::render_calibration(app, f);
    }
}

pub struct TrackingScreen;

impl Screen for TrackingScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        tracking::render_tracking(app, f);
    }
}

pub struct ReportScreen;

impl Screen for ReportScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        report::render_report(app, f);
    }
}

pub fn current_screen(screen: AppScreen) -> Box<dyn Screen> {
    match screen {
        AppScreen::PrivacyNotice => Box::new(PrivacyScreen),
        AppScreen::Home => Box::new(HomeScreen),
        AppScreen::Calibration => Box::new(CalibrationScreen),
        AppScreen::Tracking => Box::new(TrackingScreen),
        AppScreen::Report => Box::new(ReportScreen),
    }
}
