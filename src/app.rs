use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use image::RgbaImage;
use ratatui::layout::Rect;

use crate::config::{Config, ConfigStore};
use crate::estimator::GazeEstimator;
use crate::heatmap::HeatmapConfig;
use crate::overlay::{downsample, export_report, render_report, ReportImages};
use crate::report::ReportMetrics;
use crate::runtime::{AppEvent, GazeSink};
use crate::sample::GazeSample;
use crate::session::{Session, SessionEvent, SessionState};
use crate::stimulus::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    PrivacyNotice,
    Home,
    Calibration,
    Tracking,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTab {
    #[default]
    Heatmap,
    GazePlot,
}

impl ReportTab {
    pub fn index(&self) -> usize {
        match self {
            ReportTab::Heatmap => 0,
            ReportTab::GazePlot => 1,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ReportTab::Heatmap => ReportTab::GazePlot,
            ReportTab::GazePlot => ReportTab::Heatmap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Full-resolution image plus its most recent terminal-sized copy
#[derive(Debug, Clone)]
pub struct CachedImage {
    source: RgbaImage,
    fitted: Option<RgbaImage>,
}

impl CachedImage {
    pub fn new(source: RgbaImage) -> Self {
        Self {
            source,
            fitted: None,
        }
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    pub fn fitted(&mut self, width: u32, height: u32) -> &RgbaImage {
        let stale = self
            .fitted
            .as_ref()
            .map_or(true, |img| img.dimensions() != (width, height));
        if stale {
            self.fitted = Some(downsample(&self.source, width, height));
        }
        self.fitted.get_or_insert_with(|| RgbaImage::new(width, height))
    }
}

/// Rendered report, painted once when the session enters Reporting
#[derive(Debug, Clone)]
pub struct ReportView {
    pub title: String,
    pub metrics: ReportMetrics,
    pub heatmap: CachedImage,
    pub gaze_plot: CachedImage,
}

impl ReportView {
    fn new(title: String, metrics: ReportMetrics, images: ReportImages) -> Self {
        Self {
            title,
            metrics,
            heatmap: CachedImage::new(images.heatmap),
            gaze_plot: CachedImage::new(images.gaze_plot),
        }
    }
}

pub struct App {
    pub config: Config,
    pub session: Session,
    pub stimulus: Stimulus,
    pub preview: CachedImage,
    pub report_view: Option<ReportView>,
    pub report_tab: ReportTab,
    pub status: Option<String>,
    pub out_dir: PathBuf,
    /// Terminal area of the last draw, for mapping mouse clicks to screen pixels
    pub viewport: Rect,
    estimator: Box<dyn GazeEstimator>,
    sink: Option<GazeSink>,
    heatmap: HeatmapConfig,
}

impl App {
    pub fn new(
        config: Config,
        estimator: Box<dyn GazeEstimator>,
        stimulus: Stimulus,
        out_dir: PathBuf,
    ) -> Self {
        let session = Session::new(config.required_clicks, config.screen())
            .with_buffer_capacity(config.buffer_capacity);
        let heatmap = config.heatmap();
        Self {
            preview: CachedImage::new(stimulus.image().clone()),
            stimulus,
            config,
            session,
            report_view: None,
            report_tab: ReportTab::default(),
            status: None,
            out_dir,
            viewport: Rect::new(0, 0, 80, 24),
            estimator,
            sink: None,
            heatmap,
        }
    }

    pub fn screen(&self) -> AppScreen {
        if !self.config.privacy_acknowledged {
            return AppScreen::PrivacyNotice;
        }
        match self.session.state() {
            SessionState::Idle => AppScreen::Home,
            SessionState::Calibrating => AppScreen::Calibration,
            SessionState::Tracking => AppScreen::Tracking,
            SessionState::Reporting => AppScreen::Report,
        }
    }

    /// Bring the estimator up, remembering the sink for retries
    pub fn start_estimator(&mut self, sink: GazeSink) {
        self.sink = Some(sink);
        self.retry_estimator();
    }

    pub fn retry_estimator(&mut self) {
        if let Some(sink) = self.sink.clone() {
            let readiness = self.estimator.initialize(sink);
            self.session.set_readiness(readiness);
        }
    }

    pub fn shutdown(&mut self) {
        self.estimator.shutdown();
    }

    pub fn acknowledge_privacy(&mut self, store: &dyn ConfigStore) {
        self.config.privacy_acknowledged = true;
        if let Err(e) = store.save(&self.config) {
            log::warn!("could not persist privacy acknowledgement: {e}");
        }
    }

    /// Feed one session event, rendering the report on entry to Reporting
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        let before = self.session.state();
        let moved = self.session.handle(event, self.estimator.as_mut());
        let after = self.session.state();

        if before != SessionState::Reporting && after == SessionState::Reporting {
            self.build_report_view();
        } else if after != SessionState::Reporting {
            self.report_view = None;
        }
        moved
    }

    fn build_report_view(&mut self) {
        let Some(report) = self.session.report() else {
            return;
        };
        let images = render_report(report, &self.stimulus, &self.heatmap);
        log::info!(
            "report ready: {} samples over {}",
            report.samples().len(),
            self.stimulus.extent()
        );
        self.report_view = Some(ReportView::new(report.title(), report.metrics(), images));
        self.report_tab = ReportTab::Heatmap;
    }

    pub fn export(&mut self) {
        let (Some(report), Some(view)) = (self.session.report(), self.report_view.as_ref()) else {
            return;
        };
        let images = ReportImages {
            heatmap: view.heatmap.source().clone(),
            gaze_plot: view.gaze_plot.source().clone(),
        };
        self.status = Some(match export_report(&self.out_dir, report, &images) {
            Ok(files) => format!(
                "Exported to {}",
                files
                    .heatmap
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            Err(e) => {
                log::error!("export failed: {e}");
                format!("Export failed: {e}")
            }
        });
    }

    pub fn handle_event(&mut self, event: AppEvent, store: &dyn ConfigStore) -> Control {
        match event {
            AppEvent::Key(key) => self.handle_key(key, store),
            AppEvent::Mouse(mouse) => {
                self.handle_mouse(mouse);
                Control::Continue
            }
            AppEvent::Gaze(sample) => {
                self.dispatch(SessionEvent::SampleArrived(sample));
                Control::Continue
            }
            AppEvent::Resize | AppEvent::Tick => Control::Continue,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, store: &dyn ConfigStore) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        self.status = None;

        match self.screen() {
            AppScreen::PrivacyNotice => match key.code {
                KeyCode::Char('a') | KeyCode::Enter => self.acknowledge_privacy(store),
                KeyCode::Char('q') | KeyCode::Esc => return Control::Quit,
                _ => {}
            },
            AppScreen::Home => match key.code {
                KeyCode::Char('c') => {
                    if !self.dispatch(SessionEvent::StartCalibration) {
                        self.status = Some("Gaze estimator is not ready yet".to_string());
                    }
                }
                KeyCode::Char('t') => {
                    if !self.dispatch(SessionEvent::BeginTracking) {
                        self.status = Some(if self.session.is_ready() {
                            "Calibrate before tracking".to_string()
                        } else {
                            "Gaze estimator is not ready yet".to_string()
                        });
                    }
                }
                KeyCode::Char('r') => self.retry_estimator(),
                KeyCode::Char('q') | KeyCode::Esc => return Control::Quit,
                _ => {}
            },
            AppScreen::Calibration => match key.code {
                KeyCode::Char(c @ '1'..='9') => {
                    let id = c as usize - '1' as usize;
                    self.confirm_target(id, None);
                }
                KeyCode::Enter => {
                    if !self.dispatch(SessionEvent::CalibrationFinished) {
                        self.status = Some("Confirm every target first".to_string());
                    }
                }
                KeyCode::Char('c') => {
                    self.dispatch(SessionEvent::StartCalibration);
                }
                KeyCode::Esc => {
                    self.dispatch(SessionEvent::CancelCalibration);
                }
                KeyCode::Char('q') => return Control::Quit,
                _ => {}
            },
            AppScreen::Tracking => match key.code {
                KeyCode::Enter | KeyCode::Char('x') | KeyCode::Esc => {
                    self.dispatch(SessionEvent::StopTracking);
                }
                _ => {}
            },
            AppScreen::Report => match key.code {
                KeyCode::Char('h') => self.report_tab = ReportTab::Heatmap,
                KeyCode::Char('g') => self.report_tab = ReportTab::GazePlot,
                KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                    self.report_tab = self.report_tab.toggled()
                }
                KeyCode::Char('e') => self.export(),
                KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                    self.dispatch(SessionEvent::DismissReport);
                }
                KeyCode::Char('q') => return Control::Quit,
                _ => {}
            },
        }
        Control::Continue
    }

    /// Confirm a target; keyboard confirmations use the target centre as the click point
    fn confirm_target(&mut self, id: usize, click: Option<(f64, f64)>) {
        let screen = self.session.screen();
        let point = click.or_else(|| {
            self.session
                .tracker()
                .target(id)
                .map(|t| t.screen_point(screen))
        });
        if let Some((x, y)) = point {
            self.dispatch(SessionEvent::TargetConfirmed { target: id, x, y });
        }
    }

    /// Terminal cell to screen pixel, using the centre of the cell
    pub fn cell_to_screen(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let v = self.viewport;
        if v.width == 0 || v.height == 0 || !v.contains((column, row).into()) {
            return None;
        }
        let screen = self.session.screen();
        let x = (column - v.x) as f64 + 0.5;
        let y = (row - v.y) as f64 + 0.5;
        Some((
            x / v.width as f64 * screen.width as f64,
            y / v.height as f64 * screen.height as f64,
        ))
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.screen() != AppScreen::Calibration {
            return;
        }
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some((x, y)) = self.cell_to_screen(mouse.column, mouse.row) else {
            return;
        };
        let screen = self.session.screen();
        let cell_w = screen.width as f64 / self.viewport.width.max(1) as f64;
        let cell_h = screen.height as f64 / self.viewport.height.max(1) as f64;
        let tolerance = (cell_w * 2.0).max(cell_h * 1.5);

        if let Some(id) = self.session.tracker().target_at(x, y, screen, tolerance) {
            self.confirm_target(id, Some((x, y)));
        }
    }

    pub fn last_gaze(&self) -> Option<GazeSample> {
        self.session.last_gaze()
    }
}
