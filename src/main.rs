use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use env_logger::{Env, Target};
use gazemap::{
    app::{App, Control},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    estimator::{GazeEstimator, ReplayEstimator, SimulatedEstimator},
    heatmap::Kernel,
    overlay::{export_report, render_report},
    report::{read_samples_csv, Report},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner},
    sample::Extent,
    stimulus::Stimulus,
    ui,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 100;

/// webcam eye tracking with heatmap and gaze path reports
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Calibrate a gaze estimator against a 3x3 target grid, record where the eyes land while viewing a stimulus image, and review the run as a heatmap and an ordered gaze path."
)]
pub struct Cli {
    /// stimulus image shown while tracking (PNG or JPEG); a blank canvas is used if omitted
    #[clap(short = 'i', long)]
    stimulus: Option<PathBuf>,

    /// replay gaze samples from a CSV of x,y,timestamp instead of simulating them
    #[clap(long, value_name = "CSV")]
    replay: Option<PathBuf>,

    /// speed multiplier for --replay
    #[clap(long, default_value_t = 1.0)]
    replay_speed: f64,

    /// simulated estimator sample rate in Hz
    #[clap(long)]
    rate: Option<f64>,

    /// seed for the simulated estimator
    #[clap(long)]
    seed: Option<u64>,

    /// clicks needed on each calibration target
    #[clap(short = 'n', long)]
    required_clicks: Option<u32>,

    /// heatmap kernel radius in stimulus pixels
    #[clap(short = 'r', long)]
    radius: Option<f64>,

    /// heatmap kernel shape
    #[clap(short = 'k', long, value_enum)]
    kernel: Option<Kernel>,

    /// screen extent gaze samples are reported in, e.g. 1920x1080
    #[clap(long, value_name = "WxH")]
    screen: Option<Extent>,

    /// directory exported reports are written to
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,

    /// render a report from a CSV of samples without starting the TUI
    #[clap(long, value_name = "CSV")]
    render: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line win over the persisted config
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(n) = self.required_clicks {
            cfg.required_clicks = n;
        }
        if let Some(r) = self.radius {
            cfg.radius = r;
        }
        if let Some(k) = self.kernel {
            cfg.kernel = k;
        }
        if let Some(rate) = self.rate {
            cfg.sample_rate_hz = rate;
        }
        if let Some(screen) = self.screen {
            cfg.screen_width = screen.width;
            cfg.screen_height = screen.height;
        }
    }

    fn out_dir(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(AppDirs::reports_dir)
    }

    fn load_stimulus(&self, cfg: &Config) -> gazemap::Result<Stimulus> {
        match &self.stimulus {
            Some(path) => Stimulus::load(path),
            None => Stimulus::blank(cfg.screen()),
        }
    }

    fn estimator(&self, cfg: &Config) -> Box<dyn GazeEstimator> {
        if let Some(path) = &self.replay {
            return Box::new(ReplayEstimator::new(path).with_speed(self.replay_speed));
        }
        let sim = SimulatedEstimator::new(cfg.screen(), cfg.sample_rate_hz);
        match self.seed {
            Some(seed) => Box::new(sim.with_seed(seed)),
            None => Box::new(sim),
        }
    }
}

/// Route logs to a file while the TUI owns the terminal, to stderr otherwise
fn init_logging(to_file: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if to_file {
        let path = AppDirs::log_path();
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            // without a log file, stay silent rather than scribble over the TUI
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    let _ = builder.try_init();
}

fn render_offline(cli: &Cli, cfg: &Config, csv: &Path) -> Result<(), Box<dyn Error>> {
    let samples = read_samples_csv(csv)?;
    let stimulus = cli.load_stimulus(cfg)?;
    let report = Report::new(samples, cfg.screen(), chrono::Local::now());
    let images = render_report(&report, &stimulus, &cfg.heatmap());
    let files = export_report(cli.out_dir(), &report, &images)?;

    let m = report.metrics();
    println!(
        "{} samples over {:.1}s ({:.1} Hz)",
        m.point_count, m.duration_secs, m.sample_rate_hz
    );
    println!("{}", files.heatmap.display());
    println!("{}", files.gaze_plot.display());
    println!("{}", files.samples.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.render.is_none());

    let store = FileConfigStore::new();
    let mut cfg = store.load();
    cli.apply_to(&mut cfg);

    if let Some(csv) = &cli.render {
        return render_offline(&cli, &cfg, csv);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let stimulus = cli.load_stimulus(&cfg)?;
    let mut app = App::new(cfg.clone(), cli.estimator(&cfg), stimulus, cli.out_dir());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner, &store);
    app.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, FixedTicker>,
    store: &dyn ConfigStore,
) -> Result<(), Box<dyn Error>> {
    let frame_interval = Duration::from_millis(TICK_RATE_MS);
    app.start_estimator(runner.event_source().gaze_sink());
    terminal.draw(|f| ui::draw(app, f))?;
    let mut last_draw = Instant::now();

    loop {
        let event = runner.step();
        // gaze samples arrive faster than the screen needs refreshing
        let redraw =
            !matches!(event, AppEvent::Gaze(_)) || last_draw.elapsed() >= frame_interval;

        if app.handle_event(event, store) == Control::Quit {
            break;
        }
        if redraw {
            terminal.draw(|f| ui::draw(app, f))?;
            last_draw = Instant::now();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazemap::{
        app::AppScreen,
        config::MemoryConfigStore,
        runtime::TestEventSource,
        sample::GazeSample,
        session::SessionState,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    fn key(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["gazemap"]);
        assert!(cli.stimulus.is_none());
        assert!(cli.replay.is_none());
        assert_eq!(cli.replay_speed, 1.0);
        assert!(cli.render.is_none());

        let mut cfg = Config::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "gazemap",
            "--required-clicks",
            "3",
            "--radius",
            "55",
            "--kernel",
            "gaussian",
            "--screen",
            "1280x720",
            "--rate",
            "60",
        ]);
        let mut cfg = Config::default();
        cli.apply_to(&mut cfg);

        assert_eq!(cfg.required_clicks, 3);
        assert_eq!(cfg.radius, 55.0);
        assert_eq!(cfg.kernel, Kernel::Gaussian);
        assert_eq!(cfg.screen(), Extent::new(1280, 720));
        assert_eq!(cfg.sample_rate_hz, 60.0);
    }

    #[test]
    fn test_cli_rejects_bad_screen() {
        assert!(Cli::try_parse_from(["gazemap", "--screen", "wide"]).is_err());
        assert!(Cli::try_parse_from(["gazemap", "--screen", "0x100"]).is_err());
    }

    #[test]
    fn test_cli_render_and_out() {
        let cli = Cli::parse_from(["gazemap", "--render", "run.csv", "-o", "/tmp/reports"]);
        assert_eq!(cli.render, Some(PathBuf::from("run.csv")));
        assert_eq!(cli.out_dir(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_tick_rate_constant() {
        assert_eq!(TICK_RATE_MS, 100);
    }

    #[test]
    fn test_start_tui_runs_until_quit() {
        let cfg = Config {
            privacy_acknowledged: true,
            screen_width: 320,
            screen_height: 180,
            ..Config::default()
        };
        let cli = Cli::parse_from(["gazemap"]);
        let stimulus = Stimulus::blank(cfg.screen()).unwrap();
        let mut app = App::new(cfg.clone(), cli.estimator(&cfg), stimulus, PathBuf::from("."));
        let store = MemoryConfigStore::default();

        let source = TestEventSource::new();
        let tx = source.sender();
        tx.send(AppEvent::Gaze(GazeSample::new(10.0, 10.0, 0.0))).unwrap();
        tx.send(key('c')).unwrap();
        tx.send(key('q')).unwrap();
        let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(5)));

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        start_tui(&mut terminal, &mut app, &runner, &store).unwrap();
        app.shutdown();

        assert_eq!(app.session.state(), SessionState::Calibrating);
        assert_eq!(app.screen(), AppScreen::Calibration);
        assert!(buffer_text(&terminal).contains("Calibration"));
    }
}
