use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::report::read_samples_csv;
use crate::runtime::GazeSink;
use crate::sample::{Extent, GazeSample};

/// Outcome of bringing up a gaze estimator. Failure is a state, not an error:
/// the host keeps showing "not ready" until a retry succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Unavailable(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Receives known-truth screen points during calibration
pub trait CalibrationFeed {
    fn feed_calibration_point(&mut self, x: f64, y: f64);
}

/// External capability mapping camera frames to screen coordinates.
///
/// Once ready, samples are pushed into the sink from the estimator's own
/// producer; the session consumes them on the host loop.
pub trait GazeEstimator: CalibrationFeed {
    fn initialize(&mut self, sink: GazeSink) -> Readiness;

    fn shutdown(&mut self) {}
}

/// Feed that only remembers what it was given
#[derive(Debug, Default, Clone)]
pub struct RecordingFeed {
    pub points: Vec<(f64, f64)>,
}

impl CalibrationFeed for RecordingFeed {
    fn feed_calibration_point(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }
}

/// Producer thread bookkeeping shared by the adapters below
#[derive(Debug, Default)]
struct Producer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn start<F>(&mut self, body: F)
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        self.stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&self.stop);
        self.handle = Some(thread::spawn(move || body(stop)));
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Wandering fixation model: dwell near a point, then jump somewhere else
#[derive(Debug)]
pub struct GazeWalk {
    rng: StdRng,
    screen: Extent,
    fixation: (f64, f64),
    dwell_left: u32,
    jitter: f64,
}

impl GazeWalk {
    pub fn new(screen: Extent, seed: u64) -> Self {
        let mut walk = Self {
            rng: StdRng::seed_from_u64(seed),
            screen,
            fixation: (screen.width as f64 / 2.0, screen.height as f64 / 2.0),
            dwell_left: 0,
            jitter: 30.0,
        };
        walk.dwell_left = walk.rng.gen_range(8..40);
        walk
    }

    /// Calibrated estimators wobble less
    pub fn set_calibration_points(&mut self, fed: usize) {
        self.jitter = 30.0 / (1.0 + fed as f64 / 9.0);
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn next_sample(&mut self, timestamp: f64) -> GazeSample {
        if self.dwell_left == 0 {
            let w = self.screen.width as f64;
            let h = self.screen.height as f64;
            self.fixation = (
                self.rng.gen_range(0.05 * w..0.95 * w),
                self.rng.gen_range(0.05 * h..0.95 * h),
            );
            self.dwell_left = self.rng.gen_range(8..40);
        }
        self.dwell_left -= 1;

        let j = self.jitter.max(f64::EPSILON);
        GazeSample::new(
            self.fixation.0 + self.rng.gen_range(-j..j),
            self.fixation.1 + self.rng.gen_range(-j..j),
            timestamp,
        )
    }
}

/// Synthetic estimator for demos and headless runs
#[derive(Debug)]
pub struct SimulatedEstimator {
    screen: Extent,
    rate_hz: f64,
    seed: u64,
    fed: Arc<AtomicUsize>,
    producer: Producer,
}

impl SimulatedEstimator {
    pub fn new(screen: Extent, rate_hz: f64) -> Self {
        Self {
            screen,
            rate_hz: rate_hz.max(1.0),
            seed: rand::thread_rng().gen(),
            fed: Arc::new(AtomicUsize::new(0)),
            producer: Producer::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn calibration_points(&self) -> usize {
        self.fed.load(Ordering::Relaxed)
    }
}

impl CalibrationFeed for SimulatedEstimator {
    fn feed_calibration_point(&mut self, x: f64, y: f64) {
        let n = self.fed.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("simulated estimator calibration point #{n} at ({x:.0}, {y:.0})");
    }
}

impl GazeEstimator for SimulatedEstimator {
    fn initialize(&mut self, sink: GazeSink) -> Readiness {
        if self.producer.is_running() {
            return Readiness::Ready;
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Readiness::Unavailable(format!("invalid screen extent {}", self.screen));
        }

        let period = Duration::from_secs_f64(1.0 / self.rate_hz);
        let fed = Arc::clone(&self.fed);
        let mut walk = GazeWalk::new(self.screen, self.seed);
        log::info!(
            "starting simulated estimator at {:.0} Hz over {}",
            self.rate_hz,
            self.screen
        );

        self.producer.start(move |stop| {
            let started = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                walk.set_calibration_points(fed.load(Ordering::Relaxed));
                let t = started.elapsed().as_secs_f64() * 1000.0;
                if !sink.push(walk.next_sample(t)) {
                    break;
                }
                thread::sleep(period);
            }
        });
        Readiness::Ready
    }

    fn shutdown(&mut self) {
        self.producer.stop();
    }
}

impl Drop for SimulatedEstimator {
    fn drop(&mut self) {
        self.producer.stop();
    }
}

/// Replays a recorded `x,y,timestamp` CSV stream at its recorded pace
#[derive(Debug)]
pub struct ReplayEstimator {
    path: PathBuf,
    speed: f64,
    fed: usize,
    producer: Producer,
}

impl ReplayEstimator {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            speed: 1.0,
            fed: 0,
            producer: Producer::default(),
        }
    }

    /// Playback speed multiplier; values above 1 replay faster
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed > 0.0 { speed } else { 1.0 };
        self
    }

    pub fn calibration_points(&self) -> usize {
        self.fed
    }
}

impl CalibrationFeed for ReplayEstimator {
    fn feed_calibration_point(&mut self, x: f64, y: f64) {
        // recorded streams are already calibrated
        self.fed += 1;
        log::debug!("replay estimator ignoring calibration point ({x:.0}, {y:.0})");
    }
}

impl GazeEstimator for ReplayEstimator {
    fn initialize(&mut self, sink: GazeSink) -> Readiness {
        if self.producer.is_running() {
            return Readiness::Ready;
        }
        let samples = match read_samples_csv(&self.path) {
            Ok(samples) => samples,
            Err(e) => {
                return Readiness::Unavailable(format!("{}: {e}", self.path.display()))
            }
        };
        log::info!(
            "replaying {} samples from {}",
            samples.len(),
            self.path.display()
        );

        let speed = self.speed;
        self.producer.start(move |stop| {
            let mut prev: Option<f64> = None;
            for sample in samples.iter() {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(p) = prev {
                    let gap_ms = ((sample.timestamp - p) / speed).clamp(0.0, 5_000.0);
                    thread::sleep(Duration::from_secs_f64(gap_ms / 1000.0));
                }
                prev = Some(sample.timestamp);
                if !sink.push(*sample) {
                    break;
                }
            }
        });
        Readiness::Ready
    }

    fn shutdown(&mut self) {
        self.producer.stop();
    }
}

impl Drop for ReplayEstimator {
    fn drop(&mut self) {
        self.producer.stop();
    }
}
