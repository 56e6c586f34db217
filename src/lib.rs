// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod calibration;
pub mod config;
pub mod error;
pub mod estimator;
pub mod gaze_path;
pub mod heatmap;
pub mod overlay;
pub mod report;
pub mod runtime;
pub mod sample;
pub mod session;
pub mod stimulus;
pub mod ui;

pub use error::{GazeError, Result};
