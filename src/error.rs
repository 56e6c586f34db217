use thiserror::Error;

/// Failures at the host boundary: files, images and config.
///
/// Session-level conditions (estimator not ready, rejected transitions,
/// out-of-bounds samples, empty sample sets) are not errors and never
/// surface through this type.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid extent {width}x{height}")]
    InvalidExtent { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, GazeError>;
