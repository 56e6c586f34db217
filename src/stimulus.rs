use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::error::{GazeError, Result};
use crate::sample::Extent;

/// The image a subject looks at while tracking. The core only needs its extent.
#[derive(Debug, Clone)]
pub struct Stimulus {
    image: RgbaImage,
    source: Option<PathBuf>,
}

impl Stimulus {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path.as_ref())?.to_rgba8();
        log::info!(
            "loaded stimulus {} ({}x{})",
            path.as_ref().display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            image,
            source: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Plain white canvas used when no image was supplied
    pub fn blank(extent: Extent) -> Result<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(GazeError::InvalidExtent {
                width: extent.width,
                height: extent.height,
            });
        }
        Ok(Self {
            image: RgbaImage::from_pixel(extent.width, extent.height, Rgba([255, 255, 255, 255])),
            source: None,
        })
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blank canvas".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn blank_has_requested_extent() {
        let s = Stimulus::blank(Extent::new(32, 16)).unwrap();
        assert_eq!(s.extent(), Extent::new(32, 16));
        assert_eq!(s.image().get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
        assert_eq!(s.name(), "blank canvas");
    }

    #[test]
    fn blank_rejects_empty_extent() {
        assert!(matches!(
            Stimulus::blank(Extent::new(0, 10)),
            Err(GazeError::InvalidExtent { width: 0, height: 10 })
        ));
    }

    #[test]
    fn load_reads_natural_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stim.png");
        RgbaImage::from_pixel(20, 10, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let s = Stimulus::load(&path).unwrap();
        assert_eq!(s.extent(), Extent::new(20, 10));
        assert_eq!(s.name(), "stim.png");
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(Stimulus::load("/no/such/stimulus.png").is_err());
    }
}
