//! Spatial attention map: density accumulation followed by color mapping.
//!
//! The pipeline has two independent passes. [`accumulate_density`] spreads
//! every in-bounds sample into a float [`DensityGrid`] with a radial kernel,
//! and [`colorize`] maps the grid through a 256-entry [`ColorLut`] into an
//! RGBA [`DensitySurface`]. Painting the surface over the stimulus is the
//! host's job (see `overlay`).

use serde::{Deserialize, Serialize};

use crate::sample::{Extent, SampleSet};

pub const LUT_SIZE: usize = 256;
pub const DEFAULT_RADIUS: f64 = 40.0;
pub const DEFAULT_SATURATION: f64 = 1.0;

/// Per-sample falloff shape
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Kernel {
    /// `1 - d/r`
    #[default]
    Linear,
    /// Gaussian (sigma = r/3) shifted and rescaled to reach zero at `r`
    Gaussian,
}

impl Kernel {
    /// Contribution at distance `d` from a sample; 1 at the centre, 0 from `r` on
    pub fn weight(&self, d: f64, r: f64) -> f64 {
        if r <= 0.0 || d >= r {
            return 0.0;
        }
        match self {
            Kernel::Linear => 1.0 - d / r,
            Kernel::Gaussian => {
                let sigma = r / 3.0;
                let g = |x: f64| (-(x * x) / (2.0 * sigma * sigma)).exp();
                let floor = g(r);
                ((g(d) - floor) / (1.0 - floor)).max(0.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapConfig {
    pub radius: f64,
    pub kernel: Kernel,
    /// Accumulated intensity that maps to the hottest LUT entry
    pub saturation: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            kernel: Kernel::Linear,
            saturation: DEFAULT_SATURATION,
        }
    }
}

/// Uncapped accumulated intensity per pixel
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    extent: Extent,
    values: Vec<f32>,
}

impl DensityGrid {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            values: vec![0.0; extent.pixel_count()],
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.extent.width || y >= self.extent.height {
            return 0.0;
        }
        self.values[(y * self.extent.width + x) as usize]
    }

    /// Adds one kernel centred on (x, y). Samples outside the grid are
    /// discarded and reported by returning false.
    pub fn accumulate(&mut self, x: f64, y: f64, radius: f64, kernel: Kernel) -> bool {
        if !self.extent.contains(x, y) {
            return false;
        }
        let w = self.extent.width as i64;
        let h = self.extent.height as i64;
        let x0 = ((x - radius).floor() as i64).max(0);
        let x1 = ((x + radius).ceil() as i64).min(w - 1);
        let y0 = ((y - radius).floor() as i64).max(0);
        let y1 = ((y + radius).ceil() as i64).min(h - 1);

        for py in y0..=y1 {
            let dy = py as f64 + 0.5 - y;
            let row = (py * w) as usize;
            for px in x0..=x1 {
                let dx = px as f64 + 0.5 - x;
                let contribution = kernel.weight((dx * dx + dy * dy).sqrt(), radius);
                if contribution > 0.0 {
                    self.values[row + px as usize] += contribution as f32;
                }
            }
        }
        true
    }

    pub fn peak(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Inclusive (min_x, min_y, max_x, max_y) of non-zero pixels
    pub fn nonzero_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let w = self.extent.width.max(1);
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(i, _)| (i as u32 % w, i as u32 / w))
            .fold(None, |acc, (x, y)| match acc {
                None => Some((x, y, x, y)),
                Some((ax, ay, bx, by)) => Some((ax.min(x), ay.min(y), bx.max(x), by.max(y))),
            })
    }
}

/// First pass: spread every in-bounds sample into the grid
pub fn accumulate_density(samples: &SampleSet, extent: Extent, config: &HeatmapConfig) -> DensityGrid {
    let mut grid = DensityGrid::new(extent);
    let dropped = samples
        .iter()
        .filter(|s| !grid.accumulate(s.x, s.y, config.radius, config.kernel))
        .count();
    if dropped > 0 {
        log::debug!("discarded {dropped} out-of-bounds samples for {extent}");
    }
    grid
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub rgba: [u8; 4],
}

impl ColorStop {
    /// Alpha given in [0, 1] like a CSS rgba()
    pub fn new(offset: f64, r: u8, g: u8, b: u8, alpha: f64) -> Self {
        Self {
            offset,
            rgba: [r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8],
        }
    }
}

/// Fixed gradient lookup from scalar intensity to color
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLut {
    entries: Vec<[u8; 4]>,
}

impl ColorLut {
    /// Transparent blue, green, yellow, near-opaque red
    pub fn heat() -> Self {
        Self::from_stops(&[
            ColorStop::new(0.0, 0, 0, 255, 0.0),
            ColorStop::new(0.1, 0, 0, 255, 0.1),
            ColorStop::new(0.3, 0, 255, 0, 0.5),
            ColorStop::new(0.5, 255, 255, 0, 0.7),
            ColorStop::new(1.0, 255, 0, 0, 0.9),
        ])
    }

    pub fn from_stops(stops: &[ColorStop]) -> Self {
        let mut stops = stops.to_vec();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let entries = (0..LUT_SIZE)
            .map(|i| {
                let t = i as f64 / (LUT_SIZE - 1) as f64;
                interpolate(&stops, t)
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[[u8; 4]] {
        &self.entries
    }

    pub fn lookup(&self, index: usize) -> [u8; 4] {
        self.entries[index.min(LUT_SIZE - 1)]
    }

    /// LUT index for an accumulated intensity, saturating at the last entry
    pub fn index_for(intensity: f64, saturation: f64) -> usize {
        if intensity <= 0.0 || saturation <= 0.0 {
            return 0;
        }
        (intensity / saturation * (LUT_SIZE - 1) as f64).clamp(0.0, (LUT_SIZE - 1) as f64) as usize
    }
}

impl Default for ColorLut {
    fn default() -> Self {
        Self::heat()
    }
}

fn interpolate(stops: &[ColorStop], t: f64) -> [u8; 4] {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return [0, 0, 0, 0],
    };
    if t <= first.offset {
        return first.rgba;
    }
    if t >= last.offset {
        return last.rgba;
    }
    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t >= a.offset && t <= b.offset {
            let span = b.offset - a.offset;
            let f = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            let mut out = [0u8; 4];
            for (c, o) in out.iter_mut().enumerate() {
                let v = a.rgba[c] as f64 + (b.rgba[c] as f64 - a.rgba[c] as f64) * f;
                *o = v.round().clamp(0.0, 255.0) as u8;
            }
            return out;
        }
    }
    last.rgba
}

/// Color-mapped density, row-major RGBA
#[derive(Debug, Clone, PartialEq)]
pub struct DensitySurface {
    extent: Extent,
    pixels: Vec<u8>,
}

impl DensitySurface {
    pub fn transparent(extent: Extent) -> Self {
        Self {
            extent,
            pixels: vec![0; extent.pixel_count() * 4],
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.extent.width || y >= self.extent.height {
            return [0, 0, 0, 0];
        }
        let i = (y * self.extent.width + x) as usize * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn is_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }
}

/// Second pass: map each accumulated intensity through the LUT
pub fn colorize(grid: &DensityGrid, lut: &ColorLut, saturation: f64) -> DensitySurface {
    let mut surface = DensitySurface::transparent(grid.extent());
    for (px, value) in surface.pixels.chunks_exact_mut(4).zip(grid.values()) {
        if *value > 0.0 {
            px.copy_from_slice(&lut.lookup(ColorLut::index_for(*value as f64, saturation)));
        }
    }
    surface
}

/// Full heatmap render of a frozen sample set at the given extent
pub fn render_heatmap(samples: &SampleSet, extent: Extent, config: &HeatmapConfig) -> DensitySurface {
    let grid = accumulate_density(samples, extent, config);
    log::debug!(
        "heatmap {} from {} samples, peak {:.2}",
        extent,
        samples.len(),
        grid.peak()
    );
    colorize(&grid, &ColorLut::heat(), config.saturation)
}
