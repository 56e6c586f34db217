use itertools::Itertools;

use crate::sample::SampleSet;

pub const LABEL_EVERY: usize = 10;
pub const MARKER_BASE_RADIUS: f64 = 4.0;
pub const MARKER_RADIUS_GROWTH: f64 = 4.0;
pub const MARKER_BASE_OPACITY: f64 = 0.4;
pub const MARKER_OPACITY_GROWTH: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// Line style of the connecting polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub rgb: [u8; 3],
    pub opacity: f64,
    pub width: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            rgb: [37, 99, 235],
            opacity: 0.6,
            width: 3.0,
        }
    }
}

/// One sample's dot; later samples are bigger and more opaque
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub opacity: f64,
    /// Ordinal shown on the marker, if any
    pub label: Option<usize>,
}

/// Vector overlay of a sample set in temporal order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GazePath {
    pub polyline: Vec<PathPoint>,
    pub markers: Vec<Marker>,
    pub stroke: Stroke,
}

impl GazePath {
    /// Consecutive point pairs of the polyline
    pub fn segments(&self) -> impl Iterator<Item = (PathPoint, PathPoint)> + '_ {
        self.polyline.iter().copied().tuple_windows()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| m.label.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

fn is_labeled(index: usize, count: usize) -> bool {
    index % LABEL_EVERY == 0 || index + 1 == count
}

pub fn render_gaze_path(samples: &SampleSet) -> GazePath {
    let n = samples.len();
    let polyline = if n >= 2 {
        samples
            .iter()
            .map(|s| PathPoint { x: s.x, y: s.y })
            .collect()
    } else {
        Vec::new()
    };

    let markers = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let progress = i as f64 / n as f64;
            Marker {
                index: i,
                x: s.x,
                y: s.y,
                radius: MARKER_BASE_RADIUS + progress * MARKER_RADIUS_GROWTH,
                opacity: MARKER_BASE_OPACITY + progress * MARKER_OPACITY_GROWTH,
                label: is_labeled(i, n).then_some(i),
            }
        })
        .collect();

    GazePath {
        polyline,
        markers,
        stroke: Stroke::default(),
    }
}
