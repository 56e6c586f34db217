use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// One gaze estimate in screen pixels, timestamped in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, timestamp: f64) -> Self {
        Self { x, y, timestamp }
    }

    /// Rescale from one pixel extent into another, keeping the timestamp
    pub fn scaled(&self, from: Extent, to: Extent) -> Self {
        let sx = to.width as f64 / from.width.max(1) as f64;
        let sy = to.height as f64 / from.height.max(1) as f64;
        Self {
            x: self.x * sx,
            y: self.y * sy,
            timestamp: self.timestamp,
        }
    }
}

impl From<(f64, f64, f64)> for GazeSample {
    fn from(v: (f64, f64, f64)) -> Self {
        GazeSample::new(v.0, v.1, v.2)
    }
}

/// Pixel dimensions of a screen, stimulus or render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Extent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
        let height = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
        if width == 0 || height == 0 {
            return Err(format!("extent must be non-zero, got '{s}'"));
        }
        Ok(Extent { width, height })
    }
}

/// Frozen, time-ordered samples from one tracking run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<GazeSample>,
}

impl SampleSet {
    pub fn new(samples: Vec<GazeSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[GazeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GazeSample> {
        self.samples.iter()
    }

    /// Milliseconds between first and last sample
    pub fn span_ms(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).max(0.0),
            _ => 0.0,
        }
    }

    pub fn scaled(&self, from: Extent, to: Extent) -> SampleSet {
        if from == to {
            return self.clone();
        }
        SampleSet::new(self.samples.iter().map(|s| s.scaled(from, to)).collect())
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a GazeSample;
    type IntoIter = std::slice::Iter<'a, GazeSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl FromIterator<GazeSample> for SampleSet {
    fn from_iter<I: IntoIterator<Item = GazeSample>>(iter: I) -> Self {
        SampleSet::new(iter.into_iter().collect())
    }
}

/// Accumulates samples for the duration of one tracking run
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: VecDeque<GazeSample>,
    capacity: Option<usize>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded buffer that drops the oldest sample on overflow
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Appends only while tracking; returns whether the sample was kept
    pub fn record(&mut self, state: SessionState, sample: GazeSample) -> bool {
        if state != SessionState::Tracking {
            return false;
        }
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return false;
            }
            if self.samples.len() == cap {
                self.samples.pop_front();
            }
        }
        self.samples.push_back(sample);
        true
    }

    /// Hands the accumulated samples to the caller and empties the buffer
    pub fn drain(&mut self) -> SampleSet {
        SampleSet::new(self.samples.drain(..).collect())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_only_while_tracking() {
        let mut buf = SampleBuffer::new();

        assert!(!buf.record(SessionState::Idle, GazeSample::new(1.0, 1.0, 0.0)));
        assert!(!buf.record(SessionState::Calibrating, GazeSample::new(2.0, 2.0, 1.0)));
        assert!(!buf.record(SessionState::Reporting, GazeSample::new(3.0, 3.0, 2.0)));
        assert!(buf.is_empty());

        assert!(buf.record(SessionState::Tracking, GazeSample::new(4.0, 4.0, 3.0)));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn drain_preserves_order_and_clears() {
        let mut buf = SampleBuffer::new();
        for i in 0..5 {
            buf.record(SessionState::Tracking, GazeSample::new(i as f64, 0.0, i as f64));
        }

        let set = buf.drain();
        assert!(buf.is_empty());
        let xs: Vec<f64> = set.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn reset_empties_buffer() {
        let mut buf = SampleBuffer::new();
        buf.record(SessionState::Tracking, GazeSample::new(1.0, 1.0, 0.0));
        buf.reset();
        assert!(buf.is_empty());
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn bounded_buffer_drops_oldest() {
        let mut buf = SampleBuffer::with_capacity(3);
        for i in 0..5 {
            buf.record(SessionState::Tracking, GazeSample::new(i as f64, 0.0, i as f64));
        }
        let xs: Vec<f64> = buf.drain().iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn span_of_sample_set() {
        let set: SampleSet = vec![
            GazeSample::new(0.0, 0.0, 1000.0),
            GazeSample::new(0.0, 0.0, 1500.0),
            GazeSample::new(0.0, 0.0, 3500.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.span_ms(), 2500.0);
        assert_eq!(SampleSet::default().span_ms(), 0.0);
    }

    #[test]
    fn extent_parsing() {
        assert_eq!("1920x1080".parse::<Extent>(), Ok(Extent::new(1920, 1080)));
        assert_eq!("640X480".parse::<Extent>(), Ok(Extent::new(640, 480)));
        assert!("0x10".parse::<Extent>().is_err());
        assert!("1920".parse::<Extent>().is_err());
        assert!("axb".parse::<Extent>().is_err());
    }

    #[test]
    fn huge_capacity_does_not_preallocate() {
        let mut buf = SampleBuffer::with_capacity(usize::MAX);
        assert!(buf.record(SessionState::Tracking, GazeSample::new(1.0, 2.0, 0.0)));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn extent_contains_is_half_open() {
        let e = Extent::new(10, 5);
        assert!(e.contains(0.0, 0.0));
        assert!(e.contains(9.99, 4.99));
        assert!(!e.contains(10.0, 2.0));
        assert!(!e.contains(2.0, 5.0));
        assert!(!e.contains(-0.1, 2.0));
    }

    #[test]
    fn scaling_between_extents() {
        let s = GazeSample::new(960.0, 540.0, 7.0);
        let scaled = s.scaled(Extent::new(1920, 1080), Extent::new(640, 360));
        assert_eq!(scaled, GazeSample::new(320.0, 180.0, 7.0));
    }
}
