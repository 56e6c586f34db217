use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::sample::{Extent, GazeSample, SampleSet};

/// A frozen tracking run, ready for rendering
#[derive(Debug, Clone)]
pub struct Report {
    samples: SampleSet,
    screen: Extent,
    created_at: DateTime<Local>,
}

/// Headline numbers shown above the visualizations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportMetrics {
    pub duration_secs: f64,
    pub point_count: usize,
    pub sample_rate_hz: f64,
}

impl Report {
    pub fn new(samples: SampleSet, screen: Extent, created_at: DateTime<Local>) -> Self {
        Self {
            samples,
            screen,
            created_at,
        }
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Pixel space the samples were recorded in
    pub fn screen(&self) -> Extent {
        self.screen
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Samples rescaled onto a stimulus displayed across the whole screen
    pub fn samples_for(&self, stimulus: Extent) -> SampleSet {
        self.samples.scaled(self.screen, stimulus)
    }

    pub fn metrics(&self) -> ReportMetrics {
        let duration_secs = self.samples.span_ms() / 1000.0;
        let point_count = self.samples.len();
        let sample_rate_hz = if duration_secs > 0.0 && point_count > 1 {
            (point_count - 1) as f64 / duration_secs
        } else {
            0.0
        };
        ReportMetrics {
            duration_secs,
            point_count,
            sample_rate_hz,
        }
    }

    pub fn title(&self) -> String {
        format!(
            "Generated on {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

pub fn read_samples_csv<P: AsRef<Path>>(path: P) -> Result<SampleSet> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut samples = Vec::new();
    for record in rdr.deserialize() {
        let sample: GazeSample = record?;
        samples.push(sample);
    }
    Ok(SampleSet::new(samples))
}

pub fn write_samples_csv<P: AsRef<Path>>(path: P, samples: &SampleSet) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for sample in samples {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}
