//! Host-side painting: puts renderer output on top of the stimulus.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::Result;
use crate::gaze_path::{render_gaze_path, GazePath, Marker};
use crate::heatmap::{render_heatmap, DensitySurface, HeatmapConfig};
use crate::report::{write_samples_csv, Report};
use crate::stimulus::Stimulus;

const WHITE: [u8; 3] = [255, 255, 255];

/// 3x5 bitmap digits for marker labels
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Source-over blend of one straight-alpha RGBA value onto `dst`
pub fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as f64 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let v = (src[c] as f64 * sa + dst[c] as f64 * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn rgba(rgb: [u8; 3], opacity: f64) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], (opacity.clamp(0.0, 1.0) * 255.0).round() as u8]
}

/// Draws the heatmap layer over the image with its own per-pixel alpha
pub fn composite_heatmap(base: &RgbaImage, surface: &DensitySurface) -> RgbaImage {
    let mut out = base.clone();
    let w = out.width().min(surface.width());
    let h = out.height().min(surface.height());
    for y in 0..h {
        for x in 0..w {
            blend(out.get_pixel_mut(x, y), surface.get(x, y));
        }
    }
    out
}

fn distance_to_segment(px: f64, py: f64, a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((px - a.0) * dx + (py - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

fn fill_disc(img: &mut RgbaImage, m: &Marker, color: [u8; 4], ring: Option<[u8; 4]>) {
    if !m.x.is_finite() || !m.y.is_finite() {
        return;
    }
    let r = m.radius;
    let x0 = (m.x - r - 1.0).floor().max(0.0) as u32;
    let y0 = (m.y - r - 1.0).floor().max(0.0) as u32;
    let x1 = ((m.x + r + 1.0).ceil() as i64).min(img.width() as i64 - 1);
    let y1 = ((m.y + r + 1.0).ceil() as i64).min(img.height() as i64 - 1);
    if x1 < 0 || y1 < 0 {
        return;
    }
    for y in y0..=y1 as u32 {
        for x in x0..=x1 as u32 {
            let d = ((x as f64 + 0.5 - m.x).powi(2) + (y as f64 + 0.5 - m.y).powi(2)).sqrt();
            if d > r {
                continue;
            }
            match ring {
                Some(ring) if d > r - 1.0 => blend(img.get_pixel_mut(x, y), ring),
                _ => blend(img.get_pixel_mut(x, y), color),
            }
        }
    }
}

fn draw_label(img: &mut RgbaImage, text: &str, cx: f64, cy: f64) {
    if !cx.is_finite() || !cy.is_finite() {
        return;
    }
    let digits: Vec<usize> = text
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as usize)
        .collect();
    let width = (digits.len() * 4).saturating_sub(1) as f64;
    let left = (cx - width / 2.0).round() as i64;
    let top = (cy - 2.5).round() as i64;

    for (i, d) in digits.iter().enumerate() {
        for (row, bits) in DIGITS[*d].iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let x = left + (i * 4 + col) as i64;
                let y = top + row as i64;
                if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                    blend(img.get_pixel_mut(x as u32, y as u32), rgba(WHITE, 1.0));
                }
            }
        }
    }
}

/// Rasterizes polyline, markers and labels over the image
pub fn paint_gaze_path(base: &RgbaImage, path: &GazePath) -> RgbaImage {
    let mut out = base.clone();
    let (w, h) = (out.width(), out.height());
    let half = path.stroke.width / 2.0;

    // stroke coverage first so overlapping segments don't double up alpha
    let mut covered = vec![false; (w * h) as usize];
    for (a, b) in path.segments() {
        let x0 = (a.x.min(b.x) - half).floor().max(0.0) as u32;
        let y0 = (a.y.min(b.y) - half).floor().max(0.0) as u32;
        let x1 = ((a.x.max(b.x) + half).ceil() as i64).min(w as i64 - 1);
        let y1 = ((a.y.max(b.y) + half).ceil() as i64).min(h as i64 - 1);
        if x1 < 0 || y1 < 0 {
            continue;
        }
        for y in y0..=y1 as u32 {
            for x in x0..=x1 as u32 {
                let d = distance_to_segment(x as f64 + 0.5, y as f64 + 0.5, (a.x, a.y), (b.x, b.y));
                if d <= half {
                    covered[(y * w + x) as usize] = true;
                }
            }
        }
    }
    let stroke = rgba(path.stroke.rgb, path.stroke.opacity);
    for (i, _) in covered.iter().enumerate().filter(|(_, c)| **c) {
        let (x, y) = (i as u32 % w, i as u32 / w);
        blend(out.get_pixel_mut(x, y), stroke);
    }

    for m in &path.markers {
        fill_disc(
            &mut out,
            m,
            rgba(path.stroke.rgb, m.opacity),
            Some(rgba(WHITE, 1.0)),
        );
    }
    for m in path.labels() {
        if let Some(label) = m.label {
            draw_label(&mut out, &label.to_string(), m.x, m.y);
        }
    }
    out
}

/// Both visualizations of a report, painted at the stimulus' natural size
#[derive(Debug, Clone)]
pub struct ReportImages {
    pub heatmap: RgbaImage,
    pub gaze_plot: RgbaImage,
}

pub fn render_report(report: &Report, stimulus: &Stimulus, config: &HeatmapConfig) -> ReportImages {
    let extent = stimulus.extent();
    let samples = report.samples_for(extent);

    let surface = render_heatmap(&samples, extent, config);
    let path = render_gaze_path(&samples);

    ReportImages {
        heatmap: composite_heatmap(stimulus.image(), &surface),
        gaze_plot: paint_gaze_path(stimulus.image(), &path),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub heatmap: PathBuf,
    pub gaze_plot: PathBuf,
    pub samples: PathBuf,
}

/// Writes heatmap.png, gazeplot.png and samples.csv into a timestamped folder
pub fn export_report<P: AsRef<Path>>(
    dir: P,
    report: &Report,
    images: &ReportImages,
) -> Result<ExportedFiles> {
    let folder = dir
        .as_ref()
        .join(report.created_at().format("report-%Y%m%d-%H%M%S").to_string());
    std::fs::create_dir_all(&folder)?;

    let files = ExportedFiles {
        heatmap: folder.join("heatmap.png"),
        gaze_plot: folder.join("gazeplot.png"),
        samples: folder.join("samples.csv"),
    };
    images.heatmap.save(&files.heatmap)?;
    images.gaze_plot.save(&files.gaze_plot)?;
    write_samples_csv(&files.samples, report.samples())?;
    log::info!("exported report to {}", folder.display());
    Ok(files)
}

/// Shrinks an image to a terminal-sized grid of pixels
pub fn downsample(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Extent, GazeSample, SampleSet};
    use chrono::Local;
    use tempfile::tempdir;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn blend_transparent_is_noop() {
        let mut px = Rgba([10, 20, 30, 255]);
        blend(&mut px, [255, 0, 0, 0]);
        assert_eq!(px, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn blend_opaque_replaces() {
        let mut px = Rgba([10, 20, 30, 255]);
        blend(&mut px, [255, 0, 0, 255]);
        assert_eq!(px, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn empty_heatmap_leaves_image_untouched() {
        let base = white(30, 20);
        let surface = render_heatmap(&SampleSet::default(), Extent::new(30, 20), &HeatmapConfig::default());
        assert_eq!(composite_heatmap(&base, &surface), base);
    }

    #[test]
    fn hot_spot_tints_the_image() {
        let base = white(60, 60);
        let set: SampleSet = (0..5).map(|i| GazeSample::new(30.5, 30.5, i as f64)).collect();
        let surface = render_heatmap(&set, Extent::new(60, 60), &HeatmapConfig::default());
        let out = composite_heatmap(&base, &surface);

        let centre = out.get_pixel(30, 30);
        assert!(centre[0] > 200 && centre[1] < 80 && centre[2] < 80);
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn gaze_path_paints_line_and_markers() {
        let base = white(100, 40);
        let set = SampleSet::new(vec![
            GazeSample::new(10.0, 20.0, 0.0),
            GazeSample::new(90.0, 20.0, 10.0),
        ]);
        let out = paint_gaze_path(&base, &render_gaze_path(&set));

        // mid-segment is blue-tinted
        let mid = out.get_pixel(50, 19);
        assert!(mid[2] > mid[0]);
        // far from the path stays white
        assert_eq!(out.get_pixel(50, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn single_point_draws_marker_only() {
        let base = white(40, 40);
        let set = SampleSet::new(vec![GazeSample::new(20.0, 20.0, 0.0)]);
        let out = paint_gaze_path(&base, &render_gaze_path(&set));
        assert_ne!(out, base);
        assert_eq!(out.get_pixel(0, 20), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn non_finite_marker_is_skipped() {
        let base = white(20, 20);
        let set = SampleSet::new(vec![GazeSample::new(f64::NAN, 5.0, 0.0)]);
        let out = paint_gaze_path(&base, &render_gaze_path(&set));
        assert_eq!(out, base);
    }

    #[test]
    fn export_writes_all_files() {
        let dir = tempdir().unwrap();
        let stimulus = Stimulus::blank(Extent::new(50, 40)).unwrap();
        let report = Report::new(
            SampleSet::new(vec![
                GazeSample::new(10.0, 10.0, 0.0),
                GazeSample::new(40.0, 30.0, 30.0),
            ]),
            Extent::new(50, 40),
            Local::now(),
        );
        let images = render_report(&report, &stimulus, &HeatmapConfig::default());
        let files = export_report(dir.path(), &report, &images).unwrap();

        assert!(files.heatmap.exists());
        assert!(files.gaze_plot.exists());
        assert!(files.samples.exists());
        let reloaded = image::open(&files.heatmap).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (50, 40));
    }

    #[test]
    fn downsample_to_terminal_grid() {
        let img = white(200, 100);
        let small = downsample(&img, 20, 10);
        assert_eq!(small.dimensions(), (20, 10));
        assert_eq!(downsample(&img, 0, 10).dimensions(), (0, 10));
    }
}
