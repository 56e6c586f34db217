//! Half-block image rendering: each terminal cell shows two vertically
//! stacked pixels, the upper one as foreground of `▀` and the lower one
//! as background.

use image::RgbaImage;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use crate::app::CachedImage;

const UPPER_HALF: &str = "▀";

/// Largest (width, pixel-height) that fits `max` cells while keeping the aspect ratio.
/// Pixel height is twice the cell height.
pub fn fit_within(img_w: u32, img_h: u32, max_cols: u16, max_rows: u16) -> (u32, u32) {
    if img_w == 0 || img_h == 0 || max_cols == 0 || max_rows == 0 {
        return (0, 0);
    }
    let max_w = max_cols as f64;
    let max_h = max_rows as f64 * 2.0;
    let scale = (max_w / img_w as f64).min(max_h / img_h as f64);
    let w = ((img_w as f64 * scale).round() as u32).clamp(1, max_cols as u32);
    let h = ((img_h as f64 * scale).round() as u32).clamp(1, max_rows as u32 * 2);
    (w, h)
}

pub struct ImageView<'a> {
    image: &'a RgbaImage,
    background: [u8; 3],
}

impl<'a> ImageView<'a> {
    pub fn new(image: &'a RgbaImage) -> Self {
        Self {
            image,
            background: [0, 0, 0],
        }
    }

    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        if y >= self.image.height() {
            let [r, g, b] = self.background;
            return Color::Rgb(r, g, b);
        }
        let [r, g, b, a] = self.image.get_pixel(x, y).0;
        let a = a as u16;
        let mix = |c: u8, bg: u8| ((c as u16 * a + bg as u16 * (255 - a)) / 255) as u8;
        Color::Rgb(
            mix(r, self.background[0]),
            mix(g, self.background[1]),
            mix(b, self.background[2]),
        )
    }
}

impl Widget for ImageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cols = (self.image.width() as u16).min(area.width);
        let rows = (self.image.height().div_ceil(2) as u16).min(area.height);
        let left = area.x + (area.width - cols) / 2;
        let top = area.y + (area.height - rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let x = col as u32;
                let y = row as u32 * 2;
                if let Some(cell) = buf.cell_mut((left + col, top + row)) {
                    cell.set_symbol(UPPER_HALF)
                        .set_fg(self.color_at(x, y))
                        .set_bg(self.color_at(x, y + 1));
                }
            }
        }
    }
}

/// Fit a cached image into `area` and draw it centred
pub fn render_fitted(image: &mut CachedImage, area: Rect, buf: &mut Buffer) {
    let (w, h) = fit_within(
        image.source().width(),
        image.source().height(),
        area.width,
        area.height,
    );
    if w == 0 || h == 0 {
        return;
    }
    ImageView::new(image.fitted(w, h)).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fit_keeps_aspect_ratio() {
        // 16:9 into 80x24 cells -> 48 pixel rows limit the height
        let (w, h) = fit_within(1920, 1080, 80, 24);
        assert_eq!(h, 45);
        assert_eq!(w, 80);

        let (w, h) = fit_within(100, 400, 80, 24);
        assert_eq!(h, 48);
        assert_eq!(w, 12);
    }

    #[test]
    fn fit_degenerate_inputs() {
        assert_eq!(fit_within(0, 10, 80, 24), (0, 0));
        assert_eq!(fit_within(10, 10, 0, 24), (0, 0));
    }

    #[test]
    fn renders_two_pixels_per_cell() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));

        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        ImageView::new(&img).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), UPPER_HALF);
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn transparent_pixels_show_background() {
        let img = RgbaImage::from_pixel(1, 2, Rgba([255, 255, 255, 0]));
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        ImageView::new(&img)
            .background([10, 20, 30])
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(10, 20, 30));
    }
}
