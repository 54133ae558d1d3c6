//! PNG output for [`Chart`]
//!
//! Everything is drawn in unscaled canvas coordinates and multiplied by the
//! scale factor on the way to the pixel buffer.

use super::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::{format_tick, ticks, Chart, Color, Mark};
use crate::error::{PredictorError, Result};
use image::{Rgb, RgbImage};

/// Canvas-space rectangle `(left, top, right, bottom)`
type Rect = (f64, f64, f64, f64);

struct Canvas {
    image: RgbImage,
    scale: f64,
}

impl Canvas {
    fn new(width: u32, height: u32, scale: f64) -> Self {
        let w = ((width as f64) * scale).ceil().max(1.0) as u32;
        let h = ((height as f64) * scale).ceil().max(1.0) as u32;
        Self {
            image: RgbImage::from_pixel(w, h, rgb(Color::WHITE)),
            scale,
        }
    }

    fn put(&mut self, px: i64, py: i64, color: Color, clip: Option<Rect>) {
        if px < 0 || py < 0 || px >= self.image.width() as i64 || py >= self.image.height() as i64 {
            return;
        }
        if let Some((l, t, r, b)) = clip {
            let (cx, cy) = ((px as f64 + 0.5) / self.scale, (py as f64 + 0.5) / self.scale);
            if cx < l || cx > r || cy < t || cy > b {
                return;
            }
        }
        self.image.put_pixel(px as u32, py as u32, rgb(color));
    }

    /// Fill the canvas-space rectangle
    fn fill_rect(&mut self, rect: Rect, color: Color, clip: Option<Rect>) {
        let (l, t, r, b) = rect;
        let x0 = (l * self.scale).floor() as i64;
        let y0 = (t * self.scale).floor() as i64;
        let x1 = ((r * self.scale).ceil() as i64).max(x0 + 1);
        let y1 = ((b * self.scale).ceil() as i64).max(y0 + 1);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put(px, py, color, clip);
            }
        }
    }

    fn fill_disc(&mut self, cx: f64, cy: f64, radius: f64, color: Color, clip: Option<Rect>) {
        let (cx, cy) = (cx * self.scale, cy * self.scale);
        let r = (radius * self.scale).max(0.5);
        let r2 = r * r;
        for py in (cy - r).floor() as i64..=(cy + r).ceil() as i64 {
            for px in (cx - r).floor() as i64..=(cx + r).ceil() as i64 {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.put(px, py, color, clip);
                }
            }
        }
    }

    /// Thick segment stamped as discs every half pixel
    fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color, clip: Option<Rect>) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt() * self.scale;
        let steps = (length * 2.0).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            self.fill_disc(from.0 + t * dx, from.1 + t * dy, width / 2.0, color, clip);
        }
    }

    /// Horizontal text with its top-left corner at (`x`, `y`)
    fn text(&mut self, text: &str, x: f64, y: f64, color: Color) {
        for (i, c) in text.chars().enumerate() {
            let Some(rows) = font::glyph(c) else { continue };
            let origin = x + (i as u32 * ADVANCE) as f64;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if font::pixel(&rows, col, row) {
                        let (px, py) = (origin + col as f64, y + row as f64);
                        self.fill_rect((px, py, px + 1.0, py + 1.0), color, None);
                    }
                }
            }
        }
    }

    /// Text rotated a quarter turn counter-clockwise, reading bottom to top
    /// from (`x`, `y`)
    fn text_vertical(&mut self, text: &str, x: f64, y: f64, color: Color) {
        for (i, c) in text.chars().enumerate() {
            let Some(rows) = font::glyph(c) else { continue };
            let offset = (i as u32 * ADVANCE) as f64;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if font::pixel(&rows, col, row) {
                        let px = x + row as f64;
                        let py = y - offset - col as f64 - 1.0;
                        self.fill_rect((px, py, px + 1.0, py + 1.0), color, None);
                    }
                }
            }
        }
    }
}

fn rgb(color: Color) -> Rgb<u8> {
    Rgb([color.r, color.g, color.b])
}

pub(super) fn render(chart: &Chart, scale_factor: f64) -> Result<RgbImage> {
    if !(scale_factor > 0.0) || !scale_factor.is_finite() {
        return Err(PredictorError::InvalidParameter {
            name: "scale_factor".to_string(),
            value: scale_factor.to_string(),
            reason: "must be a positive number".to_string(),
        });
    }
    if chart.width == 0 || chart.height == 0 {
        return Err(PredictorError::RenderError("chart has an empty plot area".to_string()));
    }

    let (width, height) = chart.canvas_size();
    let mut canvas = Canvas::new(width, height, scale_factor);
    let plot = chart.plot_rect();
    let (left, top, right, bottom) = plot;

    for value in ticks(chart.x_domain) {
        let (x, _) = chart.project(value, chart.y_domain.0);
        canvas.fill_rect((x - 0.5, top, x + 0.5, bottom), Color::GRID, None);
        let label = format_tick(value);
        let w = font::text_width(&label) as f64;
        canvas.text(&label, x - w / 2.0, bottom + 6.0, Color::TEXT);
    }
    for value in ticks(chart.y_domain) {
        let (_, y) = chart.project(chart.x_domain.0, value);
        canvas.fill_rect((left, y - 0.5, right, y + 0.5), Color::GRID, None);
        let label = format_tick(value);
        let w = font::text_width(&label) as f64;
        canvas.text(&label, left - 6.0 - w, y - GLYPH_HEIGHT as f64 / 2.0, Color::TEXT);
    }

    canvas.fill_rect((left, bottom - 0.5, right, bottom + 0.5), Color::AXIS, None);
    canvas.fill_rect((left - 0.5, top, left + 0.5, bottom), Color::AXIS, None);

    let x_title_w = font::text_width(&chart.x_title) as f64;
    canvas.text(&chart.x_title, left + (right - left - x_title_w) / 2.0, bottom + 28.0, Color::TEXT);
    let y_title_w = font::text_width(&chart.y_title) as f64;
    canvas.text_vertical(&chart.y_title, 10.0, top + (bottom - top + y_title_w) / 2.0, Color::TEXT);

    for mark in &chart.layers {
        match mark {
            Mark::Points { data, color, size } => {
                let radius = (size / std::f64::consts::PI).sqrt();
                for &(x, y) in data {
                    let (cx, cy) = chart.project(x, y);
                    canvas.fill_disc(cx, cy, radius, *color, Some(plot));
                }
            }
            Mark::Line {
                data,
                color,
                stroke_width,
            } => {
                for pair in data.windows(2) {
                    let from = chart.project(pair[0].0, pair[0].1);
                    let to = chart.project(pair[1].0, pair[1].1);
                    canvas.line(from, to, *stroke_width, *color, Some(plot));
                }
            }
        }
    }

    Ok(canvas.image)
}
