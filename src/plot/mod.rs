//! Diagnostic charts
//!
//! A [`Chart`] is a square-scaled plot area with layered point and line
//! marks. [`save_chart`] writes it as SVG or PNG depending on the file
//! extension.

pub mod font;
pub mod loess;
mod raster;
mod svg;

pub use loess::loess;

use crate::config::PlotConfig;
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use std::path::Path;
use tracing::info;

pub const MARGIN_LEFT: u32 = 60;
pub const MARGIN_RIGHT: u32 = 20;
pub const MARGIN_TOP: u32 = 20;
pub const MARGIN_BOTTOM: u32 = 50;

/// Opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const AXIS: Color = Color { r: 136, g: 136, b: 136 };
    pub const GRID: Color = Color { r: 221, g: 221, b: 221 };
    pub const TEXT: Color = Color { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PredictorError::ConfigError(format!("invalid colour '{}'", hex)));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| PredictorError::ConfigError(format!("invalid colour '{}': {}", hex, e)))
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One layer of a chart
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// Filled circles; `size` is the area in square pixels
    Points {
        data: Vec<(f64, f64)>,
        color: Color,
        size: f64,
    },
    /// Polyline through `data` in order
    Line {
        data: Vec<(f64, f64)>,
        color: Color,
        stroke_width: f64,
    },
}

/// Layered chart over fixed x and y domains
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Plot area width in pixels
    pub width: u32,
    /// Plot area height in pixels
    pub height: u32,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
    pub x_title: String,
    pub y_title: String,
    pub layers: Vec<Mark>,
}

impl Chart {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x_domain: (0.0, 1.0),
            y_domain: (0.0, 1.0),
            x_title: String::new(),
            y_title: String::new(),
            layers: Vec::new(),
        }
    }

    pub fn with_domain(mut self, x: (f64, f64), y: (f64, f64)) -> Self {
        self.x_domain = x;
        self.y_domain = y;
        self
    }

    pub fn with_titles(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_title = x.into();
        self.y_title = y.into();
        self
    }

    /// Add a layer on top of the existing ones
    pub fn layer(mut self, mark: Mark) -> Self {
        self.layers.push(mark);
        self
    }

    /// Full canvas size including axes and titles
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.width + MARGIN_LEFT + MARGIN_RIGHT,
            self.height + MARGIN_TOP + MARGIN_BOTTOM,
        )
    }

    /// Data coordinates to canvas pixels (y grows downward)
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let (x0, x1) = self.x_domain;
        let (y0, y1) = self.y_domain;
        let px = MARGIN_LEFT as f64 + (x - x0) / (x1 - x0) * self.width as f64;
        let py = MARGIN_TOP as f64 + (1.0 - (y - y0) / (y1 - y0)) * self.height as f64;
        (px, py)
    }

    /// Plot area as `(left, top, right, bottom)` canvas pixels
    pub fn plot_rect(&self) -> (f64, f64, f64, f64) {
        (
            MARGIN_LEFT as f64,
            MARGIN_TOP as f64,
            (MARGIN_LEFT + self.width) as f64,
            (MARGIN_TOP + self.height) as f64,
        )
    }
}

/// Round tick positions covering `domain`, about ten of them
pub fn ticks(domain: (f64, f64)) -> Vec<f64> {
    let (lo, hi) = domain;
    let span = hi - lo;
    if !(span > 0.0) || !span.is_finite() {
        return Vec::new();
    }

    let raw = span / 10.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step + 1e-9).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Tick label without trailing noise
pub fn format_tick(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        let s = format!("{:.6}", rounded);
        s.trim_end_matches('0').to_string()
    }
}

/// Actual-vs-predicted scatter with a 1:1 reference line and a loess trend.
///
/// Points outside the domain are dropped; the loess curve uses every point.
pub fn results_chart(actual: &Array1<f64>, predicted: &Array1<f64>, config: &PlotConfig) -> Result<Chart> {
    if actual.len() != predicted.len() {
        return Err(PredictorError::ShapeError {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }

    let (lo, hi) = config.domain;
    let all: Vec<(f64, f64)> = actual.iter().copied().zip(predicted.iter().copied()).collect();
    let visible: Vec<(f64, f64)> = all
        .iter()
        .copied()
        .filter(|(x, y)| (lo..=hi).contains(x) && (lo..=hi).contains(y))
        .collect();

    Ok(Chart::new(config.width, config.height)
        .with_domain(config.domain, config.domain)
        .with_titles("Actual Scores", "Predicted Scores")
        .layer(Mark::Points {
            data: visible,
            color: Color::from_hex(&config.point_color)?,
            size: 3.0,
        })
        .layer(Mark::Line {
            data: vec![(lo, lo), (hi, hi)],
            color: Color::from_hex(&config.reference_color)?,
            stroke_width: 2.0,
        })
        .layer(Mark::Line {
            data: loess(&all, config.loess_bandwidth),
            color: Color::from_hex(&config.loess_color)?,
            stroke_width: 2.0,
        }))
}

/// Write `chart` to `path`; the extension picks SVG or PNG.
///
/// `scale_factor` multiplies the PNG resolution and is ignored for SVG.
pub fn save_chart(chart: &Chart, path: &Path, scale_factor: f64) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();

    match extension.as_str() {
        "svg" => std::fs::write(path, svg::render(chart))?,
        "png" => raster::render(chart, scale_factor)?.save_with_format(path, image::ImageFormat::Png)?,
        _ => return Err(PredictorError::UnsupportedFormat(extension)),
    }

    info!(path = %path.display(), format = %extension, "Saved chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_chart() -> Chart {
        let actual = Array1::from_vec(vec![5.0, 6.0, 7.0, 11.0]);
        let predicted = Array1::from_vec(vec![5.5, 6.2, 6.8, 9.0]);
        let config = PlotConfig {
            width: 120,
            height: 120,
            ..PlotConfig::default()
        };
        results_chart(&actual, &predicted, &config).unwrap()
    }

    #[test]
    fn test_color_hex() {
        let c = Color::from_hex("#f75402").unwrap();
        assert_eq!((c.r, c.g, c.b), (0xf7, 0x54, 0x02));
        assert_eq!(c.to_hex(), "#f75402");
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_results_chart_layers() {
        let chart = sample_chart();
        assert_eq!(chart.layers.len(), 3);
        match &chart.layers[0] {
            // (11, 9) lies outside the domain
            Mark::Points { data, .. } => assert_eq!(data.len(), 3),
            other => panic!("unexpected layer {:?}", other),
        }
        match &chart.layers[2] {
            Mark::Line { data, .. } => assert_eq!(data.len(), 4),
            other => panic!("unexpected layer {:?}", other),
        }
    }

    #[test]
    fn test_project_corners() {
        let chart = Chart::new(100, 100).with_domain((2.0, 10.0), (2.0, 10.0));
        assert_eq!(chart.project(2.0, 2.0), (MARGIN_LEFT as f64, (MARGIN_TOP + 100) as f64));
        assert_eq!(chart.project(10.0, 10.0), ((MARGIN_LEFT + 100) as f64, MARGIN_TOP as f64));
    }

    #[test]
    fn test_ticks() {
        assert_eq!(ticks((2.0, 10.0)), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(ticks((0.0, 1.0)).len(), 11);
        assert!(ticks((1.0, 1.0)).is_empty());
        assert_eq!(format_tick(0.30000000000000004), "0.3");
        assert_eq!(format_tick(4.0), "4");
    }

    #[test]
    fn test_save_chart_formats() {
        let dir = tempdir().unwrap();
        let chart = sample_chart();

        let png = dir.path().join("plot.png");
        save_chart(&chart, &png, 1.0).unwrap();
        let bytes = std::fs::read(&png).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let svg = dir.path().join("plot.svg");
        save_chart(&chart, &svg, 1.0).unwrap();
        assert!(std::fs::read_to_string(&svg).unwrap().starts_with("<svg"));
    }

    #[test]
    fn test_save_chart_rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let err = save_chart(&sample_chart(), &dir.path().join("plot.jpg"), 1.0).unwrap_err();
        assert!(matches!(err, PredictorError::UnsupportedFormat(ref e) if e == "jpg"));
        assert!(err.to_string().starts_with("Only svg and png formats are supported"));
    }
}
