//! SVG output for [`Chart`]

use super::{format_tick, ticks, Chart, Color, Mark};

const FONT_FAMILY: &str = "sans-serif";

pub(super) fn render(chart: &Chart) -> String {
    let (width, height) = chart.canvas_size();
    let (left, top, right, bottom) = chart.plot_rect();
    let plot_w = right - left;
    let plot_h = bottom - top;

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">"#
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{width}" height="{height}" fill="{}"/>"#,
        Color::WHITE.to_hex()
    ));
    svg.push_str(&format!(
        r#"<defs><clipPath id="plot-area"><rect x="{left}" y="{top}" width="{plot_w}" height="{plot_h}"/></clipPath></defs>"#
    ));

    // Grid and tick labels
    for value in ticks(chart.x_domain) {
        let (x, _) = chart.project(value, chart.y_domain.0);
        svg.push_str(&format!(
            r#"<line x1="{x:.2}" y1="{top}" x2="{x:.2}" y2="{bottom}" stroke="{}" stroke-width="1"/>"#,
            Color::GRID.to_hex()
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{:.2}" font-size="10" text-anchor="middle" fill="{}" font-family="{FONT_FAMILY}">{}</text>"#,
            bottom + 15.0,
            Color::TEXT.to_hex(),
            format_tick(value)
        ));
    }
    for value in ticks(chart.y_domain) {
        let (_, y) = chart.project(chart.x_domain.0, value);
        svg.push_str(&format!(
            r#"<line x1="{left}" y1="{y:.2}" x2="{right}" y2="{y:.2}" stroke="{}" stroke-width="1"/>"#,
            Color::GRID.to_hex()
        ));
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-size="10" text-anchor="end" fill="{}" font-family="{FONT_FAMILY}">{}</text>"#,
            left - 6.0,
            y + 3.0,
            Color::TEXT.to_hex(),
            format_tick(value)
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{left}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="{}" stroke-width="1"/>"#,
        Color::AXIS.to_hex()
    ));
    svg.push_str(&format!(
        r#"<line x1="{left}" y1="{top}" x2="{left}" y2="{bottom}" stroke="{}" stroke-width="1"/>"#,
        Color::AXIS.to_hex()
    ));

    svg.push_str(&format!(
        r#"<text x="{:.2}" y="{:.2}" font-size="11" font-weight="bold" text-anchor="middle" fill="{}" font-family="{FONT_FAMILY}">{}</text>"#,
        left + plot_w / 2.0,
        bottom + 35.0,
        Color::TEXT.to_hex(),
        escape(&chart.x_title)
    ));
    let title_x = 15.0;
    let title_y = top + plot_h / 2.0;
    svg.push_str(&format!(
        r#"<text x="{title_x}" y="{title_y:.2}" transform="rotate(-90 {title_x} {title_y:.2})" font-size="11" font-weight="bold" text-anchor="middle" fill="{}" font-family="{FONT_FAMILY}">{}</text>"#,
        Color::TEXT.to_hex(),
        escape(&chart.y_title)
    ));

    svg.push_str(r#"<g clip-path="url(#plot-area)">"#);
    for mark in &chart.layers {
        match mark {
            Mark::Points { data, color, size } => {
                let r = (size / std::f64::consts::PI).sqrt();
                for &(x, y) in data {
                    let (cx, cy) = chart.project(x, y);
                    svg.push_str(&format!(
                        r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"/>"#,
                        color.to_hex()
                    ));
                }
            }
            Mark::Line {
                data,
                color,
                stroke_width,
            } => {
                if data.len() < 2 {
                    continue;
                }
                let path: Vec<String> = data
                    .iter()
                    .enumerate()
                    .map(|(i, &(x, y))| {
                        let (px, py) = chart.project(x, y);
                        format!("{}{px:.2},{py:.2}", if i == 0 { "M" } else { "L" })
                    })
                    .collect();
                svg.push_str(&format!(
                    r#"<path d="{}" fill="none" stroke="{}" stroke-width="{stroke_width}"/>"#,
                    path.join(" "),
                    color.to_hex()
                ));
            }
        }
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
