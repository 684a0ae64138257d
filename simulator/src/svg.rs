//! Standalone SVG rendering of the trend chart.

use std::fmt::Write;

use pesopro_chart::{ActiveMarker, ChartGeometry};

/// Render `chart` with `marker` highlighted.
pub fn render(chart: &ChartGeometry, marker: &ActiveMarker) -> String {
    let config = &chart.config;
    let tooltip = marker.tooltip();
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        config.width, config.height, config.width, config.height
    );
    let _ = writeln!(
        out,
        r##"  <defs><linearGradient id="area" x1="0" y1="0" x2="0" y2="1"><stop offset="0%" stop-color="#10b981" stop-opacity="0.3"/><stop offset="100%" stop-color="#10b981" stop-opacity="0"/></linearGradient></defs>"##
    );
    for y in &chart.grid_lines {
        let _ = writeln!(
            out,
            r##"  <line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="#e5e7eb" stroke-dasharray="4 4"/>"##,
            config.padding,
            config.width - config.padding,
        );
    }
    let _ = writeln!(out, r#"  <path d="{}" fill="url(#area)"/>"#, chart.area);
    let _ = writeln!(
        out,
        r##"  <path d="{}" fill="none" stroke="#10b981" stroke-width="2.5" stroke-linecap="round"/>"##,
        chart.line
    );
    let _ = writeln!(
        out,
        r##"  <line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="#9ca3af" stroke-dasharray="2 2"/>"##,
        config.padding,
        config.height - config.padding,
        x = marker.position.x,
    );
    let _ = writeln!(
        out,
        r##"  <circle cx="{}" cy="{}" r="4" fill="#10b981" stroke="#ffffff" stroke-width="2"/>"##,
        marker.position.x, marker.position.y
    );
    let _ = writeln!(
        out,
        r#"  <text x="{}" y="12" font-size="10">{} {} | L {} H {} | {:?} {}</text>"#,
        config.padding,
        tooltip.label,
        tooltip.rate,
        chart.stats.low_label(),
        chart.stats.high_label(),
        chart.stats.direction(),
        chart.stats.trend_label(),
    );
    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pesopro_chart::CurveBuilder;

    #[test]
    fn test_render_contains_paths() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let chart = CurveBuilder::default().build(&[], 17.0, today);
        let marker = chart.active_marker(None);

        let svg = render(&chart, &marker);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"d="M 150,142.5""#));
        assert!(svg.contains("Live Rate 17.0000"));
        // Four grid lines plus the marker guide.
        assert_eq!(svg.matches("<line ").count(), 5);
    }
}
