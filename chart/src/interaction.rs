//! Pointer mapping and hover presentation.

use pesopro_common::time::short_date_label;
use pesopro_common::HistoryPoint;
use serde::{Deserialize, Serialize};

use crate::geometry::{ChartConfig, PlotPoint};

/// Label shown when no sample is hovered.
pub const LIVE_LABEL: &str = "Live Rate";

/// On-screen horizontal extent of the rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientRect {
    pub left: f64,
    pub width: f64,
}

impl ClientRect {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }
}

/// Nearest sample index for a pointer at `client_x`.
///
/// Padding is scaled from the viewport to the rendered width so the mapping
/// matches the plotted x positions at any size. Fewer than two samples, or a
/// collapsed rect, map to index 0.
pub fn index_at(client_x: f64, rect: ClientRect, config: &ChartConfig, count: usize) -> usize {
    if count <= 1 || !client_x.is_finite() || rect.width <= 0.0 {
        return 0;
    }

    let padding = config.padding * rect.width / config.width;
    let effective = rect.width - padding * 2.0;
    if effective <= 0.0 {
        return 0;
    }

    let relative = (client_x - rect.left - padding).clamp(0.0, effective);
    let last = count - 1;
    let index = (relative / effective * last as f64).round() as usize;
    index.min(last)
}

/// Highlighted sample: the hovered one, or the latest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveMarker {
    pub index: usize,
    pub position: PlotPoint,
    pub sample: HistoryPoint,
    pub hovered: bool,
}

impl ActiveMarker {
    pub fn tooltip(&self) -> Tooltip {
        Tooltip::for_sample(&self.sample, self.hovered)
    }
}

/// Tooltip text for the active marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub label: String,
    pub rate: String,
}

impl Tooltip {
    pub fn for_sample(sample: &HistoryPoint, hovered: bool) -> Self {
        let label = if hovered {
            short_date_label(sample.date)
        } else {
            LIVE_LABEL.to_string()
        };
        Self {
            label,
            rate: format!("{:.4}", sample.rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_index_edges_and_middle() {
        let config = ChartConfig::default();
        let rect = ClientRect::new(0.0, 300.0);

        assert_eq!(index_at(0.0, rect, &config, 5), 0);
        assert_eq!(index_at(15.0, rect, &config, 5), 0);
        assert_eq!(index_at(150.0, rect, &config, 5), 2);
        assert_eq!(index_at(285.0, rect, &config, 5), 4);
        assert_eq!(index_at(1000.0, rect, &config, 5), 4);
    }

    #[test]
    fn test_index_scales_with_rendered_width() {
        let config = ChartConfig::default();
        // Rendered at double size with an offset.
        let rect = ClientRect::new(100.0, 600.0);

        assert_eq!(index_at(100.0 + 30.0, rect, &config, 3), 0);
        assert_eq!(index_at(100.0 + 300.0, rect, &config, 3), 1);
        assert_eq!(index_at(100.0 + 570.0, rect, &config, 3), 2);
    }

    #[test]
    fn test_index_degenerate_inputs() {
        let config = ChartConfig::default();
        let rect = ClientRect::new(0.0, 300.0);

        assert_eq!(index_at(200.0, rect, &config, 0), 0);
        assert_eq!(index_at(200.0, rect, &config, 1), 0);
        assert_eq!(index_at(f64::NAN, rect, &config, 5), 0);
        assert_eq!(index_at(200.0, ClientRect::new(0.0, 0.0), &config, 5), 0);
    }

    #[test]
    fn test_tooltip_labels() {
        let sample = HistoryPoint::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), 17.123456);

        let live = Tooltip::for_sample(&sample, false);
        assert_eq!(live.label, "Live Rate");
        assert_eq!(live.rate, "17.1235");

        let hovered = Tooltip::for_sample(&sample, true);
        assert_eq!(hovered.label, "Mar 5");
    }
}
