//! Viewport configuration and projection of samples into plot space.

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};
use crate::series::SeriesStats;

/// Ratios of the plot band where horizontal guides are drawn.
pub const GRID_RATIOS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// A pixel-space coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

impl PlotPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PlotPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Chart viewport and curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    /// Space kept clear on every edge.
    pub padding: f64,
    /// Control point distance as a fraction of the neighbor span.
    pub smoothing: f64,
    /// Inner vertical margin as a fraction of the plot band height.
    pub vertical_margin: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 180.0,
            padding: 15.0,
            smoothing: 0.2,
            vertical_margin: 0.15,
        }
    }
}

impl ChartConfig {
    /// Create a config for a viewport, keeping the default curve parameters.
    pub fn with_viewport(width: f64, height: f64, padding: f64) -> ChartResult<Self> {
        let config = Self {
            width,
            height,
            padding,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChartResult<()> {
        let finite = self.width.is_finite() && self.height.is_finite() && self.padding.is_finite();
        if !finite
            || self.padding < 0.0
            || self.width <= self.padding * 2.0
            || self.height <= self.padding * 2.0
        {
            return Err(ChartError::InvalidViewport {
                width: self.width,
                height: self.height,
                padding: self.padding,
            });
        }

        for (name, value) in [("smoothing", self.smoothing), ("vertical_margin", self.vertical_margin)] {
            if !(0.0..0.5).contains(&value) {
                return Err(ChartError::InvalidRatio { name, value });
            }
        }

        Ok(())
    }

    /// Height of the band between top and bottom padding.
    pub fn band_height(&self) -> f64 {
        self.height - self.padding * 2.0
    }

    /// Width of the band between left and right padding.
    pub fn band_width(&self) -> f64 {
        self.width - self.padding * 2.0
    }

    /// Vertical limits `(top, bottom)` data points can occupy.
    pub fn value_band(&self) -> (f64, f64) {
        let margin = self.band_height() * self.vertical_margin;
        (self.padding + margin, self.height - self.padding - margin)
    }

    /// y positions of the horizontal guides.
    pub fn grid_lines(&self) -> Vec<f64> {
        GRID_RATIOS
            .iter()
            .map(|ratio| self.padding + ratio * self.band_height())
            .collect()
    }
}

/// Maps sample indices and values into plot coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    config: ChartConfig,
    count: usize,
    min: f64,
    range: f64,
}

impl Projection {
    pub fn new(config: ChartConfig, stats: &SeriesStats, count: usize) -> Self {
        Self {
            config,
            count,
            min: stats.min,
            range: stats.range(),
        }
    }

    /// x for sample `index`; a lone sample sits at the horizontal center.
    pub fn x(&self, index: usize) -> f64 {
        if self.count <= 1 {
            return self.config.width / 2.0;
        }
        let t = index as f64 / (self.count - 1) as f64;
        self.config.padding + t * self.config.band_width()
    }

    /// y for `value`; higher values are nearer the top.
    pub fn y(&self, value: f64) -> f64 {
        let (top, bottom) = self.config.value_band();
        bottom - ((value - self.min) / self.range) * (bottom - top)
    }

    pub fn point(&self, index: usize, value: f64) -> PlotPoint {
        PlotPoint::new(self.x(index), self.y(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(min: f64, max: f64) -> SeriesStats {
        SeriesStats {
            min,
            max,
            first: min,
            last: max,
            trend_pct: 0.0,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ChartConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.value_band(), (37.5, 142.5));
    }

    #[test]
    fn test_invalid_viewport() {
        assert!(ChartConfig::with_viewport(20.0, 180.0, 15.0).is_err());
        assert!(ChartConfig::with_viewport(300.0, 180.0, -1.0).is_err());

        let config = ChartConfig {
            smoothing: 0.7,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChartError::InvalidRatio { name: "smoothing", .. })
        ));
    }

    #[test]
    fn test_x_spans_padded_width() {
        let projection = Projection::new(ChartConfig::default(), &stats(10.0, 20.0), 3);
        assert_eq!(projection.x(0), 15.0);
        assert_eq!(projection.x(1), 150.0);
        assert_eq!(projection.x(2), 285.0);
    }

    #[test]
    fn test_y_is_inverted_within_band() {
        let projection = Projection::new(ChartConfig::default(), &stats(10.0, 20.0), 3);
        assert_eq!(projection.y(10.0), 142.5);
        assert_eq!(projection.y(20.0), 37.5);
        assert_eq!(projection.y(15.0), 90.0);
    }

    #[test]
    fn test_single_sample_centered() {
        let projection = Projection::new(ChartConfig::default(), &stats(17.0, 17.0), 1);
        let point = projection.point(0, 17.0);
        assert_eq!(point.x, 150.0);
        assert_eq!(point.y, 142.5);
    }

    #[test]
    fn test_grid_lines() {
        let lines = ChartConfig::default().grid_lines();
        assert_eq!(lines.len(), 4);
        assert!((lines[0] - 45.0).abs() < 1e-9);
        assert!((lines[3] - 135.0).abs() < 1e-9);
    }
}
