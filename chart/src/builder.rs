//! Assembles the full trend chart from history and the live rate.

use chrono::NaiveDate;
use pesopro_common::HistoryPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::{area_path, smooth_path, Path};
use crate::error::ChartResult;
use crate::geometry::{ChartConfig, PlotPoint, Projection};
use crate::interaction::{index_at, ActiveMarker, ClientRect};
use crate::series::{merge_live_rate, SeriesStats};

/// Everything needed to draw the chart and its stats panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartGeometry {
    pub config: ChartConfig,
    pub series: Vec<HistoryPoint>,
    pub points: Vec<PlotPoint>,
    pub stats: SeriesStats,
    pub line: Path,
    pub area: Path,
    pub grid_lines: Vec<f64>,
}

impl ChartGeometry {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index under the pointer at `client_x`.
    pub fn index_at(&self, client_x: f64, rect: ClientRect) -> usize {
        index_at(client_x, rect, &self.config, self.points.len())
    }

    /// Marker for `hovered`, or the latest sample when nothing is hovered
    /// or the index is out of range.
    pub fn active_marker(&self, hovered: Option<usize>) -> ActiveMarker {
        let last = self.points.len().saturating_sub(1);
        let (index, is_hovered) = match hovered {
            Some(i) if i <= last => (i, true),
            _ => (last, false),
        };

        ActiveMarker {
            index,
            position: self.points.get(index).copied().unwrap_or_default(),
            sample: self
                .series
                .get(index)
                .or_else(|| self.series.last())
                .copied()
                .unwrap_or_else(|| HistoryPoint::new(NaiveDate::default(), 0.0)),
            hovered: is_hovered,
        }
    }
}

/// Builds chart geometry for a fixed viewport.
#[derive(Debug, Clone, Default)]
pub struct CurveBuilder {
    config: ChartConfig,
}

impl CurveBuilder {
    pub fn new(config: ChartConfig) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Build the chart. The plotted series always has at least one point.
    pub fn build(&self, history: &[HistoryPoint], current_rate: f64, today: NaiveDate) -> ChartGeometry {
        let series = merge_live_rate(history, current_rate, today);
        let stats = SeriesStats::from_points(&series).unwrap_or(SeriesStats {
            min: current_rate,
            max: current_rate,
            first: current_rate,
            last: current_rate,
            trend_pct: 0.0,
        });

        let projection = Projection::new(self.config, &stats, series.len());
        let points: Vec<PlotPoint> = series
            .iter()
            .enumerate()
            .map(|(i, p)| projection.point(i, p.rate))
            .collect();

        let line = smooth_path(&points, self.config.smoothing);
        let area = area_path(&line, &self.config);

        debug!(
            points = points.len(),
            min = stats.min,
            max = stats.max,
            trend_pct = stats.trend_pct,
            "Built chart geometry"
        );

        ChartGeometry {
            config: self.config,
            series,
            points,
            stats,
            line,
            area,
            grid_lines: self.config.grid_lines(),
        }
    }
}
