//! Chart series preparation and summary statistics.

use chrono::NaiveDate;
use pesopro_common::HistoryPoint;
use serde::{Deserialize, Serialize};

/// The series to plot: history with the last rate replaced by the live rate,
/// or a single live point when there is no history.
pub fn merge_live_rate(history: &[HistoryPoint], current_rate: f64, today: NaiveDate) -> Vec<HistoryPoint> {
    if history.is_empty() {
        return vec![HistoryPoint::new(today, current_rate)];
    }

    let mut series = history.to_vec();
    if let Some(last) = series.last_mut() {
        last.rate = current_rate;
    }
    series
}

/// Direction of the trend badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Low, high and trend of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub first: f64,
    pub last: f64,
    /// Percentage change from first to last, sign preserved.
    pub trend_pct: f64,
}

impl SeriesStats {
    /// Compute statistics, `None` for an empty series.
    pub fn from_points(points: &[HistoryPoint]) -> Option<Self> {
        let first = points.first()?.rate;
        let last = points.last()?.rate;
        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.rate), hi.max(p.rate))
            });

        let trend_pct = if first != 0.0 {
            (last - first) / first * 100.0
        } else {
            0.0
        };

        Some(Self {
            min,
            max,
            first,
            last,
            trend_pct,
        })
    }

    /// Value span used for normalization; a flat series spans 1.
    pub fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    pub fn direction(&self) -> TrendDirection {
        if self.trend_pct >= 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        }
    }

    /// Badge text: absolute change with two decimals.
    pub fn trend_label(&self) -> String {
        format!("{:.2}%", self.trend_pct.abs())
    }

    pub fn low_label(&self) -> String {
        format!("{:.2}", self.min)
    }

    pub fn high_label(&self) -> String {
        format!("{:.2}", self.max)
    }
}
