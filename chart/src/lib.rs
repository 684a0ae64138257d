//! PesoPro Chart
//!
//! Geometry for the 15-day trend chart: series preparation, projection into
//! a padded viewport, a smooth cubic path with its filled area, and pointer
//! mapping for hover.

pub mod builder;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod series;

pub use builder::{ChartGeometry, CurveBuilder};
pub use curve::{area_path, control_point, smooth_path, Path, PathCommand};
pub use error::{ChartError, ChartResult};
pub use geometry::{ChartConfig, PlotPoint, Projection};
pub use interaction::{index_at, ActiveMarker, ClientRect, Tooltip};
pub use series::{merge_live_rate, SeriesStats, TrendDirection};
