//! Chart error types.

use thiserror::Error;

/// Errors raised by chart construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChartError {
    /// Viewport leaves no room inside the padding.
    #[error("Invalid viewport {width}x{height} with padding {padding}")]
    InvalidViewport { width: f64, height: f64, padding: f64 },

    /// Smoothing or margin ratio outside `[0, 0.5)`.
    #[error("Invalid ratio {name}: {value}")]
    InvalidRatio { name: &'static str, value: f64 },
}

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;
