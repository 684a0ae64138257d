//! FX error types.

use pesopro_common::DomainError;
use thiserror::Error;

/// Errors that can occur while acquiring, caching or converting rates.
#[derive(Debug, Error)]
pub enum FxError {
    /// No cached rate and the provider could not supply one.
    #[error("Rate not available: {0}")]
    RateUnavailable(String),

    /// The history provider could not supply a series.
    #[error("History not available: {0}")]
    HistoryUnavailable(String),

    /// Keypad or text input that cannot be applied.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider returned an error.
    #[error("Rate provider error: {0}")]
    ProviderError(String),

    /// Key-value store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Domain value rejected on construction.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration value rejected.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FxError {
    /// Whether the error is absorbed locally (served from cache, fallback or
    /// zero) rather than surfaced to the user.
    pub fn is_absorbed(&self) -> bool {
        matches!(
            self,
            FxError::RateUnavailable(_)
                | FxError::HistoryUnavailable(_)
                | FxError::InvalidInput(_)
                | FxError::ProviderError(_)
        )
    }

    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::RateUnavailable(_) => "RATE_UNAVAILABLE",
            FxError::HistoryUnavailable(_) => "HISTORY_UNAVAILABLE",
            FxError::InvalidInput(_) => "INVALID_INPUT",
            FxError::ProviderError(_) => "PROVIDER_ERROR",
            FxError::Storage(_) => "STORAGE_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
            FxError::Domain(e) => e.error_code(),
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
