//! Domain validation errors for PesoPro.

use thiserror::Error;

/// Errors raised when constructing domain values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Rate is zero, negative or not a finite number.
    #[error("Invalid rate: {0}")]
    InvalidRate(f64),

    /// Currency outside the supported pair.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Date string that is not a calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl DomainError {
    /// Get error code for logs and diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::InvalidRate(_) => "INVALID_RATE",
            DomainError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            DomainError::InvalidDate(_) => "INVALID_DATE",
        }
    }
}

/// Result type alias for domain construction.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-03-05").is_ok());
        assert_eq!(
            parse_date("05/03/2024"),
            Err(DomainError::InvalidDate("05/03/2024".to_string()))
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::InvalidRate(0.0).error_code(), "INVALID_RATE");
        assert_eq!(
            DomainError::UnsupportedCurrency("EUR".into()).to_string(),
            "Unsupported currency: EUR"
        );
    }
}
