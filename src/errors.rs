//! Error types and validation functions for market model analysis.
//!
//! This module provides the error taxonomy shared by every component of the
//! crate: data validation, numerical stability failures, and regime-detection
//! specific errors are all distinguishable variants so callers can react to
//! them without string matching.

use thiserror::Error;

/// Error types for generative market model operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum MarketAnalysisError {
    /// Insufficient data for the requested calibration or analysis.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value for a model or request configuration.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Numerical computation error due to instability or convergence failure.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
    },

    /// Regime detection could not produce a usable model.
    #[error("Regime detection failed: {reason}")]
    RegimeDetectionError {
        /// Reason the HMM fit failed
        reason: String,
    },

    /// Malformed price series (ordering, duplicates, non-positive prices).
    #[error("Invalid price series: {reason}")]
    SeriesError {
        /// What is wrong with the series
        reason: String,
    },
}

/// Result type for market model operations.
///
/// Convenience alias for operations that may fail with [`MarketAnalysisError`].
pub type MarketResult<T> = Result<T, MarketAnalysisError>;

/// Validates that data has sufficient length for an operation.
///
/// # Arguments
/// * `data` - Input time series data
/// * `min_required` - Minimum number of data points required
/// * `operation` - Name of the operation requiring the data
///
/// # Example
/// ```rust
/// use exante_finance::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2, "test").is_ok());
/// assert!(validate_data_length(&data, 5, "test").is_err());
/// ```
pub fn validate_data_length(
    data: &[f64],
    min_required: usize,
    _operation: &str,
) -> MarketResult<()> {
    if data.len() < min_required {
        Err(MarketAnalysisError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within inclusive bounds.
///
/// NaN values and inverted bounds are rejected before the range check so an
/// undefined comparison can never slip through as "valid".
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> MarketResult<()> {
    if value.is_nan() {
        return Err(MarketAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(MarketAnalysisError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
        });
    }

    if value < min || value > max {
        Err(MarketAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns immediately on the first non-finite value, naming its index.
///
/// # Example
/// ```rust
/// use exante_finance::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "returns").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "returns").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> MarketResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, &v)| !v.is_finite()) {
        return Err(MarketAnalysisError::NumericalError {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value
            ),
        });
    }
    Ok(())
}
