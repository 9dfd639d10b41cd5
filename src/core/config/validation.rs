//! Validation helper functions for configuration types.

use crate::core::errors::{Result, TwinscanError};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(TwinscanError::validation_field(
            format!("{field} must be greater than 0"),
            field,
            "> 0",
            value.to_string(),
        ));
    }
    Ok(())
}

/// Validate that an f64 value is strictly greater than zero.
pub fn validate_positive_f64(value: f64, field: &str) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(TwinscanError::validation_field(
            format!("{field} must be greater than 0.0"),
            field,
            "> 0.0",
            value.to_string(),
        ));
    }
    Ok(())
}

/// Validate that an f64 value is non-negative.
pub fn validate_non_negative(value: f64, field: &str) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(TwinscanError::validation_field(
            format!("{field} must be non-negative"),
            field,
            ">= 0.0",
            value.to_string(),
        ));
    }
    Ok(())
}

/// Validate that an f64 value is in the unit range [0.0, 1.0].
pub fn validate_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TwinscanError::validation_field(
            format!("{field} must be between 0.0 and 1.0"),
            field,
            "[0.0, 1.0]",
            value.to_string(),
        ));
    }
    Ok(())
}
