//! Validation helper functions for configuration types.

use crate::core::errors::{Result, SchaapiError};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(SchaapiError::config_field(
            format!("{} must be greater than 0", field),
            field,
        ));
    }
    Ok(())
}

/// Validate that a usize value is at least `min`.
pub fn validate_min_usize(value: usize, min: usize, field: &str) -> Result<()> {
    if value < min {
        return Err(SchaapiError::config_field(
            format!("{} must be at least {}, got {}", field, min, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that a usize value is within a bounded range (inclusive).
pub fn validate_bounded_usize(value: usize, min: usize, max: usize, field: &str) -> Result<()> {
    if value < min || value > max {
        return Err(SchaapiError::config_field(
            format!("{} must be between {} and {}, got {}", field, min, max, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that a list of package prefixes contains no blank entries.
pub fn validate_package_prefixes(packages: &[String], field: &str) -> Result<()> {
    if let Some(blank) = packages.iter().position(|p| p.trim().is_empty()) {
        return Err(SchaapiError::config_field(
            format!("{}[{}] must not be blank", field, blank),
            field,
        ));
    }
    Ok(())
}
