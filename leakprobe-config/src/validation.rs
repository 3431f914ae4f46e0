//! Clamping and validation helpers shared by the probe settings.
//!
//! Operator input is never rejected for being out of range: integers and the
//! interval are pulled back into their bounds. The `validator` checks on
//! [`crate::ProbeConfig`] then assert the clamped result.

use std::ops::RangeInclusive;

use validator::ValidationError;

/// Clamp a signed integer setting into an unsigned range.
pub fn clamp_int(value: i64, bounds: RangeInclusive<u64>) -> u64 {
    if value < 0 {
        return *bounds.start();
    }
    (value as u64).clamp(*bounds.start(), *bounds.end())
}

/// Clamp a floating point setting. NaN lands on the upper bound, infinities on
/// the nearest bound.
pub fn clamp_float(value: f64, bounds: RangeInclusive<f64>) -> f64 {
    if value.is_nan() {
        return *bounds.end();
    }
    value.clamp(*bounds.start(), *bounds.end())
}

/// Validate that a float is usable as a sleep duration.
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_finite_positive"))
    }
}
