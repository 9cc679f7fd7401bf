//! Numeric conversion and rounding helpers shared by queries and comparators.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(f64::MAX)
}

/// Convert an integer answer to f64 for numeric comparison.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(f64::NAN)
}

/// Convert a count to i64, clamping at `i64::MAX`.
#[must_use]
pub fn usize_to_i64(value: usize) -> i64 {
    cast::<usize, i64>(value).unwrap_or(i64::MAX)
}

/// Round to `decimals` places with ties going away from zero.
///
/// Non-finite values are returned unchanged.
#[must_use]
pub fn round_half_away(value: f64, decimals: u8) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10_f64.powi(i32::from(decimals));
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    // f64::round already rounds half away from zero.
    scaled.round() / scale
}

/// Render `value` rounded with [`round_half_away`] at a fixed precision.
#[must_use]
pub fn format_fixed(value: f64, decimals: u8) -> String {
    let rounded = round_half_away(value, decimals);
    // Avoid rendering "-0.00" for values that round to zero.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.prec$}", prec = usize::from(decimals))
}
