//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Limit a value to lie within `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Round a value to the given number of decimal places.
pub fn round_dp<T>(value: T, decimal_places: i32) -> T
where
    T: Float
{
    let scale = match T::from(10.0) {
        Some(ten) => ten.powi(decimal_places),
        None => return value
    };

    (value * scale).round() / scale
}

/// Linear interpolation between `start` and `end`, `frac` of 0 giving `start` and 1 giving `end`.
pub fn lerp<T>(start: T, end: T, frac: T) -> T
where
    T: Float
{
    start + (end - start) * frac
}
