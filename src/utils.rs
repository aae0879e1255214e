//! Utility functions for the mlx90640-stream crate.

/// Convert Celsius to Fahrenheit.
///
/// Frame values are reported in Celsius; display front ends that want
/// Fahrenheit can convert per pixel.
///
/// # Example
///
/// ```
/// use mlx90640_stream::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
