//! Fixed-precision integer quantization.
//!
//! Coordinates travel as integers scaled by `10^precision`. Decoding divides
//! them back down; encoding is provided for producers and tests.

/// Scale factor for a given decimal precision.
#[must_use]
pub fn scale_factor(precision: u32) -> f64 {
    10f64.powf(f64::from(precision))
}

/// Divide every value by `10^precision`, in place.
///
/// A precision of zero leaves the values untouched.
pub fn dequantize(values: &mut [f64], precision: u32) {
    if precision == 0 {
        return;
    }

    let factor = scale_factor(precision);
    for value in values.iter_mut() {
        *value /= factor;
    }
}

/// Inverse of [`dequantize`]: `v -> round(v * 10^precision)`.
#[must_use]
pub fn quantize(values: &[f64], precision: u32) -> Vec<f64> {
    let factor = scale_factor(precision);
    values.iter().map(|v| (v * factor).round()).collect()
}
