//! Numeric summary helpers shared by the quality model, feature engineering
//! and drift detection.
//!
//! Every helper is total: empty or degenerate input yields `0.0` rather than
//! `NaN`, so downstream vectors stay finite.

/// Denominators smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-12;

/// Arithmetic mean (0 for an empty slice).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (`ddof = 0`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (`ddof = 1`); 0 when fewer than two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_sample(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Minimum (0 for an empty slice).
#[must_use]
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

/// Maximum (0 for an empty slice).
#[must_use]
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Median with midpoint interpolation for even lengths.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Least-squares slope of `y` against `x`.
///
/// Returns 0 with fewer than two points or when `x` has no spread.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx).powi(2);
    }
    safe_div(sxy, sxx)
}

/// First differences `v[i+1] - v[i]`.
#[must_use]
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Division returning 0 when the denominator is (near) zero.
#[must_use]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// Replace `NaN` and infinities with 0.
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
