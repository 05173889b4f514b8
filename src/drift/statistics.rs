//! Two-sample distribution comparisons: Kolmogorov-Smirnov and PSI.

use std::f64::consts::PI;

/// Smoothing added to every bin count.
const PSI_COUNT_SMOOTHING: f64 = 0.001;
/// Smoothing added to every sample-size denominator.
const PSI_TOTAL_SMOOTHING: f64 = 0.01;
/// Largest `n1 * n2` evaluated with the exact null distribution.
const KS_EXACT_MAX_CELLS: usize = 1_000_000;

/// Result of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Maximum distance between the empirical CDFs
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Two-sided two-sample Kolmogorov-Smirnov test.
///
/// Up to `n1 * n2 = 10^6` the p-value is exact: the probability that a
/// uniformly random merge order of the two samples reaches a CDF gap of at
/// least `D`. Larger samples use the asymptotic Kolmogorov distribution
/// with Stephens' correction. Ties are treated as if the data were
/// continuous. Either sample empty yields `D = 0, p = 1`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ks_2samp(a: &[f64], b: &[f64]) -> KsResult {
    if a.is_empty() || b.is_empty() {
        return KsResult {
            statistic: 0.0,
            p_value: 1.0,
        };
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    let (n1, n2) = (a.len() as f64, b.len() as f64);

    // Walk the merged order, consuming all ties before comparing CDFs.
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    let p_value = if a.len().saturating_mul(b.len()) <= KS_EXACT_MAX_CELLS {
        ks_exact_p_value(a.len(), b.len(), d)
    } else {
        let en = (n1 * n2 / (n1 + n2)).sqrt();
        ks_p_value((en + 0.12 + 0.11 / en) * d)
    };
    KsResult {
        statistic: d,
        p_value,
    }
}

/// `P(D >= d)` under the null for sample sizes `n` and `m`.
///
/// Walks the `(n + 1) × (m + 1)` lattice of merge prefixes carrying the
/// probability of reaching each point without touching the rejection
/// region `|i/n - j/m| >= d`; mass that touches it is accumulated.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ks_exact_p_value(n: usize, m: usize, d: f64) -> f64 {
    // D * n * m is an integer gap |i * m - j * n|.
    let threshold = (d * (n * m) as f64).round() as usize;
    if threshold == 0 {
        return 1.0;
    }
    let mut prev = vec![0.0; m + 1];
    let mut row = vec![0.0; m + 1];
    let mut escaped = 0.0_f64;
    for i in 0..=n {
        for j in 0..=m {
            let mut mass = if i == 0 && j == 0 {
                1.0
            } else {
                let remaining = (n + m - i - j + 1) as f64;
                let mut mass = 0.0;
                if i > 0 {
                    mass += prev[j] * (n - i + 1) as f64 / remaining;
                }
                if j > 0 {
                    mass += row[j - 1] * (m - j + 1) as f64 / remaining;
                }
                mass
            };
            if (i * m).abs_diff(j * n) >= threshold {
                escaped += mass;
                mass = 0.0;
            }
            row[j] = mass;
        }
        std::mem::swap(&mut prev, &mut row);
    }
    escaped.clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution, `P(K > lambda)`.
#[must_use]
pub fn ks_p_value(lambda: f64) -> f64 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Theta-function form converges fast for small lambda.
        let mut cdf = 0.0;
        for k in 1..=20 {
            let odd = f64::from(2 * k - 1);
            cdf += (-(odd * odd) * PI * PI / (8.0 * lambda * lambda)).exp();
        }
        return (1.0 - (2.0 * PI).sqrt() / lambda * cdf).clamp(0.0, 1.0);
    }
    let mut p = 0.0;
    for k in 1..=100 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let term = sign * (-2.0 * f64::from(k).powi(2) * lambda.powi(2)).exp();
        p += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// Counts over `bins` equal-width bins spanning `[lo, hi]`.
///
/// Bins are half-open except the last, which includes `hi`. Values outside
/// the range are not counted.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn histogram(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 || !(hi > lo) {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    let edge = |i: usize| if i == bins { hi } else { lo + width * i as f64 };
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let mut i = (((v - lo) / width) as usize).min(bins - 1);
        if v < edge(i) {
            i = i.saturating_sub(1);
        } else if i + 1 < bins && v >= edge(i + 1) {
            i += 1;
        }
        counts[i] += 1;
    }
    counts
}

/// Population Stability Index of `current` against `reference`.
///
/// Bins span the pooled range; a constant pooled sample widens to
/// `[v - 0.5, v + 0.5]`. Proportions are smoothed as
/// `(count + 0.001) / (n + 0.01)`. Either sample empty yields 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn psi(reference: &[f64], current: &[f64], bins: usize) -> f64 {
    if reference.is_empty() || current.is_empty() || bins == 0 {
        return 0.0;
    }
    let pooled = reference.iter().chain(current);
    let lo = pooled.clone().copied().fold(f64::INFINITY, f64::min);
    let hi = pooled.copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };

    let ref_counts = histogram(reference, lo, hi, bins);
    let cur_counts = histogram(current, lo, hi, bins);
    let (n_ref, n_cur) = (reference.len() as f64, current.len() as f64);

    ref_counts
        .iter()
        .zip(&cur_counts)
        .map(|(&r, &c)| {
            let r = (r as f64 + PSI_COUNT_SMOOTHING) / (n_ref + PSI_TOTAL_SMOOTHING);
            let c = (c as f64 + PSI_COUNT_SMOOTHING) / (n_cur + PSI_TOTAL_SMOOTHING);
            (c - r) * (c / r).ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ks_identical_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let result = ks_2samp(&a, &a);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..30).map(f64::from).collect();
        let b: Vec<f64> = (100..130).map(f64::from).collect();
        let result = ks_2samp(&a, &b);
        assert!((result.statistic - 1.0).abs() < 1e-12);
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_ks_exact_small_samples() {
        // n = m = 5, D = 3/5: P(D >= 0.6) = 5/14
        let a: Vec<f64> = (0..5).map(f64::from).collect();
        let b: Vec<f64> = (3..8).map(f64::from).collect();
        let result = ks_2samp(&a, &b);
        assert!((result.statistic - 0.6).abs() < 1e-12);
        assert!((result.p_value - 5.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_ks_exact_near_alpha() {
        // n = m = 40, D = 0.3 sits just above alpha = 0.05 exactly but below
        // it under the asymptotic approximation.
        let a: Vec<f64> = (0..40).map(f64::from).collect();
        let b: Vec<f64> = (12..52).map(f64::from).collect();
        let result = ks_2samp(&a, &b);
        assert!((result.statistic - 0.3).abs() < 1e-12);
        assert!((result.p_value - 0.054_141).abs() < 1e-5, "p = {}", result.p_value);
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_ks_exact_unequal_sizes_symmetric() {
        let a: Vec<f64> = (0..20).map(|i| f64::from(i) * 1.3).collect();
        let b: Vec<f64> = (0..50).map(|i| f64::from(i) * 0.37 + 3.0).collect();
        let ab = ks_2samp(&a, &b);
        let ba = ks_2samp(&b, &a);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
        assert!(ab.p_value > 0.0 && ab.p_value < 1.0);
    }

    #[test]
    fn test_ks_ties_handled() {
        let a = [1.0, 1.0, 2.0, 2.0];
        let b = [1.0, 2.0, 2.0, 2.0];
        let result = ks_2samp(&a, &b);
        assert!((result.statistic - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_ks_empty_sample() {
        assert_eq!(ks_2samp(&[], &[1.0]).p_value, 1.0);
    }

    #[test]
    fn test_ks_p_value_continuity() {
        let below = ks_p_value(1.1799);
        let above = ks_p_value(1.1801);
        assert!((below - above).abs() < 1e-6);
        // Critical value for alpha = 0.05
        assert!((ks_p_value(1.358) - 0.05).abs() < 1e-3);
        assert!(ks_p_value(0.2) > 0.999);
        assert!(ks_p_value(3.0) < 1e-6);
    }

    #[test]
    fn test_histogram_edges() {
        let counts = histogram(&[0.0, 0.5, 1.0, 9.99, 10.0, 11.0], 0.0, 10.0, 10);
        assert_eq!(counts, vec![2, 1, 0, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_psi_self_comparison_near_zero() {
        let a: Vec<f64> = (0..50).map(|i| f64::from(i).sin()).collect();
        assert!(psi(&a, &a, 10).abs() < 1e-12);
    }

    #[test]
    fn test_psi_constant_sample() {
        let a = [3.0; 20];
        assert!(psi(&a, &a, 10).abs() < 1e-12);
    }

    #[test]
    fn test_psi_shifted_distribution_large() {
        let a: Vec<f64> = (0..100).map(f64::from).collect();
        let b: Vec<f64> = (60..160).map(f64::from).collect();
        assert!(psi(&a, &b, 10) > 0.25);
    }
}
