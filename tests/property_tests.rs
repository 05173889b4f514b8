//! Property-based tests for spraywatch
//!
//! Pattern:
//! - Test mathematical invariants of the drift statistics
//! - Test grading and feature-set structure
//! - Run with ProptestConfig::with_cases(100)
//! - Generation-heavy properties use fewer cases

use chrono::DateTime;
use proptest::prelude::*;
use spraywatch::drift::{histogram, ks_2samp, psi, DriftState};
use spraywatch::features::FeatureEngineer;
use spraywatch::simulation::{sample_count, QualityGrade, QualityMetrics, RunOrchestrator};
use spraywatch::DriftConfig;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate a finite sample of 1..=60 values
fn arb_sample() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1_000.0f64..1_000.0, 1..=60)
}

/// Generate quality metrics across all grading bands
fn arb_metrics() -> impl Strategy<Value = QualityMetrics> {
    (
        0.0f64..400.0,
        0.0f64..12.0,
        0.0f64..20.0,
        10.0f64..70.0,
        0.5f64..8.0,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(thickness, uniformity, porosity, adhesion, roughness, delam, cracks, voids)| {
                QualityMetrics {
                    thickness_um: thickness,
                    thickness_uniformity_pct: uniformity,
                    porosity_pct: porosity,
                    adhesion_strength_mpa: adhesion,
                    surface_roughness_ra: roughness,
                    has_delamination: delam,
                    has_cracks: cracks,
                    has_voids: voids,
                }
            },
        )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Kolmogorov-Smirnov Properties
    // ========================================================================

    /// Property: statistic and p-value lie in [0, 1]
    #[test]
    fn prop_ks_bounds(a in arb_sample(), b in arb_sample()) {
        let result = ks_2samp(&a, &b);
        prop_assert!((0.0..=1.0).contains(&result.statistic));
        prop_assert!((0.0..=1.0).contains(&result.p_value));
    }

    /// Property: the test is symmetric in its arguments
    #[test]
    fn prop_ks_symmetric(a in arb_sample(), b in arb_sample()) {
        let ab = ks_2samp(&a, &b);
        let ba = ks_2samp(&b, &a);
        prop_assert!((ab.statistic - ba.statistic).abs() < 1e-12);
        prop_assert!((ab.p_value - ba.p_value).abs() < 1e-12);
    }

    /// Property: a sample never differs from itself
    #[test]
    fn prop_ks_self_zero(a in arb_sample()) {
        let result = ks_2samp(&a, &a);
        prop_assert_eq!(result.statistic, 0.0);
        prop_assert_eq!(result.p_value, 1.0);
    }

    // ========================================================================
    // PSI and Histogram Properties
    // ========================================================================

    /// Property: PSI of a sample against itself is zero
    #[test]
    fn prop_psi_self_zero(a in arb_sample(), bins in 1usize..20) {
        prop_assert!(psi(&a, &a, bins).abs() < 1e-9);
    }

    /// Property: PSI is never negative
    #[test]
    fn prop_psi_non_negative(a in arb_sample(), b in arb_sample()) {
        prop_assert!(psi(&a, &b, 10) >= -1e-12);
    }

    /// Property: every in-range value lands in exactly one bin
    #[test]
    fn prop_histogram_conserves_counts(values in arb_sample(), bins in 1usize..25) {
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assume!(hi > lo);
        let counts = histogram(&values, lo, hi, bins);
        prop_assert_eq!(counts.len(), bins);
        prop_assert_eq!(counts.iter().sum::<usize>(), values.len());
    }

    // ========================================================================
    // Classification Properties
    // ========================================================================

    /// Property: more drift never yields a milder state
    #[test]
    fn prop_classification_monotone(psi_value in 0.0f64..1.0, drifted in 0usize..20) {
        let config = DriftConfig::default();
        let rank = |s: DriftState| match s {
            DriftState::Stable => 0,
            DriftState::Warning => 1,
            DriftState::Critical => 2,
            DriftState::Unknown | DriftState::InsufficientData => 3,
        };
        let base = rank(DriftState::classify(psi_value, drifted, &config));
        let more = rank(DriftState::classify(psi_value + 0.1, drifted + 1, &config));
        prop_assert!(base < 3);
        prop_assert!(more >= base);
    }

    // ========================================================================
    // Quality Grade Properties
    // ========================================================================

    /// Property: any defect rejects; otherwise the grade follows the score
    #[test]
    fn prop_grade_rules(metrics in arb_metrics()) {
        let grade = metrics.quality_grade();
        if metrics.defect_flag() {
            prop_assert_eq!(grade, QualityGrade::Reject);
        } else {
            prop_assert_eq!(grade, QualityGrade::from_score(metrics.score()));
        }
        prop_assert!(metrics.score() <= 11);
    }

    /// Property: sample count is floor(duration × rate)
    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn prop_sample_count_floor(duration in 0.0f64..600.0, rate in 0.01f64..10.0) {
        let n = sample_count(duration, rate).unwrap();
        prop_assert_eq!(n, (duration * rate).floor() as usize);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // ========================================================================
    // Feature Set Properties
    // ========================================================================

    /// Property: every run yields the canonical sorted key set with finite values
    #[test]
    fn prop_feature_keys_canonical(seed in any::<u64>(), samples in 1u32..40) {
        let start = DateTime::from_timestamp(1_700_000_000, 0);
        let mut orch = RunOrchestrator::new(seed).unwrap();
        let run = orch
            .generate_single_run(f64::from(samples), 1.0, start, None)
            .unwrap();
        let set = FeatureEngineer::new().engineer_run(&run);

        let names: Vec<&str> = set.names().collect();
        let canonical: Vec<&str> = FeatureEngineer::feature_names()
            .iter()
            .map(String::as_str)
            .collect();
        prop_assert_eq!(names, canonical);
        prop_assert!(set.features().values().all(|v| v.is_finite()));
    }
}
