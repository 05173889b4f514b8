//! Reference-population drift detector.
//!
//! The reference is an immutable `Arc` behind a lock. Replacing it builds
//! the new reference first and swaps the pointer under the write lock;
//! detection clones the pointer under the read lock and works on that
//! snapshot, so a pass sees either the old or the new reference in full.

use std::borrow::Borrow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::statistics::{ks_2samp, psi};
use super::types::{DriftState, DriftStatus, FeatureDrift};
use crate::config::DriftConfig;
use crate::features::{FeatureEngineer, FeatureFrame, FeatureSet};
use crate::simulation::ProductionRun;
use crate::{stats, Result};

/// Denominator guard for the relative mean shift.
const SHIFT_EPSILON: f64 = 1e-8;

/// Mean and sample standard deviation of one reference feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStats {
    /// Mean over finite values
    pub mean: f64,
    /// Sample standard deviation over finite values
    pub std: f64,
}

/// Captured reference population.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDistribution {
    frame: FeatureFrame,
    stats: Vec<FeatureStats>,
    created_at: DateTime<Utc>,
}

impl ReferenceDistribution {
    /// Capture a reference from engineered feature sets.
    #[must_use]
    pub fn from_feature_sets(sets: &[FeatureSet]) -> Self {
        let frame = FeatureFrame::from_feature_sets(sets);
        let stats = (0..frame.n_cols())
            .map(|i| {
                let values = finite(frame.column_at(i));
                FeatureStats {
                    mean: stats::mean(&values),
                    std: stats::std_sample(&values),
                }
            })
            .collect();
        Self {
            frame,
            stats,
            created_at: Utc::now(),
        }
    }

    /// Feature table.
    #[must_use]
    pub const fn frame(&self) -> &FeatureFrame {
        &self.frame
    }

    /// Number of reference samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.frame.n_rows()
    }

    /// Summary of a named feature.
    #[must_use]
    pub fn feature_stats(&self, name: &str) -> Option<FeatureStats> {
        self.frame.column_index(name).map(|i| self.stats[i])
    }

    /// When the reference was captured.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Compares current runs against a reference population.
#[derive(Debug, Default)]
pub struct DriftDetector {
    config: DriftConfig,
    engineer: FeatureEngineer,
    reference: RwLock<Option<Arc<ReferenceDistribution>>>,
}

impl DriftDetector {
    /// Create a detector with validated thresholds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` is out of range.
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engineer: FeatureEngineer::new(),
            reference: RwLock::new(None),
        })
    }

    /// Active thresholds.
    #[must_use]
    pub const fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Current reference snapshot.
    #[must_use]
    pub fn reference(&self) -> Option<Arc<ReferenceDistribution>> {
        self.reference.read().clone()
    }

    /// Whether a reference has been set.
    #[must_use]
    pub fn has_reference(&self) -> bool {
        self.reference.read().is_some()
    }

    /// Replace the reference with features of `runs`.
    pub fn set_reference<R: Borrow<ProductionRun>>(&self, runs: &[R]) {
        let sets = self.engineer.engineer_batch(runs);
        self.set_reference_features(&sets);
    }

    /// Replace the reference with precomputed feature sets.
    pub fn set_reference_features(&self, sets: &[FeatureSet]) {
        let reference = Arc::new(ReferenceDistribution::from_feature_sets(sets));
        tracing::info!(
            samples = reference.sample_count(),
            features = reference.frame().n_cols(),
            "reference distribution replaced"
        );
        *self.reference.write() = Some(reference);
    }

    /// Compare `current` runs against the reference over the first `top_n`
    /// reference columns.
    #[must_use]
    pub fn detect_drift<R: Borrow<ProductionRun>>(&self, current: &[R], top_n: usize) -> DriftStatus {
        let Some(reference) = self.usable_reference() else {
            return self.unknown(current.len());
        };
        let sets = self.engineer.engineer_batch(current);
        self.compare(&reference, &sets, top_n)
    }

    /// Compare precomputed feature sets against the reference.
    #[must_use]
    pub fn detect_drift_features(&self, current: &[FeatureSet], top_n: usize) -> DriftStatus {
        match self.usable_reference() {
            Some(reference) => self.compare(&reference, current, top_n),
            None => self.unknown(current.len()),
        }
    }

    fn usable_reference(&self) -> Option<Arc<ReferenceDistribution>> {
        self.reference()
            .filter(|r| r.sample_count() >= self.config.min_samples)
    }

    fn unknown(&self, current_count: usize) -> DriftStatus {
        let reference_count = self.reference().map_or(0, |r| r.sample_count());
        tracing::debug!(reference_count, "drift unknown: no usable reference");
        DriftStatus::empty(DriftState::Unknown, reference_count, current_count)
    }

    fn compare(
        &self,
        reference: &ReferenceDistribution,
        current: &[FeatureSet],
        top_n: usize,
    ) -> DriftStatus {
        let ref_frame = reference.frame();
        if current.len() < self.config.min_samples {
            tracing::debug!(current = current.len(), "drift insufficient data");
            return DriftStatus::empty(
                DriftState::InsufficientData,
                ref_frame.n_rows(),
                current.len(),
            );
        }

        let cur_frame = FeatureFrame::with_columns(current, ref_frame.columns().to_vec());
        let mut status = DriftStatus::empty(DriftState::Stable, ref_frame.n_rows(), current.len());
        let mut psi_values = Vec::new();

        for (i, name) in ref_frame.columns().iter().enumerate().take(top_n) {
            let ref_values = finite(ref_frame.column_at(i));
            let cur_values = finite(cur_frame.column_at(i));
            if ref_values.is_empty() || cur_values.is_empty() {
                tracing::warn!(feature = %name, "skipping feature with no finite values");
                continue;
            }

            let ks = ks_2samp(&ref_values, &cur_values);
            let reference_mean = stats::mean(&ref_values);
            let current_mean = stats::mean(&cur_values);
            let feature_psi = psi(&ref_values, &cur_values, self.config.psi_bins);
            let drift_detected = ks.p_value < self.config.alpha;

            if drift_detected {
                status.drifted_features.push(name.clone());
            }
            psi_values.push(feature_psi);
            status.feature_drift.insert(
                name.clone(),
                FeatureDrift {
                    feature_name: name.clone(),
                    ks_statistic: ks.statistic,
                    p_value: ks.p_value,
                    drift_detected,
                    reference_mean,
                    current_mean,
                    shift_magnitude: (current_mean - reference_mean).abs()
                        / (reference_mean.abs() + SHIFT_EPSILON),
                    psi: feature_psi,
                },
            );
        }

        status.psi = stats::mean(&psi_values);
        status.overall_status =
            DriftState::classify(status.psi, status.drifted_features.len(), &self.config);
        tracing::info!(
            status = %status.overall_status,
            psi = status.psi,
            drifted = status.drifted_features.len(),
            compared = status.feature_drift.len(),
            "drift detection complete"
        );
        status
    }
}

fn finite(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().filter(|v| v.is_finite()).collect()
}
