//! Drift status records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DriftConfig;

/// Drifted-feature count below which a low-PSI pass is stable.
const STABLE_MAX_DRIFTED: usize = 3;
/// Drifted-feature count below which a pass is at most a warning.
const WARNING_MAX_DRIFTED: usize = 5;
/// Drifted features listed in a dashboard summary.
const SUMMARY_TOP_FEATURES: usize = 5;

/// Overall classification of a drift pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftState {
    /// Current runs match the reference
    Stable,
    /// Some drift; keep watching
    Warning,
    /// Significant drift
    Critical,
    /// No usable reference
    Unknown,
    /// Too few current runs
    InsufficientData,
}

impl DriftState {
    /// Classify an aggregate PSI and drifted-feature count.
    ///
    /// Stable needs both a low PSI and few drifted features. Otherwise a
    /// moderate PSI *or* a moderate count is enough for warning, so many
    /// drifted features with a low PSI stay at warning.
    #[must_use]
    pub fn classify(psi: f64, drifted_count: usize, config: &DriftConfig) -> Self {
        if psi < config.psi_stable && drifted_count < STABLE_MAX_DRIFTED {
            Self::Stable
        } else if psi < config.psi_warning || drifted_count < WARNING_MAX_DRIFTED {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
            Self::InsufficientData => "insufficient_data",
        }
    }

    /// Dashboard indicator colour.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Stable => "green",
            Self::Warning => "yellow",
            Self::Critical => "red",
            Self::Unknown | Self::InsufficientData => "gray",
        }
    }

    /// Operator guidance.
    #[must_use]
    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::Stable => "Model predictions are reliable. Continue normal operations.",
            Self::Warning => {
                "Minor drift detected. Monitor closely and consider model retraining if drift persists."
            }
            Self::Critical => {
                "Significant drift detected. Model retraining recommended. Verify process conditions."
            }
            Self::Unknown | Self::InsufficientData => {
                "Insufficient data to assess drift. Continue collecting data."
            }
        }
    }
}

impl fmt::Display for DriftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison of one feature between reference and current runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDrift {
    /// Feature name
    pub feature_name: String,
    /// KS statistic
    pub ks_statistic: f64,
    /// KS p-value
    pub p_value: f64,
    /// Whether the p-value is below alpha
    pub drift_detected: bool,
    /// Reference mean
    pub reference_mean: f64,
    /// Current mean
    pub current_mean: f64,
    /// `|current - reference| / (|reference| + 1e-8)`
    pub shift_magnitude: f64,
    /// Per-feature PSI
    pub psi: f64,
}

/// Result of one drift pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftStatus {
    /// Classification
    pub overall_status: DriftState,
    /// Mean PSI over compared features
    pub psi: f64,
    /// Per-feature comparisons keyed by name
    pub feature_drift: BTreeMap<String, FeatureDrift>,
    /// Drifted features in comparison order
    pub drifted_features: Vec<String>,
    /// When the pass ran
    pub last_updated: DateTime<Utc>,
    /// Reference sample count
    pub reference_run_count: usize,
    /// Current sample count
    pub current_run_count: usize,
}

impl DriftStatus {
    /// A status with no feature comparisons.
    #[must_use]
    pub fn empty(state: DriftState, reference_run_count: usize, current_run_count: usize) -> Self {
        Self {
            overall_status: state,
            psi: 0.0,
            feature_drift: BTreeMap::new(),
            drifted_features: Vec::new(),
            last_updated: Utc::now(),
            reference_run_count,
            current_run_count,
        }
    }

    /// Dashboard view.
    #[must_use]
    pub fn summary(&self) -> DriftSummary {
        DriftSummary {
            status: self.overall_status,
            status_color: self.overall_status.color(),
            psi: self.psi,
            drifted_feature_count: self.drifted_features.len(),
            total_features_monitored: self.feature_drift.len(),
            top_drifted_features: self
                .drifted_features
                .iter()
                .take(SUMMARY_TOP_FEATURES)
                .map(|name| DriftedFeature {
                    name: name.clone(),
                    shift: self
                        .feature_drift
                        .get(name)
                        .map_or(0.0, |fd| fd.shift_magnitude),
                })
                .collect(),
            recommendation: self.overall_status.recommendation(),
        }
    }
}

/// Name and relative shift of one drifted feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftedFeature {
    /// Feature name
    pub name: String,
    /// Relative mean shift
    pub shift: f64,
}

/// Compact drift view for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    /// Classification
    pub status: DriftState,
    /// Indicator colour
    pub status_color: &'static str,
    /// Aggregate PSI
    pub psi: f64,
    /// Number of drifted features
    pub drifted_feature_count: usize,
    /// Number of compared features
    pub total_features_monitored: usize,
    /// First drifted features with their shift
    pub top_drifted_features: Vec<DriftedFeature>,
    /// Operator guidance
    pub recommendation: &'static str,
}
