//! Reduction of a run's channel time series to a name-addressable vector.
//!
//! Per channel: nine summary statistics plus end-of-run and worst-case
//! rolling statistics over three sample windows. Ten cross-channel features
//! follow. Names are sorted so vectors assemble identically for every run.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::simulation::{channel_series, Channel, ProductionRun, SensorReading};
use crate::stats::{self, safe_div};

/// Rolling window sizes (samples).
pub const WINDOW_SIZES: [usize; 3] = [5, 15, 30];

const CHANNEL_STATS: [&str; 9] = [
    "mean",
    "std",
    "min",
    "max",
    "range",
    "median",
    "trend",
    "diff_mean",
    "diff_std",
];

const ROLLING_STATS: [&str; 3] = ["last_mean", "last_std", "max_std"];

/// Cross-channel feature names.
pub const CROSS_FEATURES: [&str; 10] = [
    "energy_density",
    "substrate_delta_t",
    "substrate_temp_rise",
    "gas_ratio",
    "powder_to_carrier_ratio",
    "total_deposition",
    "deposition_efficiency",
    "spray_distance_variation",
    "plasma_stability",
    "run_duration",
];

/// Engineered features of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    run_id: String,
    features: BTreeMap<String, f64>,
}

impl FeatureSet {
    /// Wrap an existing feature map.
    #[must_use]
    pub const fn new(run_id: String, features: BTreeMap<String, f64>) -> Self {
        Self { run_id, features }
    }

    /// Run the features were computed from.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Name → value map, sorted by name.
    #[must_use]
    pub const fn features(&self) -> &BTreeMap<String, f64> {
        &self.features
    }

    /// Value of one feature.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Feature names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Assemble a vector in `names` order.
    ///
    /// Missing names and non-finite values become 0.
    #[must_use]
    pub fn to_vector<S: AsRef<str>>(&self, names: &[S]) -> Vec<f64> {
        names
            .iter()
            .map(|name| stats::finite_or_zero(self.get(name.as_ref()).unwrap_or(0.0)))
            .collect()
    }
}

/// Stateless feature extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Create a feature engineer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Canonical feature names in ascending order.
    ///
    /// Every `FeatureSet` this engineer produces has exactly these keys.
    #[must_use]
    pub fn feature_names() -> &'static [String] {
        static NAMES: OnceLock<Vec<String>> = OnceLock::new();
        NAMES.get_or_init(|| {
            let mut names = Vec::with_capacity(Self::feature_count());
            for channel in Channel::ALL {
                for stat in CHANNEL_STATS {
                    names.push(format!("{channel}_{stat}"));
                }
                for window in WINDOW_SIZES {
                    for stat in ROLLING_STATS {
                        names.push(format!("{channel}_roll{window}_{stat}"));
                    }
                }
            }
            names.extend(CROSS_FEATURES.iter().map(ToString::to_string));
            names.sort_unstable();
            names
        })
    }

    /// Number of features per run.
    #[must_use]
    pub const fn feature_count() -> usize {
        Channel::COUNT * (CHANNEL_STATS.len() + WINDOW_SIZES.len() * ROLLING_STATS.len())
            + CROSS_FEATURES.len()
    }

    /// Engineer features from a reading sequence.
    ///
    /// An empty sequence yields every feature as 0.
    #[must_use]
    pub fn engineer_features(&self, run_id: &str, readings: &[SensorReading]) -> FeatureSet {
        if readings.is_empty() {
            let features = Self::feature_names().iter().map(|n| (n.clone(), 0.0)).collect();
            return FeatureSet::new(run_id.to_string(), features);
        }

        let times: Vec<f64> = readings.iter().map(|r| r.time_seconds).collect();
        let mut features = BTreeMap::new();
        let mut means = [0.0; Channel::COUNT];
        let mut stds = [0.0; Channel::COUNT];

        for channel in Channel::ALL {
            let values = channel_series(readings, channel);
            let summary = ChannelSummary::compute(&values, &times);
            means[channel.index()] = summary.mean;
            stds[channel.index()] = summary.std;

            let name = channel.name();
            for (stat, value) in summary.entries() {
                features.insert(format!("{name}_{stat}"), value);
            }
            for window in WINDOW_SIZES {
                let rolling = RollingSummary::compute(&values, window);
                features.insert(format!("{name}_roll{window}_last_mean"), rolling.last_mean);
                features.insert(format!("{name}_roll{window}_last_std"), rolling.last_std);
                features.insert(format!("{name}_roll{window}_max_std"), rolling.max_std);
            }
        }

        let m = |c: Channel| means[c.index()];
        let s = |c: Channel| stds[c.index()];
        let first = &readings[0];
        let last = &readings[readings.len() - 1];
        let deposition = channel_series(readings, Channel::DepositionRateUmS);

        let cross = [
            (
                "energy_density",
                safe_div(
                    m(Channel::PlasmaPowerKw),
                    m(Channel::PrimaryGasFlowSlpm) + m(Channel::SecondaryGasFlowSlpm),
                ),
            ),
            (
                "substrate_delta_t",
                m(Channel::SubstrateTempC) - m(Channel::AmbientTempC),
            ),
            (
                "substrate_temp_rise",
                last.substrate_temp_c - first.substrate_temp_c,
            ),
            (
                "gas_ratio",
                safe_div(m(Channel::PrimaryGasFlowSlpm), m(Channel::SecondaryGasFlowSlpm)),
            ),
            (
                "powder_to_carrier_ratio",
                safe_div(m(Channel::PowderFeedRateGMin), m(Channel::CarrierGasFlowSlpm)),
            ),
            ("total_deposition", deposition.iter().sum::<f64>()),
            (
                "deposition_efficiency",
                safe_div(m(Channel::DepositionRateUmS), m(Channel::PowderFeedRateGMin)) * 1000.0,
            ),
            (
                "spray_distance_variation",
                safe_div(s(Channel::SprayDistanceMm), m(Channel::SprayDistanceMm)),
            ),
            (
                "plasma_stability",
                1.0 - safe_div(s(Channel::PlasmaPowerKw), m(Channel::PlasmaPowerKw)),
            ),
            ("run_duration", stats::max(&times)),
        ];
        for (name, value) in cross {
            features.insert(name.to_string(), value);
        }

        FeatureSet::new(run_id.to_string(), features)
    }

    /// Engineer features for a stored run.
    #[must_use]
    pub fn engineer_run(&self, run: &ProductionRun) -> FeatureSet {
        self.engineer_features(run.id(), run.sensor_readings())
    }

    /// Engineer features for many runs, preserving order.
    #[must_use]
    pub fn engineer_batch<R: Borrow<ProductionRun>>(&self, runs: &[R]) -> Vec<FeatureSet> {
        runs.iter().map(|run| self.engineer_run(run.borrow())).collect()
    }
}

/// Nine per-channel statistics.
struct ChannelSummary {
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
    median: f64,
    trend: f64,
    diff_mean: f64,
    diff_std: f64,
}

impl ChannelSummary {
    fn compute(values: &[f64], times: &[f64]) -> Self {
        let diffs = stats::diff(values);
        Self {
            mean: stats::mean(values),
            std: stats::std_sample(values),
            min: stats::min(values),
            max: stats::max(values),
            median: stats::median(values),
            trend: stats::linear_slope(times, values),
            diff_mean: stats::mean(&diffs),
            diff_std: stats::std_sample(&diffs),
        }
    }

    fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("max", self.max),
            ("range", self.max - self.min),
            ("median", self.median),
            ("trend", self.trend),
            ("diff_mean", self.diff_mean),
            ("diff_std", self.diff_std),
        ]
    }
}

/// Trailing-window statistics; windows shorter than `size` at the start of
/// the run use every sample seen so far.
struct RollingSummary {
    last_mean: f64,
    last_std: f64,
    max_std: f64,
}

impl RollingSummary {
    fn compute(values: &[f64], size: usize) -> Self {
        let window_at = move |end: usize| &values[(end + 1).saturating_sub(size)..=end];
        let last = window_at(values.len() - 1);
        let max_std = (0..values.len())
            .map(|end| stats::std_sample(window_at(end)))
            .fold(0.0, f64::max);
        Self {
            last_mean: stats::mean(last),
            last_std: stats::std_sample(last),
            max_std,
        }
    }
}
