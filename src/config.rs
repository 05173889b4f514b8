//! Simulation and drift-monitoring configuration
//!
//! Every section deserializes from camelCase JSON with per-field defaults,
//! so a partial document only overrides what it names.
//!
//! ## Example
//!
//! ```rust
//! use spraywatch::config::SimulationConfig;
//!
//! let config = SimulationConfig::from_json_str(r#"{"seed": 7, "drift": {"topN": 10}}"#)?;
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.drift.top_n, 10);
//! assert_eq!(config.duration_seconds, 120.0);
//! # Ok::<(), spraywatch::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::simulation::{sample_count, NoiseConfig, ProcessBaselines};
use crate::{Error, Result};

/// Longest allowed gap between consecutive dataset runs (one year).
pub const MAX_RUN_SPACING_HOURS: u32 = 8_760;

/// Top-level configuration for a simulated production line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Master seed for every random stream
    pub seed: u64,
    /// Runs generated when a monitor is initialized
    pub num_initial_runs: usize,
    /// Length of each run (seconds)
    pub duration_seconds: f64,
    /// Sensor sample rate (Hz)
    pub sample_rate_hz: f64,
    /// Synthetic spacing between consecutive dataset runs (hours)
    pub run_spacing_hours: u32,
    /// Number of most recent runs compared against the reference
    pub recent_window: usize,
    /// Noise regime
    pub noise: NoiseConfig,
    /// Nominal channel values
    pub baselines: ProcessBaselines,
    /// Drift classification thresholds
    pub drift: DriftConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_initial_runs: 50,
            duration_seconds: 120.0,
            sample_rate_hz: 1.0,
            run_spacing_hours: 3,
            recent_window: 20,
            noise: NoiseConfig::default(),
            baselines: ProcessBaselines::default(),
            drift: DriftConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed JSON and
    /// `Error::InvalidConfig` for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the master seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the run length and sample rate.
    #[must_use]
    pub const fn with_run_shape(mut self, duration_seconds: f64, sample_rate_hz: f64) -> Self {
        self.duration_seconds = duration_seconds;
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    /// Set the noise regime.
    #[must_use]
    pub const fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    /// Set the process baselines.
    #[must_use]
    pub const fn with_baselines(mut self, baselines: ProcessBaselines) -> Self {
        self.baselines = baselines;
        self
    }

    /// Set the drift thresholds.
    #[must_use]
    pub const fn with_drift(mut self, drift: DriftConfig) -> Self {
        self.drift = drift;
        self
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let samples = sample_count(self.duration_seconds, self.sample_rate_hz)?;
        if samples == 0 {
            return Err(Error::InvalidConfig(format!(
                "durationSeconds × sampleRateHz = {} × {} yields no samples; runs need at least one reading",
                self.duration_seconds, self.sample_rate_hz
            )));
        }
        if self.run_spacing_hours > MAX_RUN_SPACING_HOURS {
            return Err(Error::out_of_range(
                "runSpacingHours",
                f64::from(self.run_spacing_hours),
                0.0,
                f64::from(MAX_RUN_SPACING_HOURS),
            ));
        }
        if self.recent_window == 0 {
            return Err(Error::InvalidConfig(
                "recentWindow must be at least 1".to_string(),
            ));
        }
        self.noise.validate()?;
        self.baselines.validate()?;
        self.drift.validate()
    }
}

/// Thresholds for drift detection and classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriftConfig {
    /// KS p-value below which a feature counts as drifted
    pub alpha: f64,
    /// Aggregate PSI below which the process may be stable
    pub psi_stable: f64,
    /// Aggregate PSI below which the process is at most a warning
    pub psi_warning: f64,
    /// Minimum sample count on either side of a comparison
    pub min_samples: usize,
    /// Equal-width bins used for PSI
    pub psi_bins: usize,
    /// Feature columns compared per drift pass
    pub top_n: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            psi_stable: 0.10,
            psi_warning: 0.25,
            min_samples: 10,
            psi_bins: 10,
            top_n: 20,
        }
    }
}

impl DriftConfig {
    /// Set the number of compared feature columns.
    #[must_use]
    pub const fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Set the minimum sample count.
    #[must_use]
    pub const fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Validate thresholds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::out_of_range("drift.alpha", self.alpha, 0.0, 1.0));
        }
        if !(self.psi_stable.is_finite() && self.psi_stable >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "drift.psiStable = {} must be a non-negative finite number",
                self.psi_stable
            )));
        }
        if !(self.psi_warning.is_finite() && self.psi_warning >= self.psi_stable) {
            return Err(Error::InvalidConfig(format!(
                "drift.psiWarning = {} must be finite and at least drift.psiStable = {}",
                self.psi_warning, self.psi_stable
            )));
        }
        if self.min_samples < 2 {
            return Err(Error::InvalidConfig(format!(
                "drift.minSamples = {} must be at least 2",
                self.min_samples
            )));
        }
        if self.psi_bins == 0 {
            return Err(Error::InvalidConfig("drift.psiBins must be at least 1".to_string()));
        }
        Ok(())
    }
}
