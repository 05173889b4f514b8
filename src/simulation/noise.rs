//! Seeded stochastic primitives: sensor noise, random-walk drift, batch
//! variation and out-of-distribution perturbation.
//!
//! All randomness flows through one `StdRng`. Calls are consumed in the
//! order the caller makes them, so identical seeds and identical call
//! sequences reproduce bit-identical output.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use crate::{Error, Result};

/// Noise regime for the process simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoiseConfig {
    /// Relative Gaussian sensor noise (0.02 = 2%)
    pub sensor_noise_pct: f64,
    /// Random-walk drift standard deviation per elapsed minute
    pub drift_rate_per_min: f64,
    /// Relative batch-to-batch variation
    pub batch_variation_pct: f64,
    /// Probability that a run is out-of-distribution
    pub ood_probability: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sensor_noise_pct: 0.02,
            drift_rate_per_min: 0.001,
            batch_variation_pct: 0.03,
            ood_probability: 0.05,
        }
    }
}

impl NoiseConfig {
    /// Set the relative sensor noise.
    #[must_use]
    pub const fn with_sensor_noise_pct(mut self, pct: f64) -> Self {
        self.sensor_noise_pct = pct;
        self
    }

    /// Set the drift rate per minute.
    #[must_use]
    pub const fn with_drift_rate_per_min(mut self, rate: f64) -> Self {
        self.drift_rate_per_min = rate;
        self
    }

    /// Set the batch variation.
    #[must_use]
    pub const fn with_batch_variation_pct(mut self, pct: f64) -> Self {
        self.batch_variation_pct = pct;
        self
    }

    /// Set the out-of-distribution probability.
    #[must_use]
    pub const fn with_ood_probability(mut self, probability: f64) -> Self {
        self.ood_probability = probability;
        self
    }

    /// Check every field lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("noise.sensorNoisePct", self.sensor_noise_pct),
            ("noise.driftRatePerMin", self.drift_rate_per_min),
            ("noise.batchVariationPct", self.batch_variation_pct),
            ("noise.oodProbability", self.ood_probability),
        ];
        for (name, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::out_of_range(name, value, 0.0, 1.0));
            }
        }
        Ok(())
    }
}

/// Draw from `N(mean, std_dev)` with the Box-Muller transform.
///
/// Always consumes exactly two uniforms so the stream position does not
/// depend on the requested spread.
pub fn gaussian<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-300);
    let u2: f64 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + z * std_dev.abs()
}

/// Seeded noise source with per-channel drift accumulators.
#[derive(Debug, Clone)]
pub struct NoiseEngine {
    config: NoiseConfig,
    rng: StdRng,
    drift: [f64; Channel::COUNT],
}

impl NoiseEngine {
    /// Create a noise engine.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` fails validation.
    pub fn new(config: NoiseConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            drift: [0.0; Channel::COUNT],
        })
    }

    /// Active noise configuration.
    #[must_use]
    pub const fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// `value + N(0, |value| * sensor_noise_pct)`.
    pub fn add_noise(&mut self, value: f64) -> f64 {
        let spread = value.abs() * self.config.sensor_noise_pct;
        value + gaussian(&mut self.rng, 0.0, spread)
    }

    /// Advance the channel's random walk by `N(0, drift_rate * elapsed_minutes)`
    /// and return the accumulated drift.
    pub fn drift(&mut self, channel: Channel, elapsed_minutes: f64) -> f64 {
        let step = gaussian(
            &mut self.rng,
            0.0,
            self.config.drift_rate_per_min * elapsed_minutes,
        );
        let state = &mut self.drift[channel.index()];
        *state += step;
        *state
    }

    /// Current accumulated drift for a channel.
    #[must_use]
    pub const fn drift_state(&self, channel: Channel) -> f64 {
        self.drift[channel.index()]
    }

    /// `base * N(1, batch_variation_pct)`.
    pub fn batch_variation(&mut self, base: f64) -> f64 {
        base * gaussian(&mut self.rng, 1.0, self.config.batch_variation_pct)
    }

    /// Bernoulli draw with `ood_probability`.
    pub fn ood_decision(&mut self) -> bool {
        self.rng.gen::<f64>() < self.config.ood_probability
    }

    /// Multiplicative perturbation `1 ± U(0.15, 0.30)` for a run already
    /// known to be out-of-distribution.
    pub fn ood_shift(&mut self) -> f64 {
        let direction: f64 = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let magnitude = self.rng.gen_range(0.15..0.30);
        direction.mul_add(magnitude, 1.0)
    }

    /// Draw the OOD coin and return the matching factor (1 for normal runs).
    pub fn ood_factor(&mut self) -> f64 {
        if self.ood_decision() {
            self.ood_shift()
        } else {
            1.0
        }
    }

    /// Clear all drift accumulators. Call once per run.
    pub fn reset_drift(&mut self) {
        self.drift = [0.0; Channel::COUNT];
    }

    /// Reseed the stream and clear drift state.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset_drift();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(seed: u64) -> NoiseEngine {
        NoiseEngine::new(NoiseConfig::default(), seed).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(NoiseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NoiseConfig::default().with_ood_probability(1.5);
        let err = NoiseEngine::new(config, 1).unwrap_err();
        assert!(err.to_string().contains("oodProbability"));

        let config = NoiseConfig::default().with_sensor_noise_pct(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = engine(7);
        let mut b = engine(7);
        for _ in 0..100 {
            assert_eq!(a.add_noise(100.0).to_bits(), b.add_noise(100.0).to_bits());
        }
    }

    #[test]
    fn test_zero_noise_is_identity() {
        let config = NoiseConfig::default().with_sensor_noise_pct(0.0);
        let mut engine = NoiseEngine::new(config, 3).unwrap();
        assert_eq!(engine.add_noise(42.0), 42.0);
    }

    #[test]
    fn test_noise_spread_scales_with_value() {
        let mut engine = engine(11);
        let samples: Vec<f64> = (0..5000).map(|_| engine.add_noise(1000.0)).collect();
        let std = crate::stats::std_population(&samples);
        // 2% of 1000
        assert!((std - 20.0).abs() < 2.0, "std = {std}");
    }

    #[test]
    fn test_drift_accumulates_and_resets() {
        let mut engine = engine(5);
        let first = engine.drift(Channel::PlasmaPowerKw, 10.0);
        let second = engine.drift(Channel::PlasmaPowerKw, 10.0);
        assert_eq!(engine.drift_state(Channel::PlasmaPowerKw), second);
        assert_ne!(first, second);
        assert_eq!(engine.drift_state(Channel::PlasmaTempC), 0.0);

        engine.reset_drift();
        assert_eq!(engine.drift_state(Channel::PlasmaPowerKw), 0.0);
    }

    #[test]
    fn test_reseed_restores_stream_and_clears_drift() {
        let mut engine = engine(9);
        let first: Vec<f64> = (0..10).map(|_| engine.add_noise(50.0)).collect();
        engine.drift(Channel::SubstrateTempC, 5.0);

        engine.reseed(9);
        assert_eq!(engine.drift_state(Channel::SubstrateTempC), 0.0);
        let second: Vec<f64> = (0..10).map(|_| engine.add_noise(50.0)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ood_shift_range() {
        let mut engine = engine(13);
        for _ in 0..500 {
            let factor = engine.ood_shift();
            let deviation = (factor - 1.0).abs();
            assert!((0.149..=0.301).contains(&deviation), "factor = {factor}");
        }
    }

    #[test]
    fn test_ood_factor_never_fires_at_zero_probability() {
        let config = NoiseConfig::default().with_ood_probability(0.0);
        let mut engine = NoiseEngine::new(config, 17).unwrap();
        for _ in 0..200 {
            assert!(!engine.ood_decision());
            assert_eq!(engine.ood_factor(), 1.0);
        }
    }

    #[test]
    fn test_batch_variation_centered_on_base() {
        let mut engine = engine(21);
        let samples: Vec<f64> = (0..5000).map(|_| engine.batch_variation(10.0)).collect();
        let mean = crate::stats::mean(&samples);
        assert!((mean - 10.0).abs() < 0.05, "mean = {mean}");
    }
}
