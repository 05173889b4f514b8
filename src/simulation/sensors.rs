//! Sensor time-series generation for one thermal spray coating run.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::noise::{gaussian, NoiseConfig, NoiseEngine};
use super::setup::SetupParams;
use crate::{Error, Result};

/// Reference operating point the deposition model is calibrated against.
const NOMINAL_POWER_KW: f64 = 55.0;
const NOMINAL_FEED_G_MIN: f64 = 50.0;
const NOMINAL_DISTANCE_MM: f64 = 120.0;
const NOMINAL_SPEED_MM_S: f64 = 500.0;
const NOMINAL_THICKNESS_UM: f64 = 300.0;
/// Deposition rate at the nominal operating point (µm/s).
const BASE_DEPOSITION_UM_S: f64 = 2.5;

const OSCILLATION_AMPLITUDE: f64 = 0.02;
const OSCILLATION_PERIOD_S: (f64, f64) = (20.0, 40.0);
const ROBOT_PERIOD_S: f64 = 30.0;
const SUBSTRATE_RISE_C: f64 = 100.0;
const SUBSTRATE_TIME_CONSTANT_S: f64 = 60.0;

/// Channels that accumulate random-walk drift over a run.
const DRIFTING_CHANNELS: [Channel; 4] = [
    Channel::PlasmaPowerKw,
    Channel::PlasmaTempC,
    Channel::PowderFeedRateGMin,
    Channel::PrimaryGasFlowSlpm,
];

/// Nominal value for every physical channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessBaselines {
    /// Plasma temperature (°C)
    pub plasma_temp_c: f64,
    /// Plasma power (kW)
    pub plasma_power_kw: f64,
    /// Argon flow (SLPM)
    pub primary_gas_flow_slpm: f64,
    /// Hydrogen flow (SLPM)
    pub secondary_gas_flow_slpm: f64,
    /// Powder feed (g/min)
    pub powder_feed_rate_g_min: f64,
    /// Carrier gas (SLPM)
    pub carrier_gas_flow_slpm: f64,
    /// Substrate temperature at run start (°C)
    pub substrate_temp_c: f64,
    /// Chamber pressure (mbar)
    pub chamber_pressure_mbar: f64,
    /// Ambient temperature (°C)
    pub ambient_temp_c: f64,
    /// Ambient humidity (%)
    pub ambient_humidity_pct: f64,
}

impl Default for ProcessBaselines {
    fn default() -> Self {
        Self {
            plasma_temp_c: 12_000.0,
            plasma_power_kw: 55.0,
            primary_gas_flow_slpm: 45.0,
            secondary_gas_flow_slpm: 10.0,
            powder_feed_rate_g_min: 50.0,
            carrier_gas_flow_slpm: 5.0,
            substrate_temp_c: 200.0,
            chamber_pressure_mbar: 1013.0,
            ambient_temp_c: 25.0,
            ambient_humidity_pct: 45.0,
        }
    }
}

impl ProcessBaselines {
    /// Check that every multiplicative baseline is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending baseline.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("baselines.plasmaTempC", self.plasma_temp_c),
            ("baselines.plasmaPowerKw", self.plasma_power_kw),
            ("baselines.primaryGasFlowSlpm", self.primary_gas_flow_slpm),
            ("baselines.secondaryGasFlowSlpm", self.secondary_gas_flow_slpm),
            ("baselines.powderFeedRateGMin", self.powder_feed_rate_g_min),
            ("baselines.carrierGasFlowSlpm", self.carrier_gas_flow_slpm),
            ("baselines.chamberPressureMbar", self.chamber_pressure_mbar),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} = {value} must be a positive finite number"
                )));
            }
        }
        let finite = [
            ("baselines.substrateTempC", self.substrate_temp_c),
            ("baselines.ambientTempC", self.ambient_temp_c),
            ("baselines.ambientHumidityPct", self.ambient_humidity_pct),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} = {value} must be finite")));
            }
        }
        Ok(())
    }
}

/// One timestep of every monitored channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Absolute sample time
    pub timestamp: DateTime<Utc>,
    /// Seconds since run start
    pub time_seconds: f64,
    /// Plasma temperature (°C)
    pub plasma_temp_c: f64,
    /// Plasma power (kW)
    pub plasma_power_kw: f64,
    /// Argon flow (SLPM)
    pub primary_gas_flow_slpm: f64,
    /// Hydrogen flow (SLPM)
    pub secondary_gas_flow_slpm: f64,
    /// Powder feed (g/min)
    pub powder_feed_rate_g_min: f64,
    /// Carrier gas (SLPM)
    pub carrier_gas_flow_slpm: f64,
    /// Substrate temperature (°C)
    pub substrate_temp_c: f64,
    /// Spray distance (mm)
    pub spray_distance_mm: f64,
    /// Chamber pressure (mbar)
    pub chamber_pressure_mbar: f64,
    /// Ambient temperature (°C)
    pub ambient_temp_c: f64,
    /// Ambient humidity (%)
    pub ambient_humidity_pct: f64,
    /// Derived deposition rate (µm/s)
    pub deposition_rate_um_s: f64,
}

impl SensorReading {
    /// Value of one channel.
    #[must_use]
    pub const fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::PlasmaTempC => self.plasma_temp_c,
            Channel::PlasmaPowerKw => self.plasma_power_kw,
            Channel::PrimaryGasFlowSlpm => self.primary_gas_flow_slpm,
            Channel::SecondaryGasFlowSlpm => self.secondary_gas_flow_slpm,
            Channel::PowderFeedRateGMin => self.powder_feed_rate_g_min,
            Channel::CarrierGasFlowSlpm => self.carrier_gas_flow_slpm,
            Channel::SubstrateTempC => self.substrate_temp_c,
            Channel::SprayDistanceMm => self.spray_distance_mm,
            Channel::ChamberPressureMbar => self.chamber_pressure_mbar,
            Channel::AmbientTempC => self.ambient_temp_c,
            Channel::AmbientHumidityPct => self.ambient_humidity_pct,
            Channel::DepositionRateUmS => self.deposition_rate_um_s,
        }
    }
}

/// Extract one channel across a reading sequence.
#[must_use]
pub fn channel_series(readings: &[SensorReading], channel: Channel) -> Vec<f64> {
    readings.iter().map(|r| r.value(channel)).collect()
}

/// Instantaneous deposition rate (µm/s) from power, feed, distance and speed.
#[must_use]
pub fn deposition_rate(
    plasma_power_kw: f64,
    powder_feed_g_min: f64,
    spray_distance_mm: f64,
    robot_speed_mm_s: f64,
) -> f64 {
    let power_factor = plasma_power_kw / NOMINAL_POWER_KW;
    let feed_factor = powder_feed_g_min / NOMINAL_FEED_G_MIN;
    let distance_factor = NOMINAL_DISTANCE_MM / spray_distance_mm;
    let speed_factor = NOMINAL_SPEED_MM_S / robot_speed_mm_s;
    BASE_DEPOSITION_UM_S * power_factor * feed_factor * distance_factor * speed_factor
}

/// `n` evenly spaced points over `[0, end]` inclusive.
#[allow(clippy::cast_precision_loss)]
fn linspace(end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = end / (n - 1) as f64;
            (0..n).map(|i| i as f64 * step).collect()
        }
    }
}

/// Longest run the simulator generates (one day).
pub const MAX_RUN_DURATION_S: f64 = 86_400.0;
/// Most readings a single run may hold.
pub const MAX_SAMPLES_PER_RUN: usize = 1_000_000;

/// Number of samples for a run: `floor(duration * rate)`.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` for non-finite or negative inputs, a
/// duration above [`MAX_RUN_DURATION_S`], or more than
/// [`MAX_SAMPLES_PER_RUN`] readings.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sample_count(duration_seconds: f64, sample_rate_hz: f64) -> Result<usize> {
    if !(duration_seconds.is_finite() && duration_seconds >= 0.0) {
        return Err(Error::InvalidConfig(format!(
            "duration_seconds = {duration_seconds} must be a non-negative finite number"
        )));
    }
    if duration_seconds > MAX_RUN_DURATION_S {
        return Err(Error::out_of_range(
            "duration_seconds",
            duration_seconds,
            0.0,
            MAX_RUN_DURATION_S,
        ));
    }
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "sample_rate_hz = {sample_rate_hz} must be a positive finite number"
        )));
    }
    let samples = (duration_seconds * sample_rate_hz).floor();
    if samples > MAX_SAMPLES_PER_RUN as f64 {
        return Err(Error::InvalidConfig(format!(
            "duration_seconds × sample_rate_hz = {samples} readings exceeds the per-run limit of {MAX_SAMPLES_PER_RUN}"
        )));
    }
    Ok(samples as usize)
}

/// Generates a run's full channel time series.
#[derive(Debug, Clone)]
pub struct SensorSimulator {
    baselines: ProcessBaselines,
    noise: NoiseEngine,
    rng: StdRng,
}

/// Offset that decorrelates the noise stream from the process-dynamics stream.
const NOISE_STREAM: u64 = 0x6E6F_6973_6521_0001;

impl SensorSimulator {
    /// Create a simulator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if baselines or noise config are invalid.
    pub fn new(baselines: ProcessBaselines, noise_config: NoiseConfig, seed: u64) -> Result<Self> {
        baselines.validate()?;
        Ok(Self {
            baselines,
            noise: NoiseEngine::new(noise_config, seed ^ NOISE_STREAM)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Process baselines shared by every generated run.
    #[must_use]
    pub const fn baselines(&self) -> &ProcessBaselines {
        &self.baselines
    }

    /// Noise engine driving sensor noise and OOD decisions.
    #[must_use]
    pub const fn noise(&self) -> &NoiseEngine {
        &self.noise
    }

    /// Draw whether the next run is out-of-distribution.
    pub fn decide_ood(&mut self) -> bool {
        self.noise.ood_decision()
    }

    /// Generate `floor(duration * rate)` readings for one run.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an invalid duration or sample rate.
    pub fn generate_run(
        &mut self,
        setup: &SetupParams,
        duration_seconds: f64,
        sample_rate_hz: f64,
        start_time: DateTime<Utc>,
        is_ood: bool,
    ) -> Result<Vec<SensorReading>> {
        let num_samples = sample_count(duration_seconds, sample_rate_hz)?;
        self.noise.reset_drift();

        let b = self.baselines;
        let substrate = setup.substrate_material();
        let coating = setup.coating_material();

        let ood_factor = if is_ood { self.noise.ood_shift() } else { 1.0 };
        let batch_factor = self.noise.batch_variation(1.0);

        let plasma_temp_base = b.plasma_temp_c * substrate.temp_factor() * coating.temp_factor();
        let plasma_power_base = b.plasma_power_kw * substrate.power_factor();
        let powder_feed_base = b.powder_feed_rate_g_min
            * coating.feed_factor()
            * (setup.target_thickness_um() / NOMINAL_THICKNESS_UM)
            * batch_factor;

        let period = self.rng.gen_range(OSCILLATION_PERIOD_S.0..OSCILLATION_PERIOD_S.1);

        let times = linspace(duration_seconds, num_samples);
        let mut readings = Vec::with_capacity(num_samples);
        let mut previous_t = 0.0;

        for &t in &times {
            let elapsed_minutes = (t - previous_t) / 60.0;
            previous_t = t;
            let mut drift = [0.0; DRIFTING_CHANNELS.len()];
            for (slot, channel) in drift.iter_mut().zip(DRIFTING_CHANNELS) {
                *slot = 1.0 + self.noise.drift(channel, elapsed_minutes);
            }
            let [power_drift, temp_drift, feed_drift, gas_drift] = drift;

            let osc = OSCILLATION_AMPLITUDE.mul_add((2.0 * PI * t / period).sin(), 1.0);

            let plasma_power = plasma_power_base * osc * ood_factor * power_drift;
            // Temperature follows power
            let plasma_temp = plasma_temp_base
                * osc
                * ood_factor
                * 0.5f64.mul_add(plasma_power / plasma_power_base, 0.5)
                * temp_drift;

            let primary_gas =
                b.primary_gas_flow_slpm * gaussian(&mut self.rng, 1.0, 0.01) * gas_drift;
            let secondary_gas = b.secondary_gas_flow_slpm * gaussian(&mut self.rng, 1.0, 0.01);

            let powder_feed = powder_feed_base * osc * ood_factor * feed_drift;
            let carrier_gas =
                b.carrier_gas_flow_slpm * 0.2f64.mul_add(powder_feed / powder_feed_base, 0.9);

            let substrate_temp =
                b.substrate_temp_c + SUBSTRATE_RISE_C * (1.0 - (-t / SUBSTRATE_TIME_CONSTANT_S).exp());

            let spray_distance = setup.spray_distance_mm()
                * 0.02f64.mul_add((2.0 * PI * t / ROBOT_PERIOD_S).sin(), 1.0);

            let chamber_pressure = b.chamber_pressure_mbar * gaussian(&mut self.rng, 1.0, 0.002);
            let ambient_temp = 0.5f64.mul_add((2.0 * PI * t / 120.0).sin(), b.ambient_temp_c);
            let ambient_humidity = 2.0f64.mul_add((2.0 * PI * t / 180.0).sin(), b.ambient_humidity_pct);

            let deposition = deposition_rate(
                plasma_power,
                powder_feed,
                spray_distance,
                setup.robot_speed_mm_s(),
            );

            readings.push(SensorReading {
                timestamp: offset_time(start_time, t)?,
                time_seconds: t,
                plasma_temp_c: self.noise.add_noise(plasma_temp),
                plasma_power_kw: self.noise.add_noise(plasma_power),
                primary_gas_flow_slpm: self.noise.add_noise(primary_gas),
                secondary_gas_flow_slpm: self.noise.add_noise(secondary_gas),
                powder_feed_rate_g_min: self.noise.add_noise(powder_feed),
                carrier_gas_flow_slpm: self.noise.add_noise(carrier_gas),
                substrate_temp_c: self.noise.add_noise(substrate_temp),
                spray_distance_mm: self.noise.add_noise(spray_distance),
                chamber_pressure_mbar: self.noise.add_noise(chamber_pressure),
                ambient_temp_c: self.noise.add_noise(ambient_temp),
                ambient_humidity_pct: self.noise.add_noise(ambient_humidity),
                deposition_rate_um_s: self.noise.add_noise(deposition),
            });
        }

        Ok(readings)
    }

    /// Reseed both the dynamics and noise streams.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.noise.reseed(seed ^ NOISE_STREAM);
    }
}

/// `start` shifted by `seconds`, rounded to the microsecond.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` when the result leaves chrono's
/// representable range.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn offset_time(start: DateTime<Utc>, seconds: f64) -> Result<DateTime<Utc>> {
    let micros = (seconds * 1e6).round();
    if micros.is_finite() && micros.abs() < i64::MAX as f64 {
        if let Some(time) = start.checked_add_signed(Duration::microseconds(micros as i64)) {
            return Ok(time);
        }
    }
    Err(Error::InvalidConfig(format!(
        "timestamp {start} + {seconds} s is outside the representable time range"
    )))
}
