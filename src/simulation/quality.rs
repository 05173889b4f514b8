//! Physics-inspired quality model: continuous coating metrics and sampled
//! defects derived from a completed reading sequence.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::noise::gaussian;
use super::sensors::{channel_series, SensorReading};
use super::setup::SetupParams;
use crate::stats::{self, safe_div};
use crate::{Error, Result};

/// Empirical optimum particle temperature (°C).
const OPTIMAL_PARTICLE_TEMP_C: f64 = 8400.0;
/// Empirical optimum particle velocity (m/s).
const OPTIMAL_PARTICLE_VELOCITY_M_S: f64 = 200.0;
/// Empirical optimum spray distance (mm).
const OPTIMAL_SPRAY_DISTANCE_MM: f64 = 120.0;
/// Centre of the substrate bonding window (°C).
const BONDING_TEMP_C: f64 = 275.0;
/// Defect probabilities are scaled by this for out-of-distribution runs.
const OOD_DEFECT_MULTIPLIER: f64 = 1.5;

/// Overall quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    /// Excellent
    A,
    /// Good
    B,
    /// Acceptable
    C,
    /// Rejected
    #[serde(rename = "reject")]
    Reject,
}

impl QualityGrade {
    /// All grades, best first.
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::Reject];

    /// Label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::Reject => "reject",
        }
    }

    /// Grade for a point score from the four metric bands.
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        match score {
            9.. => Self::A,
            6..=8 => Self::B,
            3..=5 => Self::C,
            _ => Self::Reject,
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final quality outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Coating thickness (µm)
    pub thickness_um: f64,
    /// Deposition coefficient of variation (%), lower is better
    pub thickness_uniformity_pct: f64,
    /// Porosity (%), lower is better
    pub porosity_pct: f64,
    /// Bond strength (MPa), higher is better
    pub adhesion_strength_mpa: f64,
    /// Surface roughness Ra (µm), lower is better
    pub surface_roughness_ra: f64,
    /// Coating separated from substrate
    pub has_delamination: bool,
    /// Coating cracked
    pub has_cracks: bool,
    /// Coating contains voids
    pub has_voids: bool,
}

impl QualityMetrics {
    /// Any critical defect present.
    #[must_use]
    pub const fn defect_flag(&self) -> bool {
        self.has_delamination || self.has_cracks || self.has_voids
    }

    /// Points from the porosity, uniformity, adhesion and roughness bands.
    #[must_use]
    pub fn score(&self) -> u32 {
        let porosity = band_below(self.porosity_pct, [3.0, 5.0, 8.0]);
        let uniformity = band_below(self.thickness_uniformity_pct, [3.0, 5.0, 8.0]);
        let adhesion = if self.adhesion_strength_mpa > 50.0 {
            3
        } else if self.adhesion_strength_mpa > 40.0 {
            2
        } else {
            u32::from(self.adhesion_strength_mpa > 30.0)
        };
        let roughness = if self.surface_roughness_ra < 3.0 {
            2
        } else {
            u32::from(self.surface_roughness_ra < 5.0)
        };
        porosity + uniformity + adhesion + roughness
    }

    /// Grade derived purely from the fields: any defect rejects.
    #[must_use]
    pub fn quality_grade(&self) -> QualityGrade {
        if self.defect_flag() {
            QualityGrade::Reject
        } else {
            QualityGrade::from_score(self.score())
        }
    }
}

/// 3/2/1 points for a value under the first/second/third limit.
fn band_below(value: f64, [first, second, third]: [f64; 3]) -> u32 {
    if value < first {
        3
    } else if value < second {
        2
    } else {
        u32::from(value < third)
    }
}

/// Latent process states inferred from the readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessState {
    /// Mean in-flight particle temperature (°C)
    pub particle_temp_c: f64,
    /// Mean particle velocity (m/s)
    pub particle_velocity_m_s: f64,
    /// Splat formation quality in `[0, 1]`
    pub splat_quality: f64,
    /// Thermal stress index, higher is worse
    pub thermal_stress: f64,
}

impl ProcessState {
    /// Derive latent states from a non-empty reading sequence.
    #[must_use]
    pub fn from_readings(readings: &[SensorReading]) -> Self {
        let plasma_temp = stats::mean(&channel_series(readings, Channel::PlasmaTempC));
        let plasma_power = stats::mean(&channel_series(readings, Channel::PlasmaPowerKw));
        let powder_feed = stats::mean(&channel_series(readings, Channel::PowderFeedRateGMin));
        let spray_distance = stats::mean(&channel_series(readings, Channel::SprayDistanceMm));
        let substrate = channel_series(readings, Channel::SubstrateTempC);
        let deposition = stats::mean(&channel_series(readings, Channel::DepositionRateUmS));

        // Particles reach 60-80% of plasma temperature depending on power
        let efficiency = 0.1f64.mul_add(plasma_power / 55.0 - 1.0, 0.7);
        let particle_temp_c = plasma_temp * efficiency;

        // More power accelerates, more powder loads the jet
        let feed_factor = safe_div(50.0, powder_feed).max(0.0);
        let particle_velocity_m_s =
            OPTIMAL_PARTICLE_VELOCITY_M_S * (plasma_power / 55.0) * feed_factor.sqrt();

        let splat_quality = splat_quality(particle_temp_c, particle_velocity_m_s, spray_distance);

        let temp_gradient = stats::max(&substrate) - stats::min(&substrate);
        let thermal_stress = temp_gradient * deposition / 100.0;

        Self {
            particle_temp_c,
            particle_velocity_m_s,
            splat_quality,
            thermal_stress,
        }
    }
}

/// Weighted closeness to the temperature, velocity and distance optima.
fn splat_quality(particle_temp: f64, particle_velocity: f64, spray_distance: f64) -> f64 {
    let temp_quality = 1.0 - (particle_temp - OPTIMAL_PARTICLE_TEMP_C).abs() / OPTIMAL_PARTICLE_TEMP_C;
    let velocity_quality = 1.0
        - (particle_velocity - OPTIMAL_PARTICLE_VELOCITY_M_S).abs() / OPTIMAL_PARTICLE_VELOCITY_M_S;
    let distance_quality =
        1.0 - (spray_distance - OPTIMAL_SPRAY_DISTANCE_MM).abs() / OPTIMAL_SPRAY_DISTANCE_MM;
    0.3f64
        .mul_add(distance_quality, 0.4f64.mul_add(temp_quality, 0.3 * velocity_quality))
        .clamp(0.0, 1.0)
}

/// Per-defect Bernoulli probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefectRisk {
    /// Delamination probability
    pub delamination: f64,
    /// Cracking probability
    pub cracks: f64,
    /// Void probability
    pub voids: f64,
}

impl DefectRisk {
    /// Additive risk models, each clipped to `[0, 1]`.
    #[must_use]
    pub fn assess(state: &ProcessState, thickness: f64, porosity: f64, adhesion: f64) -> Self {
        let adhesion_deficit = ((40.0 - adhesion) / 40.0).max(0.0);
        let delamination = 0.1f64.mul_add(adhesion_deficit, 0.02 + state.thermal_stress * 0.5);

        let thickness_excess = ((thickness - 300.0) / 300.0).max(0.0) * 0.1;
        let cracks = 0.02 + state.thermal_stress * 0.3 + thickness_excess;

        let porosity_excess = ((porosity - 5.0) / 10.0).max(0.0) * 0.15;
        let splat_deficit = (0.7 - state.splat_quality).max(0.0) * 0.1;
        let voids = 0.02 + porosity_excess + splat_deficit;

        Self {
            delamination: delamination.clamp(0.0, 1.0),
            cracks: cracks.clamp(0.0, 1.0),
            voids: voids.clamp(0.0, 1.0),
        }
    }

    /// Scale every probability for an out-of-distribution run, then clip.
    #[must_use]
    pub fn for_ood(self) -> Self {
        let scale = |p: f64| (p * OOD_DEFECT_MULTIPLIER).clamp(0.0, 1.0);
        Self {
            delamination: scale(self.delamination),
            cracks: scale(self.cracks),
            voids: scale(self.voids),
        }
    }
}

/// Seeded quality evaluator.
#[derive(Debug, Clone)]
pub struct QualityModel {
    rng: StdRng,
}

impl QualityModel {
    /// Create a quality model with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Reseed the stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Compute metrics and sample defects for a completed run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Computation` if `readings` is empty.
    pub fn evaluate(
        &mut self,
        setup: &SetupParams,
        readings: &[SensorReading],
        is_ood: bool,
    ) -> Result<QualityMetrics> {
        if readings.is_empty() {
            return Err(Error::Computation(
                "cannot evaluate quality of a run with zero readings".to_string(),
            ));
        }

        let state = ProcessState::from_readings(readings);
        let deposition = channel_series(readings, Channel::DepositionRateUmS);
        let substrate = channel_series(readings, Channel::SubstrateTempC);
        let spray_distance = channel_series(readings, Channel::SprayDistanceMm);

        let thickness = self.thickness(&deposition, readings);
        let uniformity = self.uniformity(&deposition);
        let porosity = self.porosity(setup, &state);
        let adhesion = self.adhesion(setup, &substrate, state.thermal_stress);
        let roughness = self.roughness(state.splat_quality, &spray_distance);

        let mut risk = DefectRisk::assess(&state, thickness, porosity, adhesion);
        if is_ood {
            risk = risk.for_ood();
        }

        let has_delamination = self.rng.gen::<f64>() < risk.delamination;
        let has_cracks = self.rng.gen::<f64>() < risk.cracks;
        let has_voids = self.rng.gen::<f64>() < risk.voids;

        tracing::debug!(
            splat_quality = state.splat_quality,
            thermal_stress = state.thermal_stress,
            thickness,
            porosity,
            "quality evaluated"
        );

        Ok(QualityMetrics {
            thickness_um: thickness,
            thickness_uniformity_pct: uniformity,
            porosity_pct: porosity,
            adhesion_strength_mpa: adhesion,
            surface_roughness_ra: roughness,
            has_delamination,
            has_cracks,
            has_voids,
        })
    }

    /// Time-integral of deposition rate with 2% multiplicative noise.
    #[allow(clippy::cast_precision_loss)]
    fn thickness(&mut self, deposition: &[f64], readings: &[SensorReading]) -> f64 {
        let (first, last) = (readings[0].time_seconds, readings[readings.len() - 1].time_seconds);
        let dt = (last - first) / readings.len() as f64;
        let total = deposition.iter().sum::<f64>() * dt;
        (total * gaussian(&mut self.rng, 1.0, 0.02)).max(0.0)
    }

    /// Coefficient of variation of deposition rate (%), with noise.
    fn uniformity(&mut self, deposition: &[f64]) -> f64 {
        let cv = safe_div(stats::std_population(deposition), stats::mean(deposition)) * 100.0;
        gaussian(&mut self.rng, cv, 0.5).max(0.0)
    }

    fn porosity(&mut self, setup: &SetupParams, state: &ProcessState) -> f64 {
        let base = setup.coating_material().base_porosity_pct();
        let splat_factor = 2.0 - state.splat_quality;
        let velocity_factor = 1.0
            + (state.particle_velocity_m_s - OPTIMAL_PARTICLE_VELOCITY_M_S).abs()
                / OPTIMAL_PARTICLE_VELOCITY_M_S;
        gaussian(&mut self.rng, base * splat_factor * velocity_factor, 0.5).clamp(0.0, 20.0)
    }

    fn adhesion(&mut self, setup: &SetupParams, substrate: &[f64], thermal_stress: f64) -> f64 {
        let base = setup.substrate_material().base_adhesion_mpa();
        let temp_factor = 1.0 - (stats::mean(substrate) - BONDING_TEMP_C).abs() / BONDING_TEMP_C;
        let stress_factor = (1.0 - thermal_stress * 0.2).max(0.5);
        let adhesion = base * 0.3f64.mul_add(temp_factor, 0.7) * stress_factor;
        gaussian(&mut self.rng, adhesion, 2.0).max(10.0)
    }

    fn roughness(&mut self, splat_quality: f64, spray_distance: &[f64]) -> f64 {
        let splat_factor = 2.0 - splat_quality;
        let variation = safe_div(stats::std_population(spray_distance), stats::mean(spray_distance));
        let distance_factor = variation.mul_add(2.0, 1.0);
        gaussian(&mut self.rng, 5.0 * splat_factor * distance_factor, 0.3).max(1.0)
    }
}
