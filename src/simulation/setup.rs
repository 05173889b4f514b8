//! Static run setup: substrate and coating materials plus robot geometry.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Substrate material being coated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Substrate {
    /// Steel
    Steel,
    /// Aluminum
    Aluminum,
    /// Titanium
    Titanium,
}

impl Substrate {
    /// All substrates, in draw order.
    pub const ALL: [Self; 3] = [Self::Steel, Self::Aluminum, Self::Titanium];

    /// Multiplier on plasma temperature.
    #[must_use]
    pub const fn temp_factor(self) -> f64 {
        match self {
            Self::Steel => 1.0,
            Self::Aluminum => 0.85,
            Self::Titanium => 1.1,
        }
    }

    /// Multiplier on plasma power.
    #[must_use]
    pub const fn power_factor(self) -> f64 {
        match self {
            Self::Steel => 1.0,
            Self::Aluminum => 0.9,
            Self::Titanium => 1.15,
        }
    }

    /// Baseline bond strength (MPa).
    #[must_use]
    pub const fn base_adhesion_mpa(self) -> f64 {
        match self {
            Self::Steel => 45.0,
            Self::Aluminum => 35.0,
            Self::Titanium => 55.0,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steel => "steel",
            Self::Aluminum => "aluminum",
            Self::Titanium => "titanium",
        }
    }
}

impl fmt::Display for Substrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Substrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "unknown substrate material '{s}', expected one of steel, aluminum, titanium"
                ))
            })
    }
}

/// Coating powder material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coating {
    /// Yttria-stabilized zirconia
    #[serde(rename = "YSZ")]
    Ysz,
    /// Alumina
    #[serde(rename = "alumina")]
    Alumina,
    /// Chromium
    #[serde(rename = "chromium")]
    Chromium,
}

impl Coating {
    /// All coatings, in draw order.
    pub const ALL: [Self; 3] = [Self::Ysz, Self::Alumina, Self::Chromium];

    /// Multiplier on powder feed rate.
    #[must_use]
    pub const fn feed_factor(self) -> f64 {
        match self {
            Self::Ysz => 1.0,
            Self::Alumina => 0.9,
            Self::Chromium => 1.1,
        }
    }

    /// Multiplier on plasma temperature.
    #[must_use]
    pub const fn temp_factor(self) -> f64 {
        match self {
            Self::Ysz => 1.0,
            Self::Alumina => 0.95,
            Self::Chromium => 1.05,
        }
    }

    /// Baseline porosity (%).
    #[must_use]
    pub const fn base_porosity_pct(self) -> f64 {
        match self {
            Self::Ysz => 5.0,
            Self::Alumina => 4.0,
            Self::Chromium => 3.0,
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ysz => "YSZ",
            Self::Alumina => "alumina",
            Self::Chromium => "chromium",
        }
    }
}

impl fmt::Display for Coating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Coating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "unknown coating material '{s}', expected one of YSZ, alumina, chromium"
                ))
            })
    }
}

/// Allowed target thickness (µm).
pub const TARGET_THICKNESS_RANGE: (f64, f64) = (200.0, 400.0);
/// Allowed spray distance (mm).
pub const SPRAY_DISTANCE_RANGE: (f64, f64) = (100.0, 140.0);
/// Allowed robot traverse speed (mm/s).
pub const ROBOT_SPEED_RANGE: (f64, f64) = (400.0, 600.0);

/// Immutable setup parameters for one coating run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    substrate_material: Substrate,
    coating_material: Coating,
    target_thickness_um: f64,
    spray_distance_mm: f64,
    robot_speed_mm_s: f64,
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            substrate_material: Substrate::Steel,
            coating_material: Coating::Ysz,
            target_thickness_um: 300.0,
            spray_distance_mm: 120.0,
            robot_speed_mm_s: 500.0,
        }
    }
}

impl SetupParams {
    /// Create validated setup parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a numeric value is outside its
    /// declared range.
    pub fn new(
        substrate_material: Substrate,
        coating_material: Coating,
        target_thickness_um: f64,
        spray_distance_mm: f64,
        robot_speed_mm_s: f64,
    ) -> Result<Self> {
        check_range("targetThicknessUm", target_thickness_um, TARGET_THICKNESS_RANGE)?;
        check_range("sprayDistanceMm", spray_distance_mm, SPRAY_DISTANCE_RANGE)?;
        check_range("robotSpeedMmS", robot_speed_mm_s, ROBOT_SPEED_RANGE)?;
        Ok(Self {
            substrate_material,
            coating_material,
            target_thickness_um,
            spray_distance_mm,
            robot_speed_mm_s,
        })
    }

    /// Draw a setup uniformly over materials and numeric ranges.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            substrate_material: Substrate::ALL[rng.gen_range(0..Substrate::ALL.len())],
            coating_material: Coating::ALL[rng.gen_range(0..Coating::ALL.len())],
            target_thickness_um: rng.gen_range(TARGET_THICKNESS_RANGE.0..TARGET_THICKNESS_RANGE.1),
            spray_distance_mm: rng.gen_range(SPRAY_DISTANCE_RANGE.0..SPRAY_DISTANCE_RANGE.1),
            robot_speed_mm_s: rng.gen_range(ROBOT_SPEED_RANGE.0..ROBOT_SPEED_RANGE.1),
        }
    }

    /// Substrate material.
    #[must_use]
    pub const fn substrate_material(&self) -> Substrate {
        self.substrate_material
    }

    /// Coating material.
    #[must_use]
    pub const fn coating_material(&self) -> Coating {
        self.coating_material
    }

    /// Target coating thickness (µm).
    #[must_use]
    pub const fn target_thickness_um(&self) -> f64 {
        self.target_thickness_um
    }

    /// Nozzle-to-substrate distance (mm).
    #[must_use]
    pub const fn spray_distance_mm(&self) -> f64 {
        self.spray_distance_mm
    }

    /// Robot traverse speed (mm/s).
    #[must_use]
    pub const fn robot_speed_mm_s(&self) -> f64 {
        self.robot_speed_mm_s
    }
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::out_of_range(field, value, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_material_parsing() {
        assert_eq!("titanium".parse::<Substrate>().unwrap(), Substrate::Titanium);
        assert_eq!("YSZ".parse::<Coating>().unwrap(), Coating::Ysz);
        assert!("copper".parse::<Substrate>().is_err());
        assert!("ysz".parse::<Coating>().is_err());
    }

    #[test]
    fn test_setup_rejects_out_of_range() {
        let err = SetupParams::new(Substrate::Steel, Coating::Ysz, 500.0, 120.0, 500.0)
            .unwrap_err();
        assert!(err.to_string().contains("targetThicknessUm"));

        assert!(SetupParams::new(Substrate::Steel, Coating::Ysz, 300.0, 99.0, 500.0).is_err());
        assert!(SetupParams::new(Substrate::Steel, Coating::Ysz, 300.0, 120.0, f64::NAN).is_err());
    }

    #[test]
    fn test_setup_accepts_range_bounds() {
        assert!(SetupParams::new(Substrate::Aluminum, Coating::Chromium, 200.0, 140.0, 600.0).is_ok());
    }

    #[test]
    fn test_random_setup_within_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let setup = SetupParams::random(&mut rng);
            assert!((200.0..400.0).contains(&setup.target_thickness_um()));
            assert!((100.0..140.0).contains(&setup.spray_distance_mm()));
            assert!((400.0..600.0).contains(&setup.robot_speed_mm_s()));
        }
    }

    #[test]
    fn test_setup_serializes_camel_case() {
        let json = serde_json::to_value(SetupParams::default()).unwrap();
        assert_eq!(json["substrateMaterial"], "steel");
        assert_eq!(json["coatingMaterial"], "YSZ");
        assert_eq!(json["targetThicknessUm"], 300.0);
    }
}
