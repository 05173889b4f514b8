//! Closed enumeration of monitored sensor channels.

use serde::{Deserialize, Serialize};

/// A physical or derived quantity sampled once per timestep.
///
/// The declaration order is the canonical channel order used wherever a
/// fixed-size per-channel array is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Plasma jet temperature (°C)
    PlasmaTempC,
    /// Torch electrical power (kW)
    PlasmaPowerKw,
    /// Primary (argon) gas flow (SLPM)
    PrimaryGasFlowSlpm,
    /// Secondary (hydrogen) gas flow (SLPM)
    SecondaryGasFlowSlpm,
    /// Powder feed rate (g/min)
    PowderFeedRateGMin,
    /// Powder carrier gas flow (SLPM)
    CarrierGasFlowSlpm,
    /// Substrate surface temperature (°C)
    SubstrateTempC,
    /// Nozzle-to-substrate distance (mm)
    SprayDistanceMm,
    /// Chamber pressure (mbar)
    ChamberPressureMbar,
    /// Ambient temperature (°C)
    AmbientTempC,
    /// Ambient relative humidity (%)
    AmbientHumidityPct,
    /// Derived instantaneous deposition rate (µm/s)
    DepositionRateUmS,
}

impl Channel {
    /// Number of monitored channels.
    pub const COUNT: usize = 12;

    /// All channels in canonical order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::PlasmaTempC,
        Self::PlasmaPowerKw,
        Self::PrimaryGasFlowSlpm,
        Self::SecondaryGasFlowSlpm,
        Self::PowderFeedRateGMin,
        Self::CarrierGasFlowSlpm,
        Self::SubstrateTempC,
        Self::SprayDistanceMm,
        Self::ChamberPressureMbar,
        Self::AmbientTempC,
        Self::AmbientHumidityPct,
        Self::DepositionRateUmS,
    ];

    /// Position of this channel in [`Channel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical snake_case name, used as the feature-name prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlasmaTempC => "plasma_temp_c",
            Self::PlasmaPowerKw => "plasma_power_kw",
            Self::PrimaryGasFlowSlpm => "primary_gas_flow_slpm",
            Self::SecondaryGasFlowSlpm => "secondary_gas_flow_slpm",
            Self::PowderFeedRateGMin => "powder_feed_rate_g_min",
            Self::CarrierGasFlowSlpm => "carrier_gas_flow_slpm",
            Self::SubstrateTempC => "substrate_temp_c",
            Self::SprayDistanceMm => "spray_distance_mm",
            Self::ChamberPressureMbar => "chamber_pressure_mbar",
            Self::AmbientTempC => "ambient_temp_c",
            Self::AmbientHumidityPct => "ambient_humidity_pct",
            Self::DepositionRateUmS => "deposition_rate_um_s",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Channel::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Channel::COUNT);
    }

    #[test]
    fn test_serde_name_matches_canonical_name() {
        let json = serde_json::to_string(&Channel::PowderFeedRateGMin).unwrap();
        assert_eq!(json, "\"powder_feed_rate_g_min\"");
    }
}
