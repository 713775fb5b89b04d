// Seawatch Sim - Drone preset
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Surface drone patrolling off Kribi.
//!
//! Water-quality channels follow a diurnal cycle inside hard limits. The
//! drone patrols a waypoint loop and runs on a battery. Ballast water
//! discharges show up as parabolic excursions on all water channels.

use crate::anomalies::AnomalyConfig;
use crate::motion::MotionConfig;
use crate::power::PowerConfig;
use crate::signal::SignalModel;
use crate::simulation::{ChannelModel, Positioning, SimulationConfig};
use seawatch::{Channel, Unit};

/// Water temperature, °C.
pub fn temperature() -> SignalModel {
    SignalModel::new(28.0, 2.0, 0.5).with_limits(20.0, 36.0)
}

/// Turbidity, NTU.
pub fn turbidity() -> SignalModel {
    SignalModel::new(35.0, 5.0, 2.0).with_limits(0.0, 60.0)
}

/// Conductivity, mS/cm.
pub fn conductivity() -> SignalModel {
    SignalModel::new(10.0, 1.0, 0.3).with_limits(5.0, 18.0)
}

/// pH.
pub fn ph() -> SignalModel {
    SignalModel::new(7.0, 0.2, 0.1).with_limits(6.0, 8.2)
}

/// Dissolved oxygen, mg/L.
pub fn dissolved_oxygen() -> SignalModel {
    SignalModel::new(6.0, 0.5, 0.2).with_limits(3.0, 10.0)
}

/// Full drone preset.
pub fn simulation_config() -> SimulationConfig {
    SimulationConfig {
        unit: Unit::Drone,
        seed: None,
        channels: vec![
            ChannelModel::new(Channel::Temperature, temperature()),
            ChannelModel::new(Channel::Turbidity, turbidity()),
            ChannelModel::new(Channel::Conductivity, conductivity()),
            ChannelModel::new(Channel::Ph, ph()),
            ChannelModel::new(Channel::DissolvedOxygen, dissolved_oxygen()),
        ],
        anomaly: AnomalyConfig::ballast(),
        positioning: Positioning::Patrol(MotionConfig::kribi_patrol()),
        power: PowerConfig::drone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_is_valid() {
        let config = simulation_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.channels.len(), 5);
    }

    #[test]
    fn test_limits_cover_band() {
        for model in [temperature(), turbidity(), conductivity(), ph(), dissolved_oxygen()] {
            let (low, high) = model.band();
            let (min, max) = model.limits.unwrap();
            assert!(min <= low && high <= max, "{:?}", model);
        }
    }
}
