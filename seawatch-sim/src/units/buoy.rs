// Seawatch Sim - Buoy preset
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Moored buoy at the Kribi station.
//!
//! Water channels follow the diurnal cycle. Pressure, waves and current
//! follow the 12.4 h tide. Humidity runs in anti-phase with air
//! temperature. The buoy charges from a solar panel and is hit by storms.

use crate::anomalies::AnomalyConfig;
use crate::motion::GeoPoint;
use crate::power::PowerConfig;
use crate::signal::SignalModel;
use crate::simulation::{ChannelModel, Positioning, SimulationConfig};
use seawatch::{Channel, Unit};

/// Mooring position.
pub const MOORING: GeoPoint = GeoPoint::new(4.2105, 6.4375);

/// Channel models of the buoy, in wire order.
pub fn channel_models() -> Vec<ChannelModel> {
    vec![
        ChannelModel::new(Channel::Temperature, SignalModel::new(26.0, 2.0, 0.5)),
        ChannelModel::new(Channel::Turbidity, SignalModel::new(8.0, 3.0, 1.0)),
        ChannelModel::new(Channel::Conductivity, SignalModel::new(9.0, 1.0, 0.2)),
        ChannelModel::new(Channel::Ph, SignalModel::new(7.35, 0.15, 0.05)),
        ChannelModel::new(Channel::DissolvedOxygen, SignalModel::new(5.65, 0.5, 0.1)),
        ChannelModel::new(Channel::Pressure, SignalModel::tidal(1.5, 0.5, 0.1)),
        ChannelModel::new(Channel::WaveHeight, SignalModel::tidal(0.8, 0.4, 0.1)),
        ChannelModel::new(Channel::CurrentSpeed, SignalModel::tidal(0.35, 0.15, 0.05)),
        ChannelModel::new(Channel::AirTemperature, SignalModel::new(28.0, 3.0, 1.0)),
        ChannelModel::new(Channel::WindSpeed, SignalModel::new(2.0, 1.5, 0.5)),
        ChannelModel::new(Channel::Humidity, SignalModel::new(80.0, 7.5, 5.0))
            .anti_phase_of(Channel::AirTemperature),
    ]
}

/// Full buoy preset.
pub fn simulation_config() -> SimulationConfig {
    SimulationConfig {
        unit: Unit::Buoy,
        seed: None,
        channels: channel_models(),
        anomaly: AnomalyConfig::storm(),
        positioning: Positioning::Fixed { position: MOORING },
        power: PowerConfig::buoy(),
    }
}
