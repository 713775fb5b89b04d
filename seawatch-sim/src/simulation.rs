// Seawatch Sim - Unit simulation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-unit simulation state.
//!
//! A [`UnitSimulation`] owns everything that evolves between ticks: resolved
//! signal phases, the anomaly injector, the motion model, the power model
//! and the RNG. One call to [`UnitSimulation::tick`] yields a complete value
//! set for the unit.

use crate::anomalies::{AnomalyConfig, AnomalyInjector, AnomalyProfile, AnomalyTransition, ChannelEffect};
use crate::error::{Result, SimError};
use crate::motion::{GeoPoint, MotionConfig, MotionModel};
use crate::power::{PowerConfig, PowerModel};
use crate::signal::{SignalModel, SignalState};
use crate::units;
use chrono::{DateTime, Utc};
use rand::prelude::*;
use seawatch::clock::seconds_between;
use seawatch::{Channel, ChannelValues, Unit};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Signal model bound to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelModel {
    /// Output channel.
    pub channel: Channel,
    /// Signal model.
    pub model: SignalModel,
    /// Lock this channel's phase half a cycle away from another channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_phase_of: Option<Channel>,
}

impl ChannelModel {
    /// Create a channel model.
    pub fn new(channel: Channel, model: SignalModel) -> Self {
        Self {
            channel,
            model,
            anti_phase_of: None,
        }
    }

    /// Run in anti-phase with `source`.
    pub fn anti_phase_of(mut self, source: Channel) -> Self {
        self.anti_phase_of = Some(source);
        self
    }
}

/// Where the unit's position comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Positioning {
    /// Moored at a fixed point.
    Fixed { position: GeoPoint },
    /// Patrolling a waypoint loop.
    Patrol(MotionConfig),
}

/// Simulation configuration for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated unit.
    pub unit: Unit,
    /// RNG seed (`None` = from entropy).
    #[serde(default)]
    pub seed: Option<u64>,
    /// Channel signal models.
    pub channels: Vec<ChannelModel>,
    /// Anomaly events.
    pub anomaly: AnomalyConfig,
    /// Position source.
    pub positioning: Positioning,
    /// Battery behaviour.
    pub power: PowerConfig,
}

impl SimulationConfig {
    /// Drone preset.
    pub fn drone() -> Self {
        units::drone::simulation_config()
    }

    /// Buoy preset.
    pub fn buoy() -> Self {
        units::buoy::simulation_config()
    }

    /// Preset for a unit.
    pub fn for_unit(unit: Unit) -> Self {
        match unit {
            Unit::Drone => Self::drone(),
            Unit::Buoy => Self::buoy(),
        }
    }

    /// Fix the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the anomaly configuration.
    pub fn with_anomaly(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = anomaly;
        self
    }

    /// Replace the model of a channel (or add it).
    pub fn with_model(mut self, channel: Channel, model: SignalModel) -> Self {
        match self.channels.iter_mut().find(|c| c.channel == channel) {
            Some(existing) => existing.model = model,
            None => self.channels.push(ChannelModel::new(channel, model)),
        }
        self
    }

    /// Model of a channel, if any.
    pub fn model(&self, channel: Channel) -> Option<&SignalModel> {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| &c.model)
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        for (i, c) in self.channels.iter().enumerate() {
            if !self.unit.reports(c.channel) {
                return Err(SimError::ForeignChannel {
                    unit: self.unit,
                    channel: c.channel,
                });
            }
            if self.channels[..i].iter().any(|o| o.channel == c.channel) {
                return Err(SimError::DuplicateChannel(c.channel));
            }
            c.model.check().map_err(|reason| SimError::InvalidChannel {
                channel: c.channel,
                reason,
            })?;
            if let Some(source) = c.anti_phase_of {
                let resolvable = self
                    .channels
                    .iter()
                    .any(|o| o.channel == source && o.anti_phase_of.is_none());
                if !resolvable {
                    return Err(SimError::MissingPhaseSource {
                        channel: c.channel,
                        source_channel: source,
                    });
                }
            }
        }
        self.anomaly.check().map_err(SimError::InvalidAnomaly)?;
        if let Positioning::Patrol(motion) = &self.positioning {
            motion.check().map_err(SimError::InvalidMotion)?;
        }
        self.power.check().map_err(SimError::InvalidPower)
    }
}

/// Running simulation of one unit.
#[derive(Debug)]
pub struct UnitSimulation {
    unit: Unit,
    signals: Vec<SignalState>,
    anomalies: AnomalyInjector,
    motion: Option<MotionModel>,
    fixed_position: Option<GeoPoint>,
    power: PowerModel,
    rng: StdRng,
    last_tick: Option<DateTime<Utc>>,
    ticks: u64,
}

impl UnitSimulation {
    /// Validate the configuration and resolve phases.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Independent channels first, anti-phased ones once their source is known
        let mut signals: Vec<SignalState> = config
            .channels
            .iter()
            .filter(|c| c.anti_phase_of.is_none())
            .map(|c| SignalState::new(c.channel, c.model.clone(), &mut rng))
            .collect();
        for c in config.channels.iter().filter(|c| c.anti_phase_of.is_some()) {
            let source = c.anti_phase_of.and_then(|src| signals.iter().find(|s| s.channel() == src));
            let phase = match source {
                Some(s) => s.phase() + PI,
                None => {
                    return Err(SimError::MissingPhaseSource {
                        channel: c.channel,
                        source_channel: c.anti_phase_of.unwrap_or(c.channel),
                    })
                }
            };
            signals.push(SignalState::with_phase(c.channel, c.model.clone(), phase));
        }

        let (motion, fixed_position) = match config.positioning {
            Positioning::Fixed { position } => (None, Some(position)),
            Positioning::Patrol(motion) => (Some(MotionModel::new(motion)), None),
        };

        Ok(Self {
            unit: config.unit,
            signals,
            anomalies: AnomalyInjector::new(config.anomaly),
            motion,
            fixed_position,
            power: PowerModel::new(config.power),
            rng,
            last_tick: None,
            ticks: 0,
        })
    }

    /// Simulated unit.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Ticks taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Anomaly injector.
    pub fn anomalies(&self) -> &AnomalyInjector {
        &self.anomalies
    }

    /// Motion model, for patrolling units.
    pub fn motion(&self) -> Option<&MotionModel> {
        self.motion.as_ref()
    }

    /// Power model.
    pub fn power(&self) -> &PowerModel {
        &self.power
    }

    /// Start an anomaly event now.
    pub fn force_anomaly(&mut self, profile: AnomalyProfile, duration_secs: f64, now: DateTime<Utc>) {
        let transition = self
            .anomalies
            .force(profile, duration_secs, now, &mut self.rng);
        self.log_transition(&transition);
    }

    /// Advance one tick and produce a full value set.
    pub fn tick(&mut self, now: DateTime<Utc>) -> ChannelValues {
        let dt = self
            .last_tick
            .map(|prev| seconds_between(prev, now))
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.ticks += 1;

        if let Some(transition) = self.anomalies.advance(now, &mut self.rng) {
            self.log_transition(&transition);
        }

        let mut values = ChannelValues::new();

        for signal in &self.signals {
            let channel = signal.channel();
            let value = match self.anomalies.effect(channel, now, &mut self.rng) {
                None => signal.sample(now, &mut self.rng),
                Some(ChannelEffect::Offset { value, widen }) => {
                    signal.sample_shifted(now, &mut self.rng, value, widen)
                }
                Some(ChannelEffect::Override(v)) => channel.clamp(v),
            };
            values.set(channel, value);
        }

        let (position, moving) = match (&mut self.motion, self.fixed_position) {
            (Some(motion), _) => {
                let sample = motion.step(dt, &mut self.rng);
                (Some(sample.position), sample.moving)
            }
            (None, fixed) => (fixed, false),
        };
        if let Some(p) = position {
            values.set(Channel::Latitude, Channel::Latitude.clamp(p.lat));
            values.set(Channel::Longitude, Channel::Longitude.clamp(p.lon));
        }

        let power = self
            .power
            .tick(now, moving, self.anomalies.is_active(), &mut self.rng);
        if power.recharged {
            info!(unit = %self.unit, battery = power.battery, "Battery recharged");
        }
        values.set(Channel::Battery, Channel::Battery.clamp(power.battery));
        if let Some(solar) = power.solar {
            values.set(Channel::SolarCharge, Channel::SolarCharge.clamp(solar));
        }

        for channel in Channel::ALL {
            if !self.unit.reports(channel) {
                values.clear(channel);
            }
        }

        debug!(unit = %self.unit, tick = self.ticks, channels = values.len(), "Simulated tick");
        values
    }

    fn log_transition(&self, transition: &AnomalyTransition) {
        match transition {
            AnomalyTransition::Started {
                name,
                duration_secs,
            } => info!(
                unit = %self.unit,
                anomaly = %name,
                duration_secs = *duration_secs,
                "Anomaly event started"
            ),
            AnomalyTransition::Ended { name } => {
                info!(unit = %self.unit, anomaly = %name, "Anomaly event ended")
            }
        }
    }
}
