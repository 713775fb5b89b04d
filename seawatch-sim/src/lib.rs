// Seawatch Sim - Synthetic telemetry for field units
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Seawatch Sim - Synthetic telemetry for field units
//!
//! Produces plausible readings for the drone and the buoy when their
//! hardware is offline, so the rest of the pipeline always has data.
//!
//! ## Features
//!
//! - **Cyclic signals**: diurnal and tidal sine models with bounded noise
//! - **Anomaly events**: ballast discharges and storms with an envelope
//! - **Motion**: waypoint patrol inside a bounding box
//! - **Power**: battery drain with a recharge policy, or solar charging
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use seawatch::{Channel, Unit};
//! use seawatch_sim::{SimulationConfig, UnitSimulation};
//!
//! let mut sim = UnitSimulation::new(SimulationConfig::buoy().with_seed(42)).unwrap();
//! let values = sim.tick(Utc::now());
//!
//! assert_eq!(values.len(), Unit::Buoy.channels().len());
//! let wave = values.get(Channel::WaveHeight).unwrap();
//! assert!(wave >= 0.0);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────── UnitSimulation ───────────────────────┐
//! │  SignalState x N ──┐                                          │
//! │  AnomalyInjector ──┼──► ChannelValues (unit's channels only)  │
//! │  MotionModel ──────┤                                          │
//! │  PowerModel ───────┘                                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod anomalies;
pub mod error;
pub mod motion;
pub mod power;
pub mod signal;
pub mod simulation;
pub mod units;

pub use anomalies::{
    ActiveAnomaly, AnomalyConfig, AnomalyEffect, AnomalyInjector, AnomalyProfile, AnomalyState,
    AnomalyTransition, ChannelEffect, Envelope,
};
pub use error::{Result, SimError};
pub use motion::{GeoPoint, MotionConfig, MotionModel, MotionSample};
pub use power::{
    NoRecharge, PowerConfig, PowerModel, PowerSample, RechargeConfig, RechargePolicy,
    StochasticRecharge,
};
pub use signal::{SignalModel, SignalState, DIURNAL_CYCLE_HOURS, TIDAL_CYCLE_HOURS};
pub use simulation::{ChannelModel, Positioning, SimulationConfig, UnitSimulation};
