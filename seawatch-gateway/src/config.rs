// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the acquisition engine
//!
//! A configuration file only needs to name what it changes. It is parsed
//! as JSON and merged over the serialized presets: objects merge key by
//! key, arrays and scalars replace the preset value wholesale.
//!
//! ```json
//! {
//!   "buoy": {
//!     "tick_interval_ms": 5000,
//!     "link": { "fallback_port": "/dev/ttyUSB1" },
//!     "simulation": { "seed": 7 }
//!   }
//! }
//! ```

use seawatch::{ConfigError, LinkConfig, ThresholdSet, Unit};
use seawatch_sim::SimulationConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Per-unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Unit served by this configuration
    pub unit: Unit,

    /// Run an acquisition loop for this unit
    pub enabled: bool,

    /// Never open the serial link; every reading is simulated
    pub simulate_only: bool,

    /// Tick cadence in milliseconds
    pub tick_interval_ms: u64,

    /// Serial link parameters
    pub link: LinkConfig,

    /// Alert thresholds
    pub thresholds: ThresholdSet,

    /// Fallback simulation
    pub simulation: SimulationConfig,
}

impl UnitConfig {
    /// Drone preset: 2 s cadence
    pub fn drone() -> Self {
        Self {
            unit: Unit::Drone,
            enabled: true,
            simulate_only: false,
            tick_interval_ms: 2000,
            link: LinkConfig::drone(),
            thresholds: ThresholdSet::drone(),
            simulation: SimulationConfig::drone(),
        }
    }

    /// Buoy preset: 3 s cadence
    pub fn buoy() -> Self {
        Self {
            unit: Unit::Buoy,
            enabled: true,
            simulate_only: false,
            tick_interval_ms: 3000,
            link: LinkConfig::buoy(),
            thresholds: ThresholdSet::buoy(),
            simulation: SimulationConfig::buoy(),
        }
    }

    /// Preset for a unit
    pub fn for_unit(unit: Unit) -> Self {
        match unit {
            Unit::Drone => Self::drone(),
            Unit::Buoy => Self::buoy(),
        }
    }

    /// Tick cadence
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Fix the simulation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = Some(seed);
        self
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid(
                format!("{}.tick_interval_ms", self.unit.name()),
                "must be > 0",
            ));
        }
        if self.simulation.unit != self.unit {
            return Err(ConfigError::invalid(
                format!("{}.simulation.unit", self.unit.name()),
                format!("simulates {}", self.simulation.unit),
            ));
        }
        self.link.validate()?;
        self.thresholds.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

/// Engine configuration: one entry per unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Drone settings
    pub drone: UnitConfig,
    /// Buoy settings
    pub buoy: UnitConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drone: UnitConfig::drone(),
            buoy: UnitConfig::buoy(),
        }
    }
}

impl EngineConfig {
    /// Settings of a unit
    pub fn unit(&self, unit: Unit) -> &UnitConfig {
        match unit {
            Unit::Drone => &self.drone,
            Unit::Buoy => &self.buoy,
        }
    }

    /// Mutable settings of a unit
    pub fn unit_mut(&mut self, unit: Unit) -> &mut UnitConfig {
        match unit {
            Unit::Drone => &mut self.drone,
            Unit::Buoy => &mut self.buoy,
        }
    }

    /// Force every unit into simulation
    pub fn simulate_only(mut self) -> Self {
        self.drone.simulate_only = true;
        self.buoy.simulate_only = true;
        self
    }

    /// Parse a JSON document merged over the presets, then validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let overrides: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut merged =
            serde_json::to_value(Self::default()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        merge(&mut merged, overrides);

        let config: Self =
            serde_json::from_value(merged).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every unit
    pub fn validate(&self) -> Result<(), ConfigError> {
        for unit in Unit::ALL {
            let config = self.unit(unit);
            if config.unit != unit {
                return Err(ConfigError::invalid(
                    format!("{}.unit", unit.name()),
                    format!("configures {}", config.unit),
                ));
            }
            config.validate()?;
        }
        Ok(())
    }
}

/// Merge `overrides` into `base`: objects recurse, everything else replaces
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
