// Seawatch Sim - Power models
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Battery behaviour of the units.
//!
//! The drone drains a fixed amount per tick while moving and is topped up
//! by a [`RechargePolicy`]. The default policy is a stochastic stand-in for a
//! crew swapping packs; it is a modelling choice, not a guarantee that the
//! battery recovers. The buoy charges from a solar panel during daylight.

use crate::signal::hour_of_day;
use chrono::{DateTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Decides whether a low battery gets topped up this tick.
pub trait RechargePolicy: Send + Sync + fmt::Debug {
    /// Amount to add, if any.
    fn recharge(&self, level: f64, rng: &mut dyn RngCore) -> Option<f64>;
}

/// Never recharges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecharge;

impl RechargePolicy for NoRecharge {
    fn recharge(&self, _level: f64, _rng: &mut dyn RngCore) -> Option<f64> {
        None
    }
}

/// Below `low_threshold`, adds `amount` with `probability` per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticRecharge {
    /// Level below which a recharge can happen.
    pub low_threshold: f64,
    /// Chance per tick.
    pub probability: f64,
    /// Percentage points added.
    pub amount: f64,
}

impl Default for StochasticRecharge {
    fn default() -> Self {
        Self {
            low_threshold: 20.0,
            probability: 0.05,
            amount: 30.0,
        }
    }
}

impl RechargePolicy for StochasticRecharge {
    fn recharge(&self, level: f64, rng: &mut dyn RngCore) -> Option<f64> {
        if level < self.low_threshold && rng.gen::<f64>() < self.probability {
            Some(self.amount)
        } else {
            None
        }
    }
}

/// Serializable choice of recharge policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RechargeConfig {
    /// [`NoRecharge`].
    None,
    /// [`StochasticRecharge`].
    Stochastic(StochasticRecharge),
}

impl Default for RechargeConfig {
    fn default() -> Self {
        RechargeConfig::Stochastic(StochasticRecharge::default())
    }
}

impl RechargeConfig {
    /// Build the policy.
    pub fn build(&self) -> Box<dyn RechargePolicy> {
        match *self {
            RechargeConfig::None => Box::new(NoRecharge),
            RechargeConfig::Stochastic(p) => Box::new(p),
        }
    }
}

/// Power configuration of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PowerConfig {
    /// Battery drained on moving ticks, with a recharge policy.
    Battery {
        initial: f64,
        drain_per_tick: f64,
        anomaly_drain_per_tick: f64,
        floor: f64,
        recharge: RechargeConfig,
    },
    /// Solar panel charging a battery.
    Solar {
        initial: f64,
        peak_charge: f64,
        charge_factor: f64,
        night_drain_per_tick: f64,
    },
}

impl PowerConfig {
    /// Drone battery: 0.003 per tick, 0.005 during an event, floor 10%.
    pub fn drone() -> Self {
        PowerConfig::Battery {
            initial: 85.0,
            drain_per_tick: 0.003,
            anomaly_drain_per_tick: 0.005,
            floor: 10.0,
            recharge: RechargeConfig::default(),
        }
    }

    /// Buoy solar panel peaking at 50% around noon.
    pub fn buoy() -> Self {
        PowerConfig::Solar {
            initial: 92.0,
            peak_charge: 50.0,
            charge_factor: 0.02,
            night_drain_per_tick: 0.001,
        }
    }

    /// Check parameters; returns a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let (initial, rates) = match *self {
            PowerConfig::Battery {
                initial,
                drain_per_tick,
                anomaly_drain_per_tick,
                floor,
                recharge,
            } => {
                if let RechargeConfig::Stochastic(p) = recharge {
                    if !(0.0..=1.0).contains(&p.probability) {
                        return Err("recharge probability must be within [0, 1]".to_string());
                    }
                }
                if !(0.0..=100.0).contains(&floor) {
                    return Err("floor must be within [0, 100]".to_string());
                }
                (initial, vec![drain_per_tick, anomaly_drain_per_tick])
            }
            PowerConfig::Solar {
                initial,
                peak_charge,
                charge_factor,
                night_drain_per_tick,
            } => (initial, vec![peak_charge, charge_factor, night_drain_per_tick]),
        };
        if !(0.0..=100.0).contains(&initial) {
            return Err("initial battery must be within [0, 100]".to_string());
        }
        if rates.iter().any(|r| !(r.is_finite() && *r >= 0.0)) {
            return Err("rates must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Solar charge at a fractional hour: `peak * sin(PI * (h - 6) / 12)` from
/// 06:00 to 18:00, zero otherwise.
pub fn solar_charge(hour: f64, peak: f64) -> f64 {
    if (6.0..=18.0).contains(&hour) {
        (peak * (PI * (hour - 6.0) / 12.0).sin()).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Power readings after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    /// Battery level, %.
    pub battery: f64,
    /// Solar charge, % (solar units only).
    pub solar: Option<f64>,
    /// True if the recharge policy fired.
    pub recharged: bool,
}

/// Running power model.
#[derive(Debug)]
pub struct PowerModel {
    config: PowerConfig,
    battery: f64,
    policy: Box<dyn RechargePolicy>,
}

impl PowerModel {
    /// Start from the configured initial level.
    pub fn new(config: PowerConfig) -> Self {
        let (battery, policy) = match &config {
            PowerConfig::Battery {
                initial, recharge, ..
            } => (*initial, recharge.build()),
            PowerConfig::Solar { initial, .. } => {
                (*initial, Box::new(NoRecharge) as Box<dyn RechargePolicy>)
            }
        };
        Self {
            config,
            battery,
            policy,
        }
    }

    /// Replace the recharge policy.
    pub fn with_policy(mut self, policy: Box<dyn RechargePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Current battery level.
    pub fn battery(&self) -> f64 {
        self.battery
    }

    /// Advance one tick.
    ///
    /// A battery unit only drains on ticks where it moved. Solar units ignore
    /// `moving`.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        moving: bool,
        anomaly_active: bool,
        rng: &mut dyn RngCore,
    ) -> PowerSample {
        match self.config {
            PowerConfig::Battery {
                drain_per_tick,
                anomaly_drain_per_tick,
                floor,
                ..
            } => {
                let drain = match (moving, anomaly_active) {
                    (false, _) => 0.0,
                    (true, true) => anomaly_drain_per_tick,
                    (true, false) => drain_per_tick,
                };
                if drain > 0.0 {
                    self.battery = (self.battery - drain).max(floor);
                }
                let recharged = match self.policy.recharge(self.battery, rng) {
                    Some(amount) => {
                        self.battery = (self.battery + amount).min(100.0);
                        true
                    }
                    None => false,
                };
                PowerSample {
                    battery: self.battery,
                    solar: None,
                    recharged,
                }
            }
            PowerConfig::Solar {
                peak_charge,
                charge_factor,
                night_drain_per_tick,
                ..
            } => {
                let solar = solar_charge(hour_of_day(now), peak_charge);
                if solar > 0.0 {
                    self.battery += solar / 100.0 * charge_factor;
                } else {
                    self.battery -= night_drain_per_tick;
                }
                self.battery = self.battery.clamp(0.0, 100.0);
                PowerSample {
                    battery: self.battery,
                    solar: Some(solar),
                    recharged: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[derive(Debug)]
    struct AlwaysRecharge;

    impl RechargePolicy for AlwaysRecharge {
        fn recharge(&self, _level: f64, _rng: &mut dyn RngCore) -> Option<f64> {
            Some(30.0)
        }
    }

    #[test]
    fn test_solar_curve() {
        assert_eq!(solar_charge(5.9, 50.0), 0.0);
        assert_relative_eq!(solar_charge(12.0, 50.0), 50.0, epsilon = 1e-9);
        assert_relative_eq!(solar_charge(9.0, 50.0), 50.0 * (PI / 4.0).sin(), epsilon = 1e-9);
        assert!(solar_charge(18.0, 50.0).abs() < 1e-9);
        assert_eq!(solar_charge(21.0, 50.0), 0.0);
    }

    #[test]
    fn test_drone_drain_and_floor() {
        let mut rng = test_rng();
        let mut power = PowerModel::new(PowerConfig::Battery {
            initial: 10.004,
            drain_per_tick: 0.003,
            anomaly_drain_per_tick: 0.005,
            floor: 10.0,
            recharge: RechargeConfig::None,
        });
        let s = power.tick(at(10), true, false, &mut rng);
        assert_relative_eq!(s.battery, 10.001, epsilon = 1e-9);
        let s = power.tick(at(10), true, true, &mut rng);
        assert_eq!(s.battery, 10.0);
        assert!(s.solar.is_none());
    }

    #[test]
    fn test_stationary_ticks_do_not_drain() {
        let mut rng = test_rng();
        let mut power = PowerModel::new(PowerConfig::drone());
        assert_eq!(power.tick(at(10), false, false, &mut rng).battery, 85.0);
        assert_eq!(power.tick(at(10), false, true, &mut rng).battery, 85.0);
        let s = power.tick(at(10), true, true, &mut rng);
        assert_relative_eq!(s.battery, 85.0 - 0.005, epsilon = 1e-9);
    }

    #[test]
    fn test_recharge_policy_hook() {
        let mut rng = test_rng();
        let mut power = PowerModel::new(PowerConfig::drone()).with_policy(Box::new(AlwaysRecharge));
        let s = power.tick(at(10), true, false, &mut rng);
        assert!(s.recharged);
        assert_eq!(s.battery, 100.0);
    }

    #[test]
    fn test_stochastic_recharge_only_when_low() {
        let mut rng = test_rng();
        let policy = StochasticRecharge {
            probability: 1.0,
            ..Default::default()
        };
        assert_eq!(policy.recharge(50.0, &mut rng), None);
        assert_eq!(policy.recharge(15.0, &mut rng), Some(30.0));
    }

    #[test]
    fn test_buoy_charges_by_day() {
        let mut rng = test_rng();
        let mut power = PowerModel::new(PowerConfig::buoy());
        let noon = power.tick(at(12), false, false, &mut rng);
        assert_relative_eq!(noon.battery, 92.0 + 0.5 * 0.02, epsilon = 1e-9);
        assert_relative_eq!(noon.solar.unwrap(), 50.0, epsilon = 1e-9);

        let night = power.tick(at(23), false, false, &mut rng);
        assert_relative_eq!(night.battery, 92.01 - 0.001, epsilon = 1e-9);
        assert_eq!(night.solar, Some(0.0));
    }

    #[test]
    fn test_check() {
        assert!(PowerConfig::drone().check().is_ok());
        assert!(PowerConfig::buoy().check().is_ok());
        let bad = PowerConfig::Solar {
            initial: 150.0,
            peak_charge: 50.0,
            charge_factor: 0.02,
            night_drain_per_tick: 0.001,
        };
        assert!(bad.check().is_err());
    }
}
